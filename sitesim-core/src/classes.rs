//! Utility-class usage: extraction of `class` / `className` tokens and the
//! set / frequency comparison of two projects' class vocabularies.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::similarity::{jaccard, weighted_jaccard};

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\bclass(?:Name)?\s*=\s*(?:"([^"]*)"|'([^']*)'|\{\s*"([^"]*)"\s*\}|\{\s*'([^']*)'\s*\}|\{\s*`([^`]*)`\s*\})"#,
    )
    .expect("valid regex")
});

/// Class token -> number of occurrences.
pub type ClassCounts = BTreeMap<String, usize>;

/// Add the class tokens found in `source` to `counts`. Template
/// interpolations (`${…}`) are skipped.
pub fn extract_classes(source: &str, counts: &mut ClassCounts) {
    for caps in CLASS_ATTR.captures_iter(source) {
        let Some(value) = caps.iter().skip(1).flatten().next() else {
            continue;
        };
        for token in value.as_str().split_whitespace() {
            if token.contains("${") || token.contains('}') {
                continue;
            }
            *counts.entry(token.to_string()).or_insert(0) += 1;
        }
    }
}

/// Class counts over several sources.
pub fn count_classes<'a>(sources: impl IntoIterator<Item = &'a str>) -> ClassCounts {
    let mut counts = ClassCounts::new();
    for source in sources {
        extract_classes(source, &mut counts);
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassUsageComparison {
    pub jaccard_similarity: f64,
    pub weighted_jaccard_similarity: f64,
    /// Mean of the plain and frequency-weighted Jaccard scores.
    pub hybrid_similarity: f64,
    pub shared_classes: Vec<String>,
    pub only_in_original: Vec<String>,
    pub only_in_candidate: Vec<String>,
}

/// Compare two class vocabularies; `None` (not performed) when neither side
/// uses any class.
#[must_use]
pub fn compare_class_usage(a: &ClassCounts, b: &ClassCounts) -> Option<ClassUsageComparison> {
    if a.is_empty() && b.is_empty() {
        return None;
    }
    let set_a: BTreeSet<&String> = a.keys().collect();
    let set_b: BTreeSet<&String> = b.keys().collect();
    let jaccard_similarity = jaccard(&set_a, &set_b);
    let weighted_jaccard_similarity = weighted_jaccard(a, b);
    Some(ClassUsageComparison {
        jaccard_similarity,
        weighted_jaccard_similarity,
        hybrid_similarity: (jaccard_similarity + weighted_jaccard_similarity) / 2.0,
        shared_classes: set_a.intersection(&set_b).map(|s| (*s).clone()).collect(),
        only_in_original: set_a.difference(&set_b).map(|s| (*s).clone()).collect(),
        only_in_candidate: set_b.difference(&set_a).map(|s| (*s).clone()).collect(),
    })
}
