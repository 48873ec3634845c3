use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::table::{PropertyMap, RuleTable};

/// Per-selector score at or above which a selector counts as matching.
pub const MATCHING_SELECTOR: f64 = 0.9;
/// Per-selector score at or above which a selector counts as a partial match.
pub const PARTIAL_SELECTOR: f64 = 0.3;

/// Selector counts and score for one group of rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketComparison {
    pub similarity: f64,
    pub matching_selectors: usize,
    pub partial_selectors: usize,
    pub different_selectors: usize,
    pub missing_selectors: usize,
    pub extra_selectors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationComparison {
    pub step_differences: usize,
    pub total_steps: usize,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyframesComparison {
    pub matching: Vec<String>,
    pub different: Vec<String>,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub animations: BTreeMap<String, AnimationComparison>,
}

/// Result of comparing two stylesheets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CssComparison {
    /// Pooled score over top-level selectors, media and supports buckets and
    /// keyframe steps.
    pub similarity: f64,
    pub matching_selectors: usize,
    pub partial_selectors: usize,
    pub different_selectors: usize,
    pub missing_selectors: usize,
    pub extra_selectors: usize,
    pub media: BTreeMap<String, BucketComparison>,
    pub supports: BTreeMap<String, BucketComparison>,
    pub keyframes: KeyframesComparison,
    pub summary: String,
}

/// Running selector counts; `contribution` is the numerator of the score.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    matching: usize,
    partial: usize,
    different: usize,
    missing: usize,
    extra: usize,
    contribution: f64,
}

impl Tally {
    fn shared(&mut self, score: f64) {
        if score >= MATCHING_SELECTOR {
            self.matching += 1;
            self.contribution += 1.0;
        } else if score >= PARTIAL_SELECTOR {
            self.partial += 1;
            self.contribution += score;
        } else {
            self.different += 1;
        }
    }

    fn total(&self) -> usize {
        self.matching + self.partial + self.different + self.missing + self.extra
    }

    fn similarity(&self) -> f64 {
        match self.total() {
            0 => 1.0,
            n => self.contribution / n as f64,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.matching += other.matching;
        self.partial += other.partial;
        self.different += other.different;
        self.missing += other.missing;
        self.extra += other.extra;
        self.contribution += other.contribution;
    }

    fn bucket(&self) -> BucketComparison {
        BucketComparison {
            similarity: self.similarity(),
            matching_selectors: self.matching,
            partial_selectors: self.partial,
            different_selectors: self.different,
            missing_selectors: self.missing,
            extra_selectors: self.extra,
        }
    }
}

/// Fraction of properties, over the union of names, whose value and
/// `!important` flag agree. Two empty rules score 1.0.
#[must_use]
pub fn selector_similarity(a: &PropertyMap, b: &PropertyMap) -> f64 {
    let names: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    if names.is_empty() {
        return 1.0;
    }
    let equal = names
        .iter()
        .filter(|name| matches!((a.get(**name), b.get(**name)), (Some(x), Some(y)) if x == y))
        .count();
    equal as f64 / names.len() as f64
}

fn tally_rules(a: &BTreeMap<String, PropertyMap>, b: &BTreeMap<String, PropertyMap>) -> Tally {
    let mut tally = Tally::default();
    for (selector, props) in a {
        match b.get(selector) {
            Some(other) => tally.shared(selector_similarity(props, other)),
            None => tally.missing += 1,
        }
    }
    tally.extra = b.keys().filter(|s| !a.contains_key(*s)).count();
    tally
}

/// Compare bucketed rule maps (media or supports). One-sided buckets score 0.
fn compare_buckets(
    a: &BTreeMap<String, BTreeMap<String, PropertyMap>>,
    b: &BTreeMap<String, BTreeMap<String, PropertyMap>>,
    pooled: &mut Tally,
) -> BTreeMap<String, BucketComparison> {
    let empty = BTreeMap::new();
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    keys.into_iter()
        .map(|key| {
            let in_a = a.get(key);
            let in_b = b.get(key);
            let tally = tally_rules(in_a.unwrap_or(&empty), in_b.unwrap_or(&empty));
            pooled.merge(&tally);
            let mut bucket = tally.bucket();
            if in_a.is_none() || in_b.is_none() {
                bucket.similarity = 0.0;
            }
            (key.clone(), bucket)
        })
        .collect()
}

fn compare_keyframes(a: &RuleTable, b: &RuleTable, pooled: &mut Tally) -> KeyframesComparison {
    let mut result = KeyframesComparison::default();
    let empty = BTreeMap::new();
    let names: BTreeSet<&String> = a.keyframes.keys().chain(b.keyframes.keys()).collect();
    for name in names {
        let (steps_a, steps_b) = (a.keyframes.get(name), b.keyframes.get(name));
        let tally = tally_rules(steps_a.unwrap_or(&empty), steps_b.unwrap_or(&empty));
        pooled.merge(&tally);
        match (steps_a, steps_b) {
            (Some(_), None) => result.missing.push(name.clone()),
            (None, Some(_)) => result.extra.push(name.clone()),
            _ => {
                let similarity = tally.similarity();
                if tally.matching == tally.total() {
                    result.matching.push(name.clone());
                } else {
                    result.different.push(name.clone());
                }
                result.animations.insert(
                    name.clone(),
                    AnimationComparison {
                        step_differences: tally.total() - tally.matching,
                        total_steps: tally.total(),
                        similarity,
                    },
                );
            }
        }
    }
    result
}

/// Compare two rule tables with uniform per-selector fractions.
#[must_use]
pub fn compare_tables(a: &RuleTable, b: &RuleTable) -> CssComparison {
    let mut pooled = tally_rules(&a.rules, &b.rules);
    let top = pooled;
    let media = compare_buckets(&a.media, &b.media, &mut pooled);
    let supports = compare_buckets(&a.supports, &b.supports, &mut pooled);
    let keyframes = compare_keyframes(a, b, &mut pooled);

    let summary = format!(
        "{} matching, {} partial, {} different, {} missing, {} extra selector(s); \
         {} media queries, {} supports conditions, {} animations compared",
        top.matching,
        top.partial,
        top.different,
        top.missing,
        top.extra,
        media.len(),
        supports.len(),
        keyframes.matching.len()
            + keyframes.different.len()
            + keyframes.missing.len()
            + keyframes.extra.len(),
    );

    CssComparison {
        similarity: pooled.similarity(),
        matching_selectors: pooled.matching,
        partial_selectors: pooled.partial,
        different_selectors: pooled.different,
        missing_selectors: pooled.missing,
        extra_selectors: pooled.extra,
        media,
        supports,
        keyframes,
        summary,
    }
}
