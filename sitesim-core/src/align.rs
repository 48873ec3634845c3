//! Tree alignment: compares two normalized trees node by node and reports
//! matching, different, missing and extra elements with a numeric score.

use serde::Serialize;
use similar::{Algorithm, DiffOp, capture_diff_slices};
use tracing::trace;

use crate::node::NormalizedNode;
use crate::similarity::ratio;

/// One "different" outcome of an alignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffDetail {
    /// `/`-joined tag path from the root.
    pub path: String,
    pub tag_a: String,
    pub tag_b: String,
    pub tag_mismatch: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub differing_attributes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_b: Option<String>,
    pub attr_similarity: f64,
    pub text_similarity: f64,
}

/// Per-pair outcome of a tree alignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub similarity: f64,
    pub matching: usize,
    pub different: usize,
    pub missing: usize,
    pub extra: usize,
    pub differences: Vec<DiffDetail>,
    pub missing_elements: Vec<String>,
    pub extra_elements: Vec<String>,
    pub summary: String,
}

impl Default for ComparisonResult {
    fn default() -> Self {
        Self {
            similarity: 1.0,
            matching: 0,
            different: 0,
            missing: 0,
            extra: 0,
            differences: vec![],
            missing_elements: vec![],
            extra_elements: vec![],
            summary: String::new(),
        }
    }
}

impl ComparisonResult {
    fn describe(&self) -> String {
        if self.different == 0 && self.missing == 0 && self.extra == 0 {
            return "All elements match structurally.".to_string();
        }
        let mut parts = Vec::new();
        if self.different > 0 {
            parts.push(format!(
                "{} element(s) differ in attributes or text",
                self.different
            ));
        }
        if self.missing > 0 {
            parts.push(format!("{} element(s) missing", self.missing));
        }
        if self.extra > 0 {
            parts.push(format!("{} extra element(s)", self.extra));
        }
        parts.join("; ")
    }
}

/// Aligns normalized trees. Attributes matching one of `ignore_attributes`
/// (exact name, or prefix with a trailing `*`) are left out of attribute
/// similarity and of child signatures.
#[derive(Debug, Clone, Default)]
pub struct TreeComparator {
    ignore_attributes: Vec<String>,
}

impl TreeComparator {
    pub fn new(ignore_attributes: Vec<String>) -> Self {
        Self { ignore_attributes }
    }

    fn is_ignored(&self, attr: &str) -> bool {
        self.ignore_attributes
            .iter()
            .any(|pattern| match pattern.strip_suffix('*') {
                Some(prefix) => attr.starts_with(prefix),
                None => attr == pattern,
            })
    }

    /// Compare two optional trees.
    ///
    /// Both absent scores 1.0 with no elements; one absent makes that root a
    /// single missing (or extra) element.
    #[must_use]
    pub fn compare(
        &self,
        a: Option<&NormalizedNode>,
        b: Option<&NormalizedNode>,
    ) -> ComparisonResult {
        let mut walk = Walk {
            cmp: self,
            scores: Vec::new(),
            result: ComparisonResult::default(),
        };
        match (a, b) {
            (None, None) => {}
            (Some(a), None) => walk.missing(a, ""),
            (None, Some(b)) => walk.extra(b, ""),
            (Some(a), Some(b)) => walk.node(a, b, ""),
        }
        let mut result = walk.result;
        if !walk.scores.is_empty() {
            result.similarity = walk.scores.iter().sum::<f64>() / walk.scores.len() as f64;
        }
        result.summary = result.describe();
        result
    }

    /// Hashable signature used to align sibling lists: kind, lower-cased
    /// name, canonical non-ignored attributes, and leaf text.
    fn signature(&self, node: &NormalizedNode) -> String {
        let mut sig = String::from(node.kind.as_str());
        sig.push('|');
        if let Some(name) = &node.name {
            sig.push_str(&name.to_ascii_lowercase());
        }
        sig.push('|');
        for (key, value) in &node.attrs {
            if self.is_ignored(key) {
                continue;
            }
            sig.push_str(key);
            sig.push('=');
            sig.push_str(&value.canonical());
            sig.push(';');
        }
        sig.push('|');
        if node.children.is_empty()
            && let Some(text) = node.text.as_deref().or(node.value.as_deref())
        {
            sig.push_str(text);
        }
        sig
    }

    /// Fraction of non-ignored attributes whose canonical values agree, and
    /// the names of those that differ.
    fn attr_similarity(&self, a: &NormalizedNode, b: &NormalizedNode) -> (f64, Vec<String>) {
        let keys: std::collections::BTreeSet<&String> = a
            .attrs
            .keys()
            .chain(b.attrs.keys())
            .filter(|k| !self.is_ignored(k))
            .collect();
        if keys.is_empty() {
            return (1.0, vec![]);
        }
        let mut differing = Vec::new();
        for key in &keys {
            let same = match (a.attrs.get(*key), b.attrs.get(*key)) {
                (Some(va), Some(vb)) => va.canonical() == vb.canonical(),
                _ => false,
            };
            if !same {
                differing.push((*key).clone());
            }
        }
        let equal = keys.len() - differing.len();
        (equal as f64 / keys.len() as f64, differing)
    }
}

/// Convenience: similarity of two trees with no ignored attributes.
#[must_use]
pub fn tree_similarity(a: &NormalizedNode, b: &NormalizedNode) -> f64 {
    TreeComparator::default()
        .compare(Some(a), Some(b))
        .similarity
}

// -- Recursive walk -------------------------------------------------------------

struct Walk<'c> {
    cmp: &'c TreeComparator,
    scores: Vec<f64>,
    result: ComparisonResult,
}

fn child_path(parent: &str, node: &NormalizedNode) -> String {
    if parent.is_empty() {
        node.tag().to_string()
    } else {
        format!("{parent}/{}", node.tag())
    }
}

impl Walk<'_> {
    fn matched(&mut self) {
        self.result.matching += 1;
        self.scores.push(1.0);
    }

    fn missing(&mut self, a: &NormalizedNode, parent: &str) {
        self.result.missing += 1;
        self.result.missing_elements.push(child_path(parent, a));
        self.scores.push(0.0);
    }

    fn extra(&mut self, b: &NormalizedNode, parent: &str) {
        self.result.extra += 1;
        self.result.extra_elements.push(child_path(parent, b));
        self.scores.push(0.0);
    }

    fn different(&mut self, detail: DiffDetail) {
        self.result.different += 1;
        self.scores
            .push(0.5 * detail.attr_similarity + 0.5 * detail.text_similarity);
        self.result.differences.push(detail);
    }

    fn node(&mut self, a: &NormalizedNode, b: &NormalizedNode, parent: &str) {
        let path = child_path(parent, a);

        if a.is_text() && b.is_text() {
            let ta = a.text.as_deref().unwrap_or_default();
            let tb = b.text.as_deref().unwrap_or_default();
            if ta == tb {
                self.matched();
            } else {
                self.different(DiffDetail {
                    path,
                    tag_a: a.tag().to_string(),
                    tag_b: b.tag().to_string(),
                    tag_mismatch: false,
                    differing_attributes: vec![],
                    text_a: Some(ta.to_string()),
                    text_b: Some(tb.to_string()),
                    attr_similarity: 1.0,
                    text_similarity: ratio(ta, tb),
                });
            }
            return;
        }

        if !a.same_tag(b) {
            trace!(path = %path, a = a.tag(), b = b.tag(), "tag mismatch");
            self.different(DiffDetail {
                path,
                tag_a: a.tag().to_string(),
                tag_b: b.tag().to_string(),
                tag_mismatch: true,
                differing_attributes: vec![],
                text_a: None,
                text_b: None,
                attr_similarity: 0.0,
                text_similarity: 0.0,
            });
            return;
        }

        // Script bodies are not compared.
        let is_script = |n: &NormalizedNode| {
            n.name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case("script"))
        };
        if is_script(a) && is_script(b) {
            self.matched();
            return;
        }

        let (attr_similarity, differing_attributes) = self.cmp.attr_similarity(a, b);
        let (text_similarity, descend) = match (a.text_content(), b.text_content()) {
            (Some(ta), Some(tb)) if ta == tb => (1.0, false),
            (Some(ta), Some(tb)) => (ratio(ta, tb), false),
            (None, None) => (1.0, true),
            _ => (0.0, true),
        };

        if attr_similarity >= 1.0 && text_similarity >= 1.0 {
            self.matched();
        } else {
            self.different(DiffDetail {
                path: path.clone(),
                tag_a: a.tag().to_string(),
                tag_b: b.tag().to_string(),
                tag_mismatch: false,
                differing_attributes,
                text_a: a.text_content().map(str::to_string),
                text_b: b.text_content().map(str::to_string),
                attr_similarity,
                text_similarity,
            });
        }

        if descend {
            self.children(&a.children, &b.children, &path);
        }
    }

    fn children(&mut self, a: &[NormalizedNode], b: &[NormalizedNode], path: &str) {
        let sig_a: Vec<String> = a.iter().map(|n| self.cmp.signature(n)).collect();
        let sig_b: Vec<String> = b.iter().map(|n| self.cmp.signature(n)).collect();

        for op in capture_diff_slices(Algorithm::Lcs, &sig_a, &sig_b) {
            match op {
                DiffOp::Equal {
                    old_index,
                    new_index,
                    len,
                } => {
                    for k in 0..len {
                        self.node(&a[old_index + k], &b[new_index + k], path);
                    }
                }
                DiffOp::Delete {
                    old_index, old_len, ..
                } => {
                    for node in &a[old_index..old_index + old_len] {
                        self.missing(node, path);
                    }
                }
                DiffOp::Insert {
                    new_index, new_len, ..
                } => {
                    for node in &b[new_index..new_index + new_len] {
                        self.extra(node, path);
                    }
                }
                DiffOp::Replace {
                    old_index,
                    old_len,
                    new_index,
                    new_len,
                } => {
                    for node in &a[old_index..old_index + old_len] {
                        self.missing(node, path);
                    }
                    for node in &b[new_index..new_index + new_len] {
                        self.extra(node, path);
                    }
                }
            }
        }
    }
}
