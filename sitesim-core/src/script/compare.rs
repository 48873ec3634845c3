use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ScriptModule;
use super::extract::{self, ClassInfo, ControlFlowInfo, FunctionInfo, ImportInfo};
use crate::align::tree_similarity;
use crate::node::NormalizedNode;
use crate::similarity::{Threshold, best_match, jaccard, ratio};

/// Function pairs scoring above this are matching.
pub const MATCHING_FUNCTION: f64 = 0.8;
/// Function pairs scoring above this (and not matching) are different;
/// anything lower counts the original function as missing.
pub const DIFFERENT_FUNCTION: f64 = 0.5;

/// Weights of the five script sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptWeights {
    pub function: f64,
    pub import: f64,
    pub class: f64,
    pub control_flow: f64,
    pub call_graph: f64,
}

impl Default for ScriptWeights {
    fn default() -> Self {
        Self {
            function: 0.35,
            import: 0.15,
            class: 0.15,
            control_flow: 0.15,
            call_graph: 0.20,
        }
    }
}

impl ScriptWeights {
    fn sum(&self) -> f64 {
        self.function + self.import + self.class + self.control_flow + self.call_graph
    }

    /// Weights scaled to sum to 1.0; all-zero weights fall back to defaults.
    #[must_use]
    pub fn normalized(self) -> Self {
        let total = self.sum();
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            function: self.function / total,
            import: self.import / total,
            class: self.class / total,
            control_flow: self.control_flow / total,
            call_graph: self.call_graph / total,
        }
    }
}

/// Result of comparing two script files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptComparison {
    pub similarity: f64,
    pub function_similarity: f64,
    pub import_similarity: f64,
    pub class_similarity: f64,
    pub control_flow_similarity: f64,
    pub call_graph_similarity: f64,
    /// Function count of the larger side.
    pub total_functions: usize,
    pub matching_functions: usize,
    pub different_functions: usize,
    pub missing_functions: usize,
    pub extra_functions: usize,
}

impl ScriptComparison {
    /// Result for a pair where either side failed to parse.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            similarity: 0.0,
            function_similarity: 0.0,
            import_similarity: 0.0,
            class_similarity: 0.0,
            control_flow_similarity: 0.0,
            call_graph_similarity: 0.0,
            total_functions: 0,
            matching_functions: 0,
            different_functions: 0,
            missing_functions: 0,
            extra_functions: 0,
        }
    }
}

/// Sum of pair scores over the larger side. Both sides empty scores 1.0.
fn pooled(pairs: &[(usize, usize, f64)], len_a: usize, len_b: usize) -> f64 {
    match len_a.max(len_b) {
        0 => 1.0,
        n => pairs.iter().map(|(_, _, s)| s).sum::<f64>() / n as f64,
    }
}

fn body_similarity(a: Option<&NormalizedNode>, b: Option<&NormalizedNode>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => tree_similarity(a, b),
        (None, None) => 1.0,
        _ => 0.0,
    }
}

/// `0.3 * signature + 0.7 * body`.
pub fn function_similarity(a: &FunctionInfo<'_>, b: &FunctionInfo<'_>) -> f64 {
    let signature = match (a.name == b.name, a.params == b.params) {
        (true, true) => 1.0,
        (true, false) => 0.5,
        _ => 0.0,
    };
    0.3 * signature + 0.7 * body_similarity(a.body, b.body)
}

/// Same source required, then Jaccard over imported names.
pub fn import_similarity(a: &ImportInfo<'_>, b: &ImportInfo<'_>) -> f64 {
    if a.source != b.source {
        return 0.0;
    }
    jaccard(&a.names, &b.names)
}

/// Same class name required, then mean body similarity of same-named
/// methods over the larger method list.
pub fn class_similarity(a: &ClassInfo<'_>, b: &ClassInfo<'_>) -> f64 {
    if a.name != b.name {
        return 0.0;
    }
    let denom = a.methods.len().max(b.methods.len());
    if denom == 0 {
        return 1.0;
    }
    let total: f64 = a
        .methods
        .iter()
        .filter_map(|ma| {
            b.methods
                .iter()
                .filter(|mb| mb.name == ma.name)
                .map(|mb| body_similarity(ma.body, mb.body))
                .reduce(f64::max)
        })
        .sum();
    total / denom as f64
}

/// Same statement kind required, then `0.3 * condition + 0.7 * body`.
pub fn control_flow_similarity(a: &ControlFlowInfo<'_>, b: &ControlFlowInfo<'_>) -> f64 {
    if a.kind != b.kind {
        return 0.0;
    }
    0.3 * ratio(&a.condition, &b.condition) + 0.7 * body_similarity(a.body, b.body)
}

/// Compares functions, imports, classes, control flow and call graphs of two
/// script files and combines them with [`ScriptWeights`].
#[derive(Debug, Clone, Default)]
pub struct ScriptLogicComparator {
    weights: ScriptWeights,
}

impl ScriptLogicComparator {
    pub fn new(weights: ScriptWeights) -> Self {
        Self {
            weights: weights.normalized(),
        }
    }

    #[must_use]
    pub fn compare(&self, a: &ScriptModule, b: &ScriptModule) -> ScriptComparison {
        let (Some(ast_a), Some(ast_b)) = (&a.ast, &b.ast) else {
            return ScriptComparison::failed();
        };

        let fa = extract::functions(ast_a);
        let fb = extract::functions(ast_b);
        // Only pairs above the different cutoff claim a candidate; the rest
        // stay unmatched on both sides (missing / extra).
        let functions = best_match(
            &fa,
            &fb,
            function_similarity,
            Threshold::Above(DIFFERENT_FUNCTION),
        );
        let matching = functions
            .pairs
            .iter()
            .filter(|&&(_, _, score)| score > MATCHING_FUNCTION)
            .count();
        let different = functions.pairs.len() - matching;

        let ia = extract::imports(ast_a);
        let ib = extract::imports(ast_b);
        let imports = best_match(&ia, &ib, import_similarity, Threshold::Above(0.0));

        let ca = extract::classes(ast_a);
        let cb = extract::classes(ast_b);
        let classes = best_match(&ca, &cb, class_similarity, Threshold::Above(0.0));

        let la = extract::control_flow(ast_a);
        let lb = extract::control_flow(ast_b);
        let loops = best_match(&la, &lb, control_flow_similarity, Threshold::Above(0.0));

        let function_similarity = pooled(&functions.pairs, fa.len(), fb.len());
        let import_similarity = pooled(&imports.pairs, ia.len(), ib.len());
        let class_similarity = pooled(&classes.pairs, ca.len(), cb.len());
        let control_flow_similarity = pooled(&loops.pairs, la.len(), lb.len());
        let call_graph_similarity = a.call_graph.similarity(&b.call_graph);

        let w = &self.weights;
        let similarity = w.function * function_similarity
            + w.import * import_similarity
            + w.class * class_similarity
            + w.control_flow * control_flow_similarity
            + w.call_graph * call_graph_similarity;

        debug!(
            functions = fa.len(),
            imports = ia.len(),
            classes = ca.len(),
            control_flow = la.len(),
            similarity,
            "compared scripts"
        );

        ScriptComparison {
            similarity: similarity.clamp(0.0, 1.0),
            function_similarity,
            import_similarity,
            class_similarity,
            control_flow_similarity,
            call_graph_similarity,
            total_functions: fa.len().max(fb.len()),
            matching_functions: matching,
            different_functions: different,
            missing_functions: functions.unmatched_a.len(),
            extra_functions: functions.unmatched_b.len(),
        }
    }
}
