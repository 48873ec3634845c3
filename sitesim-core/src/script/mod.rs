//! Script logic comparison: normalized script ASTs, call graphs, and the
//! function/import/class/control-flow comparator.

pub mod call_graph;
pub mod compare;
pub mod extract;

use std::path::Path;

pub use call_graph::CallGraph;
pub use compare::{ScriptComparison, ScriptLogicComparator, ScriptWeights};

use crate::node::NormalizedNode;

/// Source dialect handed to the script parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
}

impl Dialect {
    /// Dialect implied by a file extension; unknown extensions read as
    /// JavaScript.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("ts" | "mts" | "cts") => Self::TypeScript,
            Some("tsx") => Self::Tsx,
            Some("jsx") => Self::Jsx,
            _ => Self::JavaScript,
        }
    }
}

/// A normalized script file.
///
/// `ast` is `None` when the file could not be parsed; the call graph is then
/// empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptModule {
    pub ast: Option<NormalizedNode>,
    pub call_graph: CallGraph,
}

impl ScriptModule {
    pub fn new(ast: NormalizedNode, call_graph: CallGraph) -> Self {
        Self {
            ast: Some(ast),
            call_graph,
        }
    }
}
