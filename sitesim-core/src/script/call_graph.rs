use std::collections::{BTreeMap, BTreeSet};

use crate::similarity::jaccard;

/// Function name -> names of the functions it calls.
///
/// Function names are the declared names or synthesized `anon_func_N`;
/// callees are the called identifier or the property of a member call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    calls: BTreeMap<String, BTreeSet<String>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, even if it never calls anything.
    pub fn add_function(&mut self, name: &str) {
        self.calls.entry(name.to_string()).or_default();
    }

    pub fn add_edge(&mut self, caller: &str, callee: &str) {
        self.calls
            .entry(caller.to_string())
            .or_default()
            .insert(callee.to_string());
    }

    #[must_use]
    pub fn callees(&self, caller: &str) -> Option<&BTreeSet<String>> {
        self.calls.get(caller)
    }

    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.calls.keys().map(String::as_str)
    }

    /// The `(caller, callee)` edge set.
    #[must_use]
    pub fn edges(&self) -> BTreeSet<(&str, &str)> {
        self.calls
            .iter()
            .flat_map(|(caller, callees)| {
                callees
                    .iter()
                    .map(move |callee| (caller.as_str(), callee.as_str()))
            })
            .collect()
    }

    /// Jaccard similarity of the two edge sets. Both empty scores 1.0,
    /// exactly one empty scores 0.0.
    #[must_use]
    pub fn similarity(&self, other: &Self) -> f64 {
        jaccard(&self.edges(), &other.edges())
    }
}
