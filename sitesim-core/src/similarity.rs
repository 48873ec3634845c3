use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use rayon::prelude::*;
use similar::{Algorithm, TextDiff};

/// Upper bound on a single character diff; past it `similar` falls back to
/// an approximate (still bounded) result.
const RATIO_TIMEOUT: Duration = Duration::from_millis(500);

/// Normalized edit-similarity ratio of two strings, in [0, 1].
///
/// `2 * matched_chars / (len_a + len_b)`; two empty strings score 1.0.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(RATIO_TIMEOUT)
        .diff_chars(a, b);
    f64::from(diff.ratio())
}

/// Set Jaccard index. Both empty scores 1.0, exactly one empty scores 0.0.
#[must_use]
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}

/// Frequency-weighted Jaccard: `Σ min(count) / Σ max(count)` over the union
/// of keys, with the same empty-set rules as [`jaccard`].
#[must_use]
pub fn weighted_jaccard(a: &BTreeMap<String, usize>, b: &BTreeMap<String, usize>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let (min_sum, max_sum) = keys.into_iter().fold((0usize, 0usize), |(lo, hi), key| {
        let ca = a.get(key).copied().unwrap_or(0);
        let cb = b.get(key).copied().unwrap_or(0);
        (lo + ca.min(cb), hi + ca.max(cb))
    });
    if max_sum == 0 {
        return 0.0;
    }
    min_sum as f64 / max_sum as f64
}

// -- Greedy best match ----------------------------------------------------------

/// Acceptance rule for a best-match pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Accept scores `>= t`.
    AtLeast(f64),
    /// Accept scores `> t`.
    Above(f64),
}

impl Threshold {
    #[must_use]
    pub fn accepts(self, score: f64) -> bool {
        match self {
            Self::AtLeast(t) => score >= t,
            Self::Above(t) => score > t,
        }
    }
}

/// Outcome of [`best_match`]: accepted `(index_a, index_b, score)` pairs in
/// the order they were claimed, plus the leftover indices on each side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestMatch {
    pub pairs: Vec<(usize, usize, f64)>,
    pub unmatched_a: Vec<usize>,
    pub unmatched_b: Vec<usize>,
}

/// Greedy bipartite best match.
///
/// Every `(a, b)` score is computed up front in parallel (read-only). Claiming
/// then runs sequentially in `a` order: each item takes the highest-scoring
/// unclaimed `b`, ties going to the earlier `b`, and the pair is kept when
/// `threshold` accepts it. A zero score never claims anything. The result does
/// not depend on thread scheduling.
pub fn best_match<A, B, F>(a: &[A], b: &[B], score: F, threshold: Threshold) -> BestMatch
where
    A: Sync,
    B: Sync,
    F: Fn(&A, &B) -> f64 + Sync,
{
    let matrix: Vec<Vec<f64>> = a
        .par_iter()
        .map(|item_a| b.iter().map(|item_b| score(item_a, item_b)).collect())
        .collect();

    let mut claimed = vec![false; b.len()];
    let mut result = BestMatch::default();
    for (i, row) in matrix.iter().enumerate() {
        let mut best: Option<(usize, f64)> = None;
        for (j, &s) in row.iter().enumerate() {
            if claimed[j] {
                continue;
            }
            let current = best.map_or(0.0, |(_, bs)| bs);
            if s > current {
                best = Some((j, s));
            }
        }
        match best {
            Some((j, s)) if threshold.accepts(s) => {
                claimed[j] = true;
                result.pairs.push((i, j, s));
            }
            _ => result.unmatched_a.push(i),
        }
    }
    result.unmatched_b = claimed
        .iter()
        .enumerate()
        .filter(|(_, c)| !**c)
        .map(|(j, _)| j)
        .collect();
    result
}
