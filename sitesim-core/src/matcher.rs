//! The cross-project file matching cascade.
//!
//! Stages run in a fixed order (exact path, fuzzy basename, structural,
//! contextual, and for stylesheets raw content); each stage only sees the
//! files left unmatched by the previous ones, so every file ends up in at
//! most one pair.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::comparator::{ArtifactKind, Comparator, LoadedFile, PairDetail};
use crate::config::Config;
use crate::similarity::{Threshold, best_match, ratio};

/// Weight of the shared-folder component of the contextual score.
const FOLDER_WEIGHT: f64 = 0.7;
/// Weight of the matched-neighbor component of the contextual score.
const NEIGHBOR_WEIGHT: f64 = 0.3;

/// The stage that produced a pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Structural,
    Contextual,
    Content,
}

impl MatchType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Structural => "structural",
            Self::Contextual => "contextual",
            Self::Content => "content",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved file pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub original: String,
    pub candidate: String,
    pub match_type: MatchType,
    /// Score of the stage that accepted the pairing.
    pub match_score: f64,
    /// Comparator score of the pair.
    pub score: f64,
    pub detail: PairDetail,
}

/// Matching outcome for one artifact kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMatches {
    pub kind: ArtifactKind,
    pub files_original: usize,
    pub files_candidate: usize,
    pub matches: Vec<MatchRecord>,
    pub unmatched_original: Vec<String>,
    pub unmatched_candidate: Vec<String>,
}

impl TypeMatches {
    /// Number of units in the per-type mean: every pair and every unmatched
    /// file counts once.
    #[must_use]
    pub fn units(&self) -> usize {
        self.files_original + self.files_candidate - self.matches.len()
    }

    /// Sum of pair scores; unmatched files add 0.
    #[must_use]
    pub fn score_sum(&self) -> f64 {
        self.matches.iter().map(|m| m.score).sum()
    }

    /// `sum(pair scores) / (originals + candidates - pairs)`. A kind with no
    /// files on either side scores 1.0.
    #[must_use]
    pub fn aggregate_score(&self) -> f64 {
        match self.units() {
            0 => 1.0,
            n => self.score_sum() / n as f64,
        }
    }
}

/// Claimed pairs and the indices still in play on each side.
struct Pool {
    originals: Vec<usize>,
    candidates: Vec<usize>,
    pairs: Vec<(usize, usize, MatchType, f64)>,
}

impl Pool {
    fn new(n: usize, m: usize) -> Self {
        Self {
            originals: (0..n).collect(),
            candidates: (0..m).collect(),
            pairs: Vec::new(),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.originals.is_empty() || self.candidates.is_empty()
    }

    /// Run one greedy stage over the remaining files and claim its pairs.
    fn stage<F>(&mut self, match_type: MatchType, threshold: f64, score: F)
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        if self.is_exhausted() {
            return;
        }
        let result = best_match(
            &self.originals,
            &self.candidates,
            |&o, &c| score(o, c),
            Threshold::AtLeast(threshold),
        );
        let claimed: Vec<_> = result
            .pairs
            .iter()
            .map(|&(i, j, s)| (self.originals[i], self.candidates[j], match_type, s))
            .collect();
        self.originals = result.unmatched_a.iter().map(|&i| self.originals[i]).collect();
        self.candidates = result.unmatched_b.iter().map(|&j| self.candidates[j]).collect();
        debug!(stage = %match_type, matched = claimed.len(), "matching stage done");
        self.pairs.extend(claimed);
    }
}

fn parent_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').collect();
    segments.pop();
    segments
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// `0.7 * folder + 0.3 * neighbor`.
///
/// `folder` is the number of equal leading directory segments over the longer
/// path's segment count (file name included). `neighbor` is the number of
/// already-matched pairs whose files sit in the same directories as `a` and
/// `b`, over `1 + matched pairs`.
pub fn contextual_score(a: &str, b: &str, matched: &[(&str, &str)]) -> f64 {
    let dirs_a = parent_segments(a);
    let dirs_b = parent_segments(b);
    let shared = dirs_a
        .iter()
        .zip(&dirs_b)
        .take_while(|(x, y)| x == y)
        .count();
    let longest = (dirs_a.len() + 1).max(dirs_b.len() + 1);
    let folder = shared as f64 / longest as f64;

    let (dir_a, dir_b) = (parent_dir(a), parent_dir(b));
    let neighbors = matched
        .iter()
        .filter(|(o, c)| parent_dir(o) == dir_a && parent_dir(c) == dir_b)
        .count();
    let neighbor = neighbors as f64 / (1 + matched.len()) as f64;

    FOLDER_WEIGHT * folder + NEIGHBOR_WEIGHT * neighbor
}

/// Runs the matching cascade and the per-pair comparator for one kind.
pub struct FileMatcher<'a> {
    comparator: &'a dyn Comparator,
    config: &'a Config,
}

impl<'a> FileMatcher<'a> {
    pub fn new(comparator: &'a dyn Comparator, config: &'a Config) -> Self {
        Self { comparator, config }
    }

    pub fn match_files(&self, originals: &[LoadedFile], candidates: &[LoadedFile]) -> TypeMatches {
        let kind = self.comparator.kind();
        let mut pool = Pool::new(originals.len(), candidates.len());

        // Exact: identical relative path.
        pool.stage(MatchType::Exact, 1.0, |o, c| {
            f64::from(u8::from(originals[o].path == candidates[c].path))
        });

        pool.stage(MatchType::Fuzzy, self.config.fuzzy_threshold, |o, c| {
            ratio(originals[o].basename(), candidates[c].basename())
        });

        pool.stage(
            MatchType::Structural,
            self.config.structural_threshold,
            |o, c| self.comparator.structural_score(&originals[o], &candidates[c]),
        );

        let matched: Vec<(&str, &str)> = pool
            .pairs
            .iter()
            .map(|&(o, c, _, _)| (originals[o].path.as_str(), candidates[c].path.as_str()))
            .collect();
        pool.stage(
            MatchType::Contextual,
            self.config.contextual_threshold,
            |o, c| contextual_score(&originals[o].path, &candidates[c].path, &matched),
        );

        if kind == ArtifactKind::Css {
            pool.stage(MatchType::Content, self.config.content_threshold, |o, c| {
                match (&originals[o].source, &candidates[c].source) {
                    (Some(a), Some(b)) => ratio(a, b),
                    _ => 0.0,
                }
            });
        }

        let matches: Vec<MatchRecord> = pool
            .pairs
            .par_iter()
            .map(|&(o, c, match_type, match_score)| {
                let detail = self.comparator.compare(&originals[o], &candidates[c]);
                MatchRecord {
                    original: originals[o].path.clone(),
                    candidate: candidates[c].path.clone(),
                    match_type,
                    match_score,
                    score: detail.score(),
                    detail,
                }
            })
            .collect();

        debug!(
            %kind,
            pairs = matches.len(),
            unmatched_original = pool.originals.len(),
            unmatched_candidate = pool.candidates.len(),
            "matched files"
        );

        TypeMatches {
            kind,
            files_original: originals.len(),
            files_candidate: candidates.len(),
            matches,
            unmatched_original: pool.originals.iter().map(|&o| originals[o].path.clone()).collect(),
            unmatched_candidate: pool
                .candidates
                .iter()
                .map(|&c| candidates[c].path.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;

    use super::*;
    use crate::analyzer::testing;
    use crate::comparator::{Artifact, comparator_for};

    fn load(cmp: &dyn Comparator, files: &[(&str, &str)]) -> Vec<LoadedFile> {
        files
            .iter()
            .map(|(path, source)| LoadedFile {
                path: (*path).to_string(),
                source: Some((*source).to_string()),
                artifact: cmp
                    .load(Path::new(path), source)
                    .unwrap_or_else(|e| Artifact::Failed(e.to_string())),
            })
            .collect()
    }

    fn run(kind: ArtifactKind, a: &[(&str, &str)], b: &[(&str, &str)]) -> TypeMatches {
        let registry = testing::registry();
        let config = Config::default();
        let cmp = comparator_for(kind, &registry, &config);
        let originals = load(cmp.as_ref(), a);
        let candidates = load(cmp.as_ref(), b);
        FileMatcher::new(cmp.as_ref(), &config).match_files(&originals, &candidates)
    }

    #[test]
    fn exact_paths_match_first() {
        let result = run(
            ArtifactKind::Html,
            &[("index.html", "h1 A\np B"), ("about.html", "h1 C\np D")],
            &[("about.html", "h1 C\np D"), ("index.html", "h1 A\np B")],
        );
        assert_eq!(result.matches.len(), 2);
        assert!(result.matches.iter().all(|m| m.match_type == MatchType::Exact));
        assert!((result.aggregate_score() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fuzzy_basename_ignores_directory() {
        let result = run(
            ArtifactKind::Html,
            &[("pages/contact.html", "h1 A\np B")],
            &[("site/contacts.html", "h1 A\np B")],
        );
        assert_eq!(result.matches[0].match_type, MatchType::Fuzzy);
        assert!(result.matches[0].match_score >= 0.75);
    }

    #[test]
    fn structural_stage_pairs_renamed_files_with_same_tree() {
        let result = run(
            ArtifactKind::Html,
            &[("alpha.html", "h1 Welcome\np Body text")],
            &[("zzz.html", "h1 Welcome\np Body text")],
        );
        assert_eq!(result.matches[0].match_type, MatchType::Structural);
    }

    #[test]
    fn contextual_stage_uses_shared_folders() {
        let result = run(
            ArtifactKind::Html,
            &[("docs/guide/a1.html", "h1 x\np y"), ("docs/guide/qqq.html", "span 1")],
            &[("docs/guide/a1.html", "h1 x\np y"), ("docs/guide/www.html", "em 2")],
        );
        let contextual: Vec<_> = result
            .matches
            .iter()
            .filter(|m| m.match_type == MatchType::Contextual)
            .collect();
        assert_eq!(contextual.len(), 1);
        assert_eq!(contextual[0].original, "docs/guide/qqq.html");
    }

    #[test]
    fn unmatched_file_penalizes_aggregate() {
        let result = run(
            ArtifactKind::Html,
            &[("index.html", "h1 A\np B")],
            &[("index.html", "h1 A\np B"), ("zebra.html", "ul one")],
        );
        assert_eq!(result.matches.len(), 1);
        assert!((result.matches[0].score - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.unmatched_candidate, vec!["zebra.html"]);
        // 1.0 / (1 + 2 - 1)
        assert!((result.aggregate_score() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn css_content_stage_runs_last() {
        let result = run(
            ArtifactKind::Css,
            &[("a/one.css", "/* theme */ .a { color: red }\n.b { color: blue }")],
            &[("zz/two.css", "/* theme */ .a { color: red }\n.c { color: green }")],
        );
        // selectors overlap by one of three => structural 1/3, below 0.5
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].match_type, MatchType::Content);
    }

    #[test]
    fn every_file_is_paired_at_most_once() {
        let a: Vec<(String, String)> = (0..6)
            .map(|i| (format!("dir{}/page{i}.html", i % 2), format!("h1 T{i}\np x")))
            .collect();
        let b: Vec<(String, String)> = (0..5)
            .map(|i| (format!("dir{}/page{}.html", i % 3, i + 1), format!("h1 T{i}\np x")))
            .collect();
        let a_ref: Vec<(&str, &str)> = a.iter().map(|(p, s)| (p.as_str(), s.as_str())).collect();
        let b_ref: Vec<(&str, &str)> = b.iter().map(|(p, s)| (p.as_str(), s.as_str())).collect();
        let result = run(ArtifactKind::Html, &a_ref, &b_ref);

        let originals: HashSet<_> = result.matches.iter().map(|m| &m.original).collect();
        let candidates: HashSet<_> = result.matches.iter().map(|m| &m.candidate).collect();
        assert_eq!(originals.len(), result.matches.len());
        assert_eq!(candidates.len(), result.matches.len());
        assert_eq!(
            result.matches.len() + result.unmatched_original.len(),
            result.files_original
        );
        assert_eq!(
            result.matches.len() + result.unmatched_candidate.len(),
            result.files_candidate
        );
    }

    #[test]
    fn contextual_score_components() {
        // shared "src/pages" (2) over 3 segments; no matched neighbors
        let score = contextual_score("src/pages/a.html", "src/pages/b.html", &[]);
        assert!((score - 0.7 * 2.0 / 3.0).abs() < 1e-9);

        let matched = [("src/pages/x.html", "src/pages/y.html"), ("lib/z.html", "lib/z.html")];
        let score = contextual_score("src/pages/a.html", "src/pages/b.html", &matched);
        // neighbor: 1 of (1 + 2)
        assert!((score - (0.7 * 2.0 / 3.0 + 0.3 / 3.0)).abs() < 1e-9);

        assert!(contextual_score("a.html", "b.html", &[]) < f64::EPSILON);
    }

    #[test]
    fn empty_kind_aggregates_to_one() {
        let result = run(ArtifactKind::Script, &[], &[]);
        assert_eq!(result.units(), 0);
        assert!((result.aggregate_score() - 1.0).abs() < f64::EPSILON);
    }
}
