//! Folding per-kind matches and auxiliary signals into one report.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::classes::ClassUsageComparison;
use crate::comparator::{ArtifactKind, PairDetail};
use crate::config_signal::ConfigSimilarity;
use crate::matcher::{MatchRecord, TypeMatches};

/// Lower bound of the "high" prediction bucket.
pub const HIGH_SIMILARITY: f64 = 0.75;
/// Lower bound of the "moderate" prediction bucket.
pub const MODERATE_SIMILARITY: f64 = 0.40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionLabel {
    High,
    Moderate,
    Low,
}

impl PredictionLabel {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_SIMILARITY {
            Self::High
        } else if score >= MODERATE_SIMILARITY {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::High => "High similarity: likely copied or derived",
            Self::Moderate => "Moderate similarity: possible reuse or inspiration",
            Self::Low => "Low similarity: likely independent",
        }
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub label: PredictionLabel,
    pub description: &'static str,
}

impl Prediction {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        let label = PredictionLabel::from_score(score);
        Self {
            label,
            description: label.description(),
        }
    }
}

/// Element, selector or function counts summed over every pair of a kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetailCounts {
    pub matching: usize,
    /// Stylesheets only.
    pub partial: usize,
    pub different: usize,
    pub missing: usize,
    pub extra: usize,
}

impl DetailCounts {
    fn add(&mut self, detail: &PairDetail) {
        match detail {
            PairDetail::Markup(r) => {
                self.matching += r.matching;
                self.different += r.different;
                self.missing += r.missing;
                self.extra += r.extra;
            }
            PairDetail::Style(r) => {
                self.matching += r.matching_selectors;
                self.partial += r.partial_selectors;
                self.different += r.different_selectors;
                self.missing += r.missing_selectors;
                self.extra += r.extra_selectors;
            }
            PairDetail::Script(r) => {
                self.matching += r.matching_functions;
                self.different += r.different_functions;
                self.missing += r.missing_functions;
                self.extra += r.extra_functions;
            }
            PairDetail::Failed { .. } => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeReport {
    pub files_original: usize,
    pub files_candidate: usize,
    pub files_matched: usize,
    pub files_unmatched: usize,
    pub aggregate_score: f64,
    pub prediction: Prediction,
    pub matched_pairs: Vec<MatchRecord>,
    pub unmatched_original: Vec<String>,
    pub unmatched_candidate: Vec<String>,
    pub counts: DetailCounts,
}

impl From<TypeMatches> for TypeReport {
    fn from(matches: TypeMatches) -> Self {
        let aggregate_score = matches.aggregate_score();
        let mut counts = DetailCounts::default();
        for record in &matches.matches {
            counts.add(&record.detail);
        }
        Self {
            files_original: matches.files_original,
            files_candidate: matches.files_candidate,
            files_matched: matches.matches.len(),
            files_unmatched: matches.unmatched_original.len() + matches.unmatched_candidate.len(),
            aggregate_score,
            prediction: Prediction::from_score(aggregate_score),
            matched_pairs: matches.matches,
            unmatched_original: matches.unmatched_original,
            unmatched_candidate: matches.unmatched_candidate,
            counts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub overall_similarity: f64,
    pub prediction: Prediction,
    /// Only kinds with at least one file on either side.
    pub types: BTreeMap<ArtifactKind, TypeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_usage: Option<ClassUsageComparison>,
    pub config: ConfigSimilarity,
    pub warnings: Vec<String>,
}

/// Build the report. The overall score is a file-count-weighted mean: every
/// pair, every unmatched file and, when `include_auxiliary` is set, every
/// performed auxiliary signal is one unit.
#[must_use]
pub fn build_report(
    per_kind: Vec<TypeMatches>,
    class_usage: Option<ClassUsageComparison>,
    config: ConfigSimilarity,
    include_auxiliary: bool,
    warnings: Vec<String>,
) -> AnalysisReport {
    let mut sum = 0.0;
    let mut units = 0usize;
    for matches in &per_kind {
        sum += matches.score_sum();
        units += matches.units();
    }
    if include_auxiliary {
        let auxiliary = class_usage
            .iter()
            .map(|c| c.hybrid_similarity)
            .chain(config.scores());
        for score in auxiliary {
            sum += score;
            units += 1;
        }
    }
    let overall_similarity = if units == 0 { 0.0 } else { sum / units as f64 };

    let types = per_kind
        .into_iter()
        .filter(|m| m.units() > 0)
        .map(|m| (m.kind, TypeReport::from(m)))
        .collect();

    AnalysisReport {
        overall_similarity,
        prediction: Prediction::from_score(overall_similarity),
        types,
        class_usage,
        config,
        warnings,
    }
}
