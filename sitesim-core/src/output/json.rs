use std::collections::BTreeMap;
use std::io;

use serde::Serialize;

use crate::FileComparison;
use crate::aggregate::{AnalysisReport, DetailCounts, Prediction};
use crate::comparator::ArtifactKind;
use crate::output::Reporter;

pub struct JsonReporter;

impl JsonReporter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    overall_similarity: f64,
    prediction: Prediction,
    types: BTreeMap<ArtifactKind, JsonTypeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_usage_similarity: Option<f64>,
    config_similarity: Vec<f64>,
    warnings: &'a [String],
}

#[derive(Serialize)]
struct JsonTypeSummary {
    files_original: usize,
    files_candidate: usize,
    files_matched: usize,
    files_unmatched: usize,
    aggregate_score: f64,
    prediction: Prediction,
    counts: DetailCounts,
}

fn write_json<T: Serialize>(value: &T, writer: &mut dyn io::Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(writer, "{json}")
}

impl Reporter for JsonReporter {
    fn report_summary(
        &self,
        report: &AnalysisReport,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        let summary = JsonSummary {
            overall_similarity: report.overall_similarity,
            prediction: report.prediction,
            types: report
                .types
                .iter()
                .map(|(kind, t)| {
                    (
                        *kind,
                        JsonTypeSummary {
                            files_original: t.files_original,
                            files_candidate: t.files_candidate,
                            files_matched: t.files_matched,
                            files_unmatched: t.files_unmatched,
                            aggregate_score: t.aggregate_score,
                            prediction: t.prediction,
                            counts: t.counts,
                        },
                    )
                })
                .collect(),
            class_usage_similarity: report.class_usage.as_ref().map(|c| c.hybrid_similarity),
            config_similarity: report.config.scores(),
            warnings: &report.warnings,
        };
        write_json(&summary, writer)
    }

    fn report_matches(
        &self,
        report: &AnalysisReport,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        let matches: BTreeMap<ArtifactKind, _> = report
            .types
            .iter()
            .map(|(kind, t)| (*kind, &t.matched_pairs))
            .collect();
        write_json(&matches, writer)
    }

    /// One document holding the whole report.
    fn report_full(&self, report: &AnalysisReport, writer: &mut dyn io::Write) -> io::Result<()> {
        write_json(report, writer)
    }

    fn report_file_comparison(
        &self,
        comparison: &FileComparison,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        write_json(comparison, writer)
    }
}
