pub mod json;
pub mod text;

use std::io;

use crate::FileComparison;
use crate::aggregate::AnalysisReport;
use crate::comparator::PairDetail;

/// Format a 0..1 score as a percentage.
#[must_use]
pub fn percent(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

/// One-line description of a pair comparison.
#[must_use]
pub fn detail_summary(detail: &PairDetail) -> String {
    match detail {
        PairDetail::Markup(r) => r.summary.clone(),
        PairDetail::Style(r) => r.summary.clone(),
        PairDetail::Script(r) => format!(
            "{} matching, {} different, {} missing, {} extra function(s); call graph {}",
            r.matching_functions,
            r.different_functions,
            r.missing_functions,
            r.extra_functions,
            percent(r.call_graph_similarity)
        ),
        PairDetail::Failed { reason } => format!("comparison failed: {reason}"),
    }
}

/// Trait for reporting analysis results.
pub trait Reporter {
    /// Overall score, prediction and per-kind aggregates.
    fn report_summary(&self, report: &AnalysisReport, writer: &mut dyn io::Write)
    -> io::Result<()>;

    /// Matched pairs and unmatched files of every kind.
    fn report_matches(&self, report: &AnalysisReport, writer: &mut dyn io::Write)
    -> io::Result<()>;

    /// Summary followed by matches.
    fn report_full(&self, report: &AnalysisReport, writer: &mut dyn io::Write) -> io::Result<()> {
        self.report_summary(report, writer)?;
        writeln!(writer)?;
        self.report_matches(report, writer)
    }

    fn report_file_comparison(
        &self,
        comparison: &FileComparison,
        writer: &mut dyn io::Write,
    ) -> io::Result<()>;
}
