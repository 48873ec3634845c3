use std::io;

use crate::FileComparison;
use crate::aggregate::AnalysisReport;
use crate::comparator::PairDetail;
use crate::output::{Reporter, detail_summary, percent};

fn write_title(writer: &mut dyn io::Write, title: &str) -> io::Result<()> {
    writeln!(writer, "{title}")?;
    writeln!(writer, "{}", "=".repeat(title.len()))
}

fn optional_percent(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), percent)
}

pub struct TextReporter;

impl TextReporter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn write_auxiliary(&self, report: &AnalysisReport, writer: &mut dyn io::Write) -> io::Result<()> {
        if let Some(usage) = &report.class_usage {
            writeln!(
                writer,
                "Class usage: {} hybrid (Jaccard {}, weighted {}; {} shared, {} original-only, {} candidate-only)",
                percent(usage.hybrid_similarity),
                percent(usage.jaccard_similarity),
                percent(usage.weighted_jaccard_similarity),
                usage.shared_classes.len(),
                usage.only_in_original.len(),
                usage.only_in_candidate.len(),
            )?;
        }
        let config = &report.config;
        if let Some(tailwind) = &config.tailwind {
            writeln!(
                writer,
                "Tailwind theme: {} ({} shared key(s){})",
                percent(tailwind.similarity),
                tailwind.shared_config_keys.len(),
                if tailwind.unreadable { ", unreadable config" } else { "" },
            )?;
        }
        if let Some(package) = &config.package_json {
            writeln!(
                writer,
                "package.json: {} (dependencies {}, scripts {})",
                percent(package.similarity),
                optional_percent(package.dependencies),
                optional_percent(package.scripts),
            )?;
        }
        if let Some(tsconfig) = &config.tsconfig {
            writeln!(
                writer,
                "tsconfig.json: {} ({} compiler option(s))",
                percent(tsconfig.similarity),
                tsconfig.options.len(),
            )?;
        }
        Ok(())
    }
}

impl Default for TextReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for TextReporter {
    fn report_summary(
        &self,
        report: &AnalysisReport,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        write_title(writer, "Similarity Summary")?;
        writeln!(
            writer,
            "Overall similarity: {} ({})",
            percent(report.overall_similarity),
            report.prediction.label
        )?;
        writeln!(writer, "{}", report.prediction.description)?;
        writeln!(writer)?;

        if report.types.is_empty() {
            writeln!(writer, "No files compared.")?;
        } else {
            writeln!(
                writer,
                "{:<8} {:>9} {:>10} {:>8} {:>10} {:>8}  Prediction",
                "Type", "Original", "Candidate", "Matched", "Unmatched", "Score"
            )?;
            for (kind, t) in &report.types {
                writeln!(
                    writer,
                    "{:<8} {:>9} {:>10} {:>8} {:>10} {:>8}  {}",
                    kind.label(),
                    t.files_original,
                    t.files_candidate,
                    t.files_matched,
                    t.files_unmatched,
                    percent(t.aggregate_score),
                    t.prediction.label,
                )?;
            }
        }
        self.write_auxiliary(report, writer)
    }

    fn report_matches(
        &self,
        report: &AnalysisReport,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        if report.types.is_empty() {
            return writeln!(writer, "No matches.");
        }
        for (kind, t) in &report.types {
            write_title(writer, &format!("{} Matches", kind.label()))?;
            if t.matched_pairs.is_empty() {
                writeln!(writer, "No {} files matched.", kind.label())?;
            }
            for pair in &t.matched_pairs {
                writeln!(
                    writer,
                    "  {} <-> {} [{}, {}]: {}",
                    pair.original,
                    pair.candidate,
                    pair.match_type,
                    percent(pair.match_score),
                    percent(pair.score),
                )?;
                writeln!(writer, "      {}", detail_summary(&pair.detail))?;
            }
            for path in &t.unmatched_original {
                writeln!(writer, "  - {path} (only in original)")?;
            }
            for path in &t.unmatched_candidate {
                writeln!(writer, "  + {path} (only in candidate)")?;
            }
            writeln!(
                writer,
                "  Counts: {} matching, {} partial, {} different, {} missing, {} extra",
                t.counts.matching, t.counts.partial, t.counts.different, t.counts.missing, t.counts.extra
            )?;
            writeln!(writer)?;
        }
        Ok(())
    }

    fn report_file_comparison(
        &self,
        comparison: &FileComparison,
        writer: &mut dyn io::Write,
    ) -> io::Result<()> {
        write_title(writer, "File Comparison")?;
        writeln!(
            writer,
            "{} vs {} ({})",
            comparison.original,
            comparison.candidate,
            comparison.kind.label()
        )?;
        writeln!(writer, "Similarity: {}", percent(comparison.similarity))?;
        writeln!(writer, "{}", detail_summary(&comparison.detail))?;

        match &comparison.detail {
            PairDetail::Markup(r) => {
                for d in &r.differences {
                    if d.tag_mismatch {
                        writeln!(writer, "  ~ {}: <{}> vs <{}>", d.path, d.tag_a, d.tag_b)?;
                    } else {
                        writeln!(
                            writer,
                            "  ~ {}: attributes {}, text {}",
                            d.path,
                            percent(d.attr_similarity),
                            percent(d.text_similarity)
                        )?;
                    }
                }
                for path in &r.missing_elements {
                    writeln!(writer, "  - {path}")?;
                }
                for path in &r.extra_elements {
                    writeln!(writer, "  + {path}")?;
                }
            }
            PairDetail::Style(r) => {
                for (query, bucket) in &r.media {
                    writeln!(writer, "  @media {query}: {}", percent(bucket.similarity))?;
                }
                for (condition, bucket) in &r.supports {
                    writeln!(writer, "  @supports {condition}: {}", percent(bucket.similarity))?;
                }
                for (name, animation) in &r.keyframes.animations {
                    writeln!(
                        writer,
                        "  @keyframes {name}: {} ({} of {} step(s) differ)",
                        percent(animation.similarity),
                        animation.step_differences,
                        animation.total_steps
                    )?;
                }
            }
            PairDetail::Script(r) => {
                writeln!(writer, "  functions:    {}", percent(r.function_similarity))?;
                writeln!(writer, "  imports:      {}", percent(r.import_similarity))?;
                writeln!(writer, "  classes:      {}", percent(r.class_similarity))?;
                writeln!(writer, "  control flow: {}", percent(r.control_flow_similarity))?;
                writeln!(writer, "  call graph:   {}", percent(r.call_graph_similarity))?;
            }
            PairDetail::Failed { .. } => {}
        }
        Ok(())
    }
}
