use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::aggregate::AnalysisReport;
use crate::analyzer::FrontendRegistry;
use crate::config::Config;
use crate::output::Reporter;
use crate::output::json::JsonReporter;
use crate::output::percent;
use crate::output::text::TextReporter;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by CLI command functions.
#[derive(Debug)]
pub enum CliError {
    /// An I/O error (exit code 2).
    Io(io::Error),
    /// Analysis or comparison failed (exit code 2).
    Analysis(crate::error::Error),
    /// Similarity at or above the allowed maximum (exit code 1).
    CheckFailed,
}

impl CliError {
    /// Map to an appropriate process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::CheckFailed => 1,
            Self::Io(_) | Self::Analysis(_) => 2,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Analysis(e) => write!(f, "{e}"),
            Self::CheckFailed => write!(f, "Check failed"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Analysis(e) => Some(e),
            Self::CheckFailed => None,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<crate::error::Error> for CliError {
    fn from(e: crate::error::Error) -> Self {
        Self::Analysis(e)
    }
}

/// Result type for CLI operations.
pub type CliResult<T = ()> = Result<T, CliError>;

// ---------------------------------------------------------------------------
// Shared CLI types
// ---------------------------------------------------------------------------

/// Output format for CLI reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// CLI subcommands.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(clap::Subcommand))]
pub enum Command {
    /// Full report: summary plus matched and unmatched files per type.
    Report {
        /// Original project (directory, .zip, .tar, .tar.gz or .tgz).
        original: PathBuf,
        /// Candidate project (directory, .zip, .tar, .tar.gz or .tgz).
        candidate: PathBuf,
    },
    /// Overall similarity, prediction and per-type aggregates.
    Summary {
        original: PathBuf,
        candidate: PathBuf,
    },
    /// Exit with status 1 when the overall similarity reaches a maximum.
    Check {
        original: PathBuf,
        candidate: PathBuf,
        /// Maximum allowed overall similarity (0.0 to 1.0).
        #[cfg_attr(feature = "cli", arg(long))]
        max_similarity: f64,
    },
    /// Compare two single files of the same type.
    CompareFiles {
        original: PathBuf,
        candidate: PathBuf,
    },
}

/// Optional CLI overrides applied on top of file-based config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub threads: Option<usize>,
    pub parse_timeout_ms: Option<u64>,
    pub fuzzy_threshold: Option<f64>,
    pub structural_threshold: Option<f64>,
    pub contextual_threshold: Option<f64>,
    pub content_threshold: Option<f64>,
    pub no_auxiliary: bool,
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Load the config: the explicit `--config` file when given (errors are
/// fatal), otherwise `sitesim.toml` in the working directory if present.
pub fn load_config(overrides: &CliOverrides) -> CliResult<Config> {
    let mut config = match &overrides.config_file {
        Some(path) => Config::try_load_file(path)?,
        None => Config::load(Path::new(".")),
    };
    apply_overrides(&mut config, overrides);
    Ok(config)
}

/// Apply CLI overrides to a loaded `Config`.
///
/// CLI `--exclude` patterns are *appended* to config-file excludes (not replaced).
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if !overrides.exclude.is_empty() {
        config.exclude.extend(overrides.exclude.iter().cloned());
    }
    if let Some(v) = overrides.threads {
        config.threads = v;
    }
    if let Some(v) = overrides.parse_timeout_ms {
        config.parse_timeout_ms = v;
    }
    if let Some(v) = overrides.fuzzy_threshold {
        config.fuzzy_threshold = v;
    }
    if let Some(v) = overrides.structural_threshold {
        config.structural_threshold = v;
    }
    if let Some(v) = overrides.contextual_threshold {
        config.contextual_threshold = v;
    }
    if let Some(v) = overrides.content_threshold {
        config.content_threshold = v;
    }
    if overrides.no_auxiliary {
        config.include_auxiliary = false;
    }
}

/// Create a reporter for the given output format.
#[must_use]
pub fn create_reporter(format: OutputFormat) -> Box<dyn Reporter> {
    match format {
        OutputFormat::Text => Box::new(TextReporter::new()),
        OutputFormat::Json => Box::new(JsonReporter::new()),
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Compare two projects and return the report.
///
/// Warnings are stored in [`AnalysisReport::warnings`] but **not** printed;
/// the caller is responsible for writing them to stderr.
pub fn run_analysis(
    registry: &FrontendRegistry,
    original: &Path,
    candidate: &Path,
    config: &Config,
) -> CliResult<AnalysisReport> {
    Ok(crate::analyze(registry, original, candidate, config)?)
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

/// Show the overall score and per-type aggregates.
pub fn cmd_summary(
    report: &AnalysisReport,
    reporter: &dyn Reporter,
    writer: &mut impl Write,
) -> CliResult {
    reporter.report_summary(report, writer)?;
    Ok(())
}

/// Show the full report (summary + matches).
pub fn cmd_report(
    report: &AnalysisReport,
    reporter: &dyn Reporter,
    writer: &mut impl Write,
) -> CliResult {
    reporter.report_full(report, writer)?;
    Ok(())
}

/// Gate on the overall similarity; returns `Err(CliError::CheckFailed)` when
/// it reaches `max_similarity`.
pub fn cmd_check(
    report: &AnalysisReport,
    reporter: &dyn Reporter,
    writer: &mut impl Write,
    max_similarity: f64,
) -> CliResult {
    reporter.report_summary(report, writer)?;

    if report.overall_similarity >= max_similarity {
        writeln!(
            writer,
            "\nCheck FAILED: overall similarity {} (max: {})",
            percent(report.overall_similarity),
            percent(max_similarity)
        )?;
        Err(CliError::CheckFailed)
    } else {
        writeln!(writer, "\nCheck passed.")?;
        Ok(())
    }
}

/// Compare two single files and report the pair.
pub fn cmd_compare_files(
    registry: &FrontendRegistry,
    config: &Config,
    original: &Path,
    candidate: &Path,
    reporter: &dyn Reporter,
    writer: &mut impl Write,
) -> CliResult {
    let comparison = crate::compare_files(registry, config, original, candidate)?;
    reporter.report_file_comparison(&comparison, writer)?;
    Ok(())
}
