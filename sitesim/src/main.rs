use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use sitesim_core::cli::{self, CliError, CliOverrides, Command, OutputFormat};

#[derive(Parser)]
#[command(
    name = "sitesim",
    version,
    about = "Structural similarity between an original and a candidate web front-end project"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Config file (defaults to ./sitesim.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Exclude paths containing this pattern (can be repeated).
    #[arg(long, global = true)]
    exclude: Vec<String>,

    /// Worker threads (0 uses every core).
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Per-file parser timeout in milliseconds (0 disables it).
    #[arg(long, global = true)]
    parse_timeout_ms: Option<u64>,

    /// Minimum path similarity for fuzzy matching (0.0-1.0).
    #[arg(long, global = true)]
    fuzzy_threshold: Option<f64>,

    /// Minimum score for structural matching (0.0-1.0).
    #[arg(long, global = true)]
    structural_threshold: Option<f64>,

    /// Minimum score for contextual matching (0.0-1.0).
    #[arg(long, global = true)]
    contextual_threshold: Option<f64>,

    /// Minimum score for content matching (0.0-1.0).
    #[arg(long, global = true)]
    content_threshold: Option<f64>,

    /// Leave class usage and project config signals out of the overall score.
    #[arg(long, global = true)]
    no_auxiliary: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

/// Log to stderr. `SITESIM_LOG` (then `RUST_LOG`) wins over `-v`.
fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("SITESIM_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with(e: &CliError) -> ! {
    if !matches!(e, CliError::CheckFailed) {
        eprintln!("Error: {e}");
    }
    process::exit(e.exit_code());
}

fn main() {
    let Cli {
        command,
        format,
        config,
        exclude,
        threads,
        parse_timeout_ms,
        fuzzy_threshold,
        structural_threshold,
        contextual_threshold,
        content_threshold,
        no_auxiliary,
        verbose,
    } = Cli::parse();

    init_tracing(verbose);

    let overrides = CliOverrides {
        config_file: config,
        exclude,
        threads,
        parse_timeout_ms,
        fuzzy_threshold,
        structural_threshold,
        contextual_threshold,
        content_threshold,
        no_auxiliary,
    };
    let config = cli::load_config(&overrides).unwrap_or_else(|e| exit_with(&e));
    let registry = sitesim_syntax::registry();
    let reporter = cli::create_reporter(format);

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    let result = match &command {
        Command::CompareFiles {
            original,
            candidate,
        } => cli::cmd_compare_files(
            &registry,
            &config,
            original,
            candidate,
            reporter.as_ref(),
            &mut writer,
        ),
        Command::Report {
            original,
            candidate,
        }
        | Command::Summary {
            original,
            candidate,
        }
        | Command::Check {
            original,
            candidate,
            ..
        } => {
            let report = cli::run_analysis(&registry, original, candidate, &config)
                .unwrap_or_else(|e| exit_with(&e));

            for warning in &report.warnings {
                eprintln!("Warning: {warning}");
            }

            match &command {
                Command::Summary { .. } => cli::cmd_summary(&report, reporter.as_ref(), &mut writer),
                Command::Check { max_similarity, .. } => {
                    cli::cmd_check(&report, reporter.as_ref(), &mut writer, *max_similarity)
                }
                _ => cli::cmd_report(&report, reporter.as_ref(), &mut writer),
            }
        }
    };

    if let Err(e) = result {
        exit_with(&e);
    }
}
