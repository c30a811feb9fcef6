//! emx-specreport CLI
//!
//! Replay scope traces and print them as a spec report.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use emx_specreport::trace::{self, TRACE_EXTENSION};
use emx_specreport::{ReportConfig, ReporterBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emx-specreport")]
#[command(author = "nzinfo <li.monan@gmail.com>")]
#[command(version)]
#[command(about = "Replay scope traces and print a spec report")]
struct Cli {
    /// Trace files or directories to replay
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Only print scopes whose path matches this regex
    #[arg(short = 'f', long)]
    filter: Option<String>,

    /// Verbose output: also print completed preconditions and actions
    #[arg(short, long)]
    verbose: bool,

    /// Do not render mismatch diffs
    #[arg(long = "no-diff")]
    no_diff: bool,

    /// Log every notification to stderr
    #[arg(long)]
    log: bool,

    /// Spaces per nesting level
    #[arg(long)]
    indent: Option<usize>,

    /// File extension to match in directories
    #[arg(long = "ext", default_value = TRACE_EXTENSION)]
    extension: String,

    /// Show number of traces without replaying
    #[arg(long = "count")]
    count: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every trace was valid and every scope passed.
fn run(cli: Cli) -> Result<bool> {
    let mut config = ReportConfig::from_env()?;
    config.verbose |= cli.verbose;
    config.show_diff &= !cli.no_diff;
    config.log |= cli.log;
    if let Some(filter) = cli.filter {
        config.filter = Some(filter);
    }
    if let Some(indent) = cli.indent {
        config.indent = indent;
    }

    init_tracing(config.log);

    let files = trace::discover(&cli.paths, &cli.extension).context("collecting traces")?;
    if cli.count {
        println!("Found {} trace(s)", files.len());
        return Ok(true);
    }
    if files.is_empty() {
        bail!("no {} files found", cli.extension);
    }

    let reporter = ReporterBuilder::from_config(config).stdout().build()?;
    let observer = reporter.observer();

    let mut invalid = 0;
    for file in &files {
        match trace::replay_file(observer.as_ref(), file) {
            Ok(summary) => {
                tracing::debug!(
                    file = %file.display(),
                    scopes = summary.scopes,
                    failed = summary.failed,
                    abandoned = summary.abandoned,
                    "trace replayed"
                );
            }
            Err(e) => {
                invalid += 1;
                eprintln!("error: {}", e);
            }
        }
    }

    println!();
    println!("{}", reporter.summary());
    if invalid > 0 {
        println!("{} invalid trace(s)", invalid);
    }

    Ok(invalid == 0 && reporter.all_passed())
}

/// Faults are always shown at warn level; `--log` adds per-notification events.
fn init_tracing(log: bool) {
    let filter = if log {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
