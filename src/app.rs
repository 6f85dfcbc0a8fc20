//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging and loads `.env`
//! - parses CLI arguments
//! - resolves data sources (flags, then environment, then defaults)
//! - dispatches to precompute / summary / dashboard

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, PrecomputeArgs, SourceArgs, SummaryArgs};
use crate::domain::{DEFAULT_CSV, DEFAULT_SUMMARY, DashboardConfig, IngestConfig, SourceLocation};
use crate::error::AppError;

pub mod pipeline;

/// Environment fallback for `--csv`.
pub const ENV_CSV: &str = "PULSE_CSV";
/// Environment fallback for `--summary`.
pub const ENV_SUMMARY: &str = "PULSE_SUMMARY";

/// Entry point for the `pulse` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();
    dotenvy::dotenv().ok();

    // We want `pulse` and `pulse --csv x.csv` to behave like `pulse tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Precompute(args) => handle_precompute(args),
        Command::Summary(args) => handle_summary(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (e.g. from tests) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_precompute(args: PrecomputeArgs) -> Result<(), AppError> {
    if args.chunk_bytes == 0 {
        return Err(AppError::new(2, "--chunk-bytes must be at least 1."));
    }
    let csv = resolve_csv(args.csv.as_deref(), None, env_var);
    println!("Precomputing summary from {csv}...");
    let report = pipeline::precompute(&csv, &args.out, args.chunk_bytes)?;

    println!("Wrote {} rows to {}", report.periods, args.out.display());
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let config = dashboard_config_from_args(&args)?;
    let loaded = pipeline::load_blocking(&config.ingest)?;
    let rows = crate::aggregate::select_now(&loaded.series, config.range);

    println!("{}", crate::report::format_range_summary(config.range, &rows));

    if args.table && !rows.is_empty() {
        println!("{}", crate::report::format_series_table(&rows));
    }

    if config.plot && !rows.is_empty() {
        let plot = crate::plot::render_ascii_plot(&rows, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    Ok(())
}

fn handle_tui(args: SourceArgs) -> Result<(), AppError> {
    let ingest = ingest_config_from_args(&args)?;
    let services = crate::collab::Services::from_env();
    crate::tui::run(ingest, services)
}

pub fn dashboard_config_from_args(args: &SummaryArgs) -> Result<DashboardConfig, AppError> {
    Ok(DashboardConfig {
        ingest: ingest_config_from_args(&args.source)?,
        range: args.range,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
    })
}

/// Resolve source flags, running the interactive picker when `--pick` is set.
pub fn ingest_config_from_args(args: &SourceArgs) -> Result<IngestConfig, AppError> {
    let picked = if args.pick {
        Some(crate::cli::picker::prompt_for_csv_path()?)
    } else {
        None
    };
    resolve_ingest_config(args, picked, env_var)
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Pure resolution of the ingest config (flags > environment > defaults).
///
/// A picked CSV disables the summary fast path: the artifact describes the
/// default dataset, not an arbitrary file.
pub fn resolve_ingest_config<F>(args: &SourceArgs, picked: Option<PathBuf>, env: F) -> Result<IngestConfig, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    if args.chunk_bytes == 0 {
        return Err(AppError::new(2, "--chunk-bytes must be at least 1."));
    }

    let skip_summary = args.no_summary || picked.is_some();
    let csv = resolve_csv(args.csv.as_deref(), picked, &env);
    let summary = if skip_summary {
        None
    } else {
        let raw = args
            .summary
            .clone()
            .or_else(|| env(ENV_SUMMARY))
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string());
        Some(SourceLocation::parse(&raw))
    };

    Ok(IngestConfig {
        csv,
        summary,
        chunk_bytes: args.chunk_bytes,
        throttle: Duration::from_millis(args.throttle_ms),
    })
}

fn resolve_csv<F>(flag: Option<&str>, picked: Option<PathBuf>, env: F) -> SourceLocation
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = picked {
        return SourceLocation::Path(path);
    }
    let raw = flag
        .map(str::to_string)
        .or_else(|| env(ENV_CSV))
        .unwrap_or_else(|| DEFAULT_CSV.to_string());
    SourceLocation::parse(&raw)
}

/// Rewrite argv so `pulse` defaults to `pulse tui`.
///
/// Rules:
/// - `pulse`                      -> `pulse tui`
/// - `pulse --csv x.csv ...`      -> `pulse tui --csv x.csv ...`
/// - `pulse --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "precompute" | "summary" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn source(args: &[&str]) -> SourceArgs {
        let mut full = vec!["pulse", "tui"];
        full.extend_from_slice(args);
        match crate::cli::Cli::parse_from(full).command {
            Command::Tui(a) => a,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        assert_eq!(rewrite_args(argv(&["pulse"])), argv(&["pulse", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["pulse", "--csv", "x.csv"])),
            argv(&["pulse", "tui", "--csv", "x.csv"])
        );
        assert_eq!(rewrite_args(argv(&["pulse", "--help"])), argv(&["pulse", "--help"]));
        assert_eq!(
            rewrite_args(argv(&["pulse", "summary", "-r", "all"])),
            argv(&["pulse", "summary", "-r", "all"])
        );
    }

    #[test]
    fn defaults_without_flags_or_environment() {
        let cfg = resolve_ingest_config(&source(&[]), None, |_| None).unwrap();
        assert_eq!(cfg.csv, SourceLocation::Path(PathBuf::from(DEFAULT_CSV)));
        assert_eq!(cfg.summary, Some(SourceLocation::Path(PathBuf::from(DEFAULT_SUMMARY))));
        assert_eq!(cfg.chunk_bytes, 256 * 1024);
        assert_eq!(cfg.throttle, Duration::from_millis(250));
    }

    #[test]
    fn environment_fills_in_missing_flags() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_CSV, "https://example.com/sales.csv"),
            (ENV_SUMMARY, "cache/summary.json"),
        ]);
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let cfg = resolve_ingest_config(&source(&[]), None, lookup).unwrap();
        assert_eq!(cfg.csv, SourceLocation::Url("https://example.com/sales.csv".to_string()));
        assert_eq!(cfg.summary, Some(SourceLocation::Path(PathBuf::from("cache/summary.json"))));

        let cfg = resolve_ingest_config(&source(&["--csv", "local.csv", "--no-summary"]), None, lookup).unwrap();
        assert_eq!(cfg.csv, SourceLocation::Path(PathBuf::from("local.csv")));
        assert!(cfg.summary.is_none());
    }

    #[test]
    fn picked_csv_skips_the_summary() {
        let cfg = resolve_ingest_config(&source(&[]), Some(PathBuf::from("data/other.csv")), |_| None).unwrap();
        assert_eq!(cfg.csv, SourceLocation::Path(PathBuf::from("data/other.csv")));
        assert!(cfg.summary.is_none());
    }

    #[test]
    fn zero_chunk_size_is_a_usage_error() {
        let err = resolve_ingest_config(&source(&["--chunk-bytes", "0"]), None, |_| None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
