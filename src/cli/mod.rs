//! Command-line parsing for the sales dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the ingestion/aggregation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_CHUNK_BYTES, DEFAULT_SUMMARY, RangeKind};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pulse", version, about = "Supply Pulse: monthly warehouse and retail sales")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate the raw CSV into the summary JSON used by the fast path.
    Precompute(PrecomputeArgs),
    /// Print range totals, and optionally a table and an ASCII plot.
    Summary(SummaryArgs),
    /// Launch the interactive dashboard.
    ///
    /// Data loads in the background; the chart fills in as the CSV streams.
    Tui(SourceArgs),
}

/// Where the data comes from and how it is streamed.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Raw sales CSV (path or http(s) URL). Falls back to `PULSE_CSV`.
    #[arg(long, value_name = "PATH|URL")]
    pub csv: Option<String>,

    /// Precomputed summary JSON (path or URL). Falls back to `PULSE_SUMMARY`.
    #[arg(long, value_name = "PATH|URL", conflicts_with = "no_summary")]
    pub summary: Option<String>,

    /// Skip the precomputed summary and always stream the raw CSV.
    #[arg(long)]
    pub no_summary: bool,

    /// Approximate bytes of CSV per streamed chunk.
    #[arg(long, default_value_t = DEFAULT_CHUNK_BYTES)]
    pub chunk_bytes: usize,

    /// Minimum milliseconds between progressive snapshots.
    #[arg(long, default_value_t = 250)]
    pub throttle_ms: u64,

    /// Pick the raw CSV interactively from files under the current directory.
    #[arg(long, conflicts_with = "csv")]
    pub pick: bool,
}

/// Options for `pulse summary`.
#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Time range to summarize.
    #[arg(short = 'r', long, value_enum, default_value_t = RangeKind::Year)]
    pub range: RangeKind,

    /// Print the per-period table for the range.
    #[arg(long)]
    pub table: bool,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for `pulse precompute`.
#[derive(Debug, Args, Clone)]
pub struct PrecomputeArgs {
    /// Raw sales CSV (path or http(s) URL). Falls back to `PULSE_CSV`.
    #[arg(long, value_name = "PATH|URL")]
    pub csv: Option<String>,

    /// Output summary JSON.
    #[arg(short = 'o', long, value_name = "JSON", default_value = DEFAULT_SUMMARY)]
    pub out: PathBuf,

    /// Approximate bytes of CSV per streamed chunk.
    #[arg(long, default_value_t = DEFAULT_CHUNK_BYTES)]
    pub chunk_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_defaults() {
        let cli = Cli::parse_from(["pulse", "summary"]);
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.range, RangeKind::Year);
        assert!(args.plot && !args.no_plot);
        assert_eq!(args.source.chunk_bytes, 256 * 1024);
        assert_eq!(args.source.throttle_ms, 250);
        assert!(args.source.csv.is_none());
    }

    #[test]
    fn range_tokens_parse() {
        let cli = Cli::parse_from(["pulse", "summary", "--range", "6m", "--no-summary"]);
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.range, RangeKind::SixMonths);
        assert!(args.source.no_summary);
    }

    #[test]
    fn summary_and_no_summary_conflict() {
        let res = Cli::try_parse_from(["pulse", "tui", "--summary", "s.json", "--no-summary"]);
        assert!(res.is_err());
    }
}
