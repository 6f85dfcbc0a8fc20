//! Shared load/precompute logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! raw CSV -> chunked stream -> normalize -> accumulate -> materialize
//!
//! The precompute tool and the runtime fallback both go through
//! `ingest::stream` + `aggregate::AggregateStore`, so the summary artifact and a
//! streamed load always agree.

use std::ops::ControlFlow;
use std::path::Path;

use tracing::info;

use crate::aggregate::AggregateStore;
use crate::domain::{IngestConfig, PeriodAggregate, SourceLocation};
use crate::error::AppError;
use crate::ingest::{CancelHandle, IngestOutcome, IngestState, SystemClock, run_ingest, source, stream};

/// A completed, synchronous load.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: Vec<PeriodAggregate>,
    pub outcome: IngestOutcome,
}

/// Run one ingestion session on the current thread and wait for it.
pub fn load_blocking(config: &IngestConfig) -> Result<LoadedSeries, AppError> {
    let mut state = IngestState::new();
    let outcome = run_ingest(config, &SystemClock, &CancelHandle::new(), &mut state);

    if let Some(err) = state.error() {
        return Err(AppError::new(4, format!("Failed to load data: {err}")));
    }

    Ok(LoadedSeries {
        series: state.series().to_vec(),
        outcome,
    })
}

/// What `precompute` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecomputeReport {
    pub rows: usize,
    pub periods: usize,
}

/// Aggregate the whole raw source and write the summary artifact to `out`.
pub fn precompute(csv: &SourceLocation, out: &Path, chunk_bytes: usize) -> Result<PrecomputeReport, AppError> {
    let reader = source::open(csv)?;

    let mut store = AggregateStore::new();
    let stats = stream::for_each_chunk(reader, chunk_bytes, |rows| {
        store.ingest_records(&rows);
        ControlFlow::Continue(())
    })?;

    let series = store.materialize();
    crate::io::write_summary_json(out, &series)?;

    info!(source = %csv, out = %out.display(), rows = stats.rows, periods = series.len(), "precomputed summary");
    Ok(PrecomputeReport {
        rows: stats.rows,
        periods: series.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    const CSV: &str = "\
YEAR,MONTH,SUPPLIER,ITEM CODE,RETAIL SALES,WAREHOUSE SALES
2020,1,A,1,10,5
2020,1,B,2,3.5,2
2020,2,A,1,n/a,1
abc,3,A,1,100,100
2019,12,C,3,7,0
";

    fn config(dir: &Path, summary: Option<&Path>) -> IngestConfig {
        IngestConfig {
            csv: SourceLocation::Path(dir.join("sales.csv")),
            summary: summary.map(|p| SourceLocation::Path(p.to_path_buf())),
            chunk_bytes: 16,
            throttle: Duration::ZERO,
        }
    }

    #[test]
    fn precompute_then_fast_path_matches_streamed_series() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sales.csv"), CSV).unwrap();
        let out = dir.path().join("public").join("summary.json");

        let streamed = load_blocking(&config(dir.path(), None)).unwrap();
        assert!(matches!(streamed.outcome, IngestOutcome::Streamed { periods: 3, .. }));

        let report = precompute(&SourceLocation::Path(dir.path().join("sales.csv")), &out, 64).unwrap();
        assert_eq!(report, PrecomputeReport { rows: 5, periods: 3 });

        // Remove the raw CSV so only the fast path can succeed.
        fs::remove_file(dir.path().join("sales.csv")).unwrap();
        let fast = load_blocking(&config(dir.path(), Some(&out))).unwrap();
        assert_eq!(fast.outcome, IngestOutcome::FastPath { periods: 3 });
        assert_eq!(fast.series, streamed.series);

        let keys: Vec<&str> = fast.series.iter().map(|r| r.period_key.as_str()).collect();
        assert_eq!(keys, vec!["2019-12", "2020-01", "2020-02"]);
        assert!((fast.series[1].retail - 13.5).abs() < 1e-9);
        assert!((fast.series[2].warehouse - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_raw_source_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_blocking(&config(dir.path(), None)).unwrap_err();
        assert_eq!(err.exit_code(), 4);

        let err = precompute(
            &SourceLocation::Path(dir.path().join("nope.csv")),
            &dir.path().join("out.json"),
            1024,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
