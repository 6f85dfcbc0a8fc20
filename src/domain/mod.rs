//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw input records in both supported shapes (`RawRecord`)
//! - period keys, normalized rows and aggregates (`PeriodKey`, `PeriodRow`, `PeriodAggregate`)
//! - range selection tokens (`RangeKind`)
//! - run configuration (`IngestConfig`, `DashboardConfig`)

pub mod types;

pub use types::*;
