//! Reporting utilities: range totals and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the aggregation code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)

use crate::domain::{PeriodAggregate, PeriodKey};

pub mod format;

pub use format::*;

/// Totals over a selected range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSummary {
    pub retail_total: f64,
    pub warehouse_total: f64,
    pub periods: usize,
    pub last_period: PeriodKey,
}

impl RangeSummary {
    /// `None` for an empty range ("no data").
    pub fn from_rows(rows: &[PeriodAggregate]) -> Option<Self> {
        let last = rows.last()?;
        Some(Self {
            retail_total: rows.iter().map(|r| r.retail).sum(),
            warehouse_total: rows.iter().map(|r| r.warehouse).sum(),
            periods: rows.len(),
            last_period: last.period_key.clone(),
        })
    }
}
