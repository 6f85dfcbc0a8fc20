//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - accumulated in-memory during ingestion
//! - written to (and reloaded from) the precomputed summary JSON
//! - handed to the report / TUI layers as immutable snapshots

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Field names used by the raw warehouse/retail sales CSV.
pub const FIELD_YEAR: &str = "YEAR";
pub const FIELD_MONTH: &str = "MONTH";
pub const FIELD_RETAIL: &str = "RETAIL SALES";
pub const FIELD_WAREHOUSE: &str = "WAREHOUSE SALES";

/// Field names used by the precomputed summary artifact.
pub const FIELD_DATE_KEY: &str = "dateKey";
pub const FIELD_SUMMARY_RETAIL: &str = "retail";
pub const FIELD_SUMMARY_WAREHOUSE: &str = "warehouse";

/// Canonical `YYYY-MM` bucket identifier.
///
/// Fixed-width zero padding makes lexicographic order equal chronological order,
/// so the derived `Ord` is the series order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Build a key from already-parsed year/month numbers.
    ///
    /// Returns `None` unless both values are finite.
    pub fn from_parts(year: f64, month: f64) -> Option<Self> {
        if !year.is_finite() || !month.is_finite() {
            return None;
        }
        let year = format_number(year);
        let month = format_number(month);
        Some(Self(format!("{year}-{month:0>2}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric year taken from the first four characters of the key.
    pub fn year(&self) -> Option<i32> {
        self.0.get(..4)?.parse().ok()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

// Integral values print without a fractional part (`2023`, not `2023.0`).
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// A single field value as delivered by a parser: CSV cells are always text,
/// JSON summary cells are usually numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

/// A row as delivered by the raw sales CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    pub year: Option<RawValue>,
    pub month: Option<RawValue>,
    pub retail_sales: Option<RawValue>,
    pub warehouse_sales: Option<RawValue>,
}

/// A row rehydrated from the precomputed summary artifact.
///
/// The source-file measure columns are kept as a fallback for artifacts that
/// were written with the raw column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryRecord {
    pub date_key: String,
    pub retail: Option<RawValue>,
    pub warehouse: Option<RawValue>,
    pub retail_sales: Option<RawValue>,
    pub warehouse_sales: Option<RawValue>,
}

/// Untyped input record in one of the two supported shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Source(SourceRecord),
    Summary(SummaryRecord),
}

impl RawRecord {
    /// Resolve the record shape from a field map: anything carrying a textual
    /// `dateKey` is a summary row, everything else is treated as a CSV row.
    pub fn from_fields(mut fields: HashMap<String, RawValue>) -> Self {
        let retail_sales = fields.remove(FIELD_RETAIL);
        let warehouse_sales = fields.remove(FIELD_WAREHOUSE);

        match fields.remove(FIELD_DATE_KEY) {
            Some(RawValue::Text(date_key)) if !date_key.is_empty() => RawRecord::Summary(SummaryRecord {
                date_key,
                retail: fields.remove(FIELD_SUMMARY_RETAIL),
                warehouse: fields.remove(FIELD_SUMMARY_WAREHOUSE),
                retail_sales,
                warehouse_sales,
            }),
            _ => RawRecord::Source(SourceRecord {
                year: fields.remove(FIELD_YEAR),
                month: fields.remove(FIELD_MONTH),
                retail_sales,
                warehouse_sales,
            }),
        }
    }
}

/// A normalized row: one contribution to one period bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRow {
    pub period_key: PeriodKey,
    pub retail: f64,
    pub warehouse: f64,
}

/// Running sums for one period bucket.
///
/// Serialized with the artifact field names (`dateKey`, `retail`, `warehouse`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    #[serde(rename = "dateKey")]
    pub period_key: PeriodKey,
    pub retail: f64,
    pub warehouse: f64,
}

impl PeriodAggregate {
    pub fn empty(period_key: PeriodKey) -> Self {
        Self {
            period_key,
            retail: 0.0,
            warehouse: 0.0,
        }
    }
}

/// Named selection policy over a materialized series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum RangeKind {
    /// Latest period only.
    #[serde(rename = "month")]
    #[value(name = "month")]
    Month,
    /// Trailing six periods.
    #[serde(rename = "6m")]
    #[value(name = "6m")]
    SixMonths,
    /// Current calendar year, or the latest year present.
    #[serde(rename = "year")]
    #[value(name = "year")]
    Year,
    /// Everything.
    #[serde(rename = "all")]
    #[value(name = "all")]
    All,
}

impl RangeKind {
    pub const ALL: [RangeKind; 4] = [
        RangeKind::Month,
        RangeKind::SixMonths,
        RangeKind::Year,
        RangeKind::All,
    ];

    pub fn token(self) -> &'static str {
        match self {
            RangeKind::Month => "month",
            RangeKind::SixMonths => "6m",
            RangeKind::Year => "year",
            RangeKind::All => "all",
        }
    }

    /// Long label used in headers.
    pub fn display_name(self) -> &'static str {
        match self {
            RangeKind::Month => "Last month",
            RangeKind::SixMonths => "Last 6 months",
            RangeKind::Year => "Past year",
            RangeKind::All => "Full history",
        }
    }

    /// Short label used for filter buttons.
    pub fn short_label(self) -> &'static str {
        match self {
            RangeKind::Month => "Month",
            RangeKind::SixMonths => "6 months",
            RangeKind::Year => "Year",
            RangeKind::All => "All time",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.token())
    }
}

impl FromStr for RangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.token() == s.trim())
            .ok_or_else(|| format!("Unknown range '{s}'. Expected one of: month, 6m, year, all."))
    }
}

/// Where an input (raw CSV or summary JSON) lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Path(PathBuf),
    Url(String),
}

impl SourceLocation {
    /// Interpret `http://` / `https://` prefixes as URLs, anything else as a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SourceLocation::Url(trimmed.to_string())
        } else {
            SourceLocation::Path(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Path(p) => write!(f, "{}", p.display()),
            SourceLocation::Url(u) => f.write_str(u),
        }
    }
}

/// Default raw source file name.
pub const DEFAULT_CSV: &str = "Warehouse_and_Retail_Sales.csv";
/// Default precomputed summary location.
pub const DEFAULT_SUMMARY: &str = "public/summary.json";
/// Streaming chunk size in bytes; tuned for throughput vs. UI responsiveness.
pub const DEFAULT_CHUNK_BYTES: usize = 256 * 1024;
/// Minimum spacing between progressive snapshots.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(250);

/// Inputs and tuning for one ingestion session.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub csv: SourceLocation,
    /// `None` skips the fast path entirely.
    pub summary: Option<SourceLocation>,
    pub chunk_bytes: usize,
    pub throttle: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            csv: SourceLocation::Path(PathBuf::from(DEFAULT_CSV)),
            summary: Some(SourceLocation::Path(PathBuf::from(DEFAULT_SUMMARY))),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            throttle: DEFAULT_THROTTLE,
        }
    }
}

/// A full run's configuration as understood by the front-ends.
///
/// This is derived from CLI flags, `.env` / environment, and defaults.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub ingest: IngestConfig,
    pub range: RangeKind,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_key_pads_month() {
        assert_eq!(PeriodKey::from_parts(2023.0, 1.0).unwrap().as_str(), "2023-01");
        assert_eq!(PeriodKey::from_parts(2023.0, 12.0).unwrap().as_str(), "2023-12");
        assert!(PeriodKey::from_parts(f64::NAN, 1.0).is_none());
        assert!(PeriodKey::from_parts(2023.0, f64::INFINITY).is_none());
    }

    #[test]
    fn display_honors_width_and_alignment() {
        let key = PeriodKey::from_parts(2020.0, 2.0).unwrap();
        assert_eq!(format!("{key:>10}"), "   2020-02");
        assert_eq!(format!("{key:<9}|"), "2020-02  |");
        assert_eq!(format!("{:>5}", RangeKind::All), format!("{:>5}", RangeKind::All.token()));
    }

    #[test]
    fn period_key_order_is_chronological() {
        let a = PeriodKey::from_parts(2019.0, 12.0).unwrap();
        let b = PeriodKey::from_parts(2020.0, 2.0).unwrap();
        let c = PeriodKey::from_parts(2020.0, 10.0).unwrap();
        assert!(a < b && b < c);
        assert_eq!(c.year(), Some(2020));
    }

    #[test]
    fn record_shape_resolved_by_date_key() {
        let mut fields = HashMap::new();
        fields.insert("dateKey".to_string(), RawValue::from("2020-01"));
        fields.insert("retail".to_string(), RawValue::from(3.5));
        match RawRecord::from_fields(fields) {
            RawRecord::Summary(s) => {
                assert_eq!(s.date_key, "2020-01");
                assert_eq!(s.retail, Some(RawValue::Number(3.5)));
            }
            other => panic!("expected summary record, got {other:?}"),
        }

        let mut fields = HashMap::new();
        fields.insert("YEAR".to_string(), RawValue::from("2020"));
        fields.insert("MONTH".to_string(), RawValue::from("1"));
        assert!(matches!(RawRecord::from_fields(fields), RawRecord::Source(_)));
    }

    #[test]
    fn range_tokens_round_trip() {
        for r in RangeKind::ALL {
            assert_eq!(r.token().parse::<RangeKind>().unwrap(), r);
        }
        assert!("week".parse::<RangeKind>().is_err());
        assert_eq!(RangeKind::All.next(), RangeKind::Month);
        assert_eq!(RangeKind::Month.prev(), RangeKind::All);
    }

    #[test]
    fn aggregate_serializes_with_artifact_names() {
        let agg = PeriodAggregate {
            period_key: PeriodKey::from_parts(2020.0, 3.0).unwrap(),
            retail: 1.5,
            warehouse: 2.0,
        };
        let json = serde_json::to_string(&agg).unwrap();
        assert_eq!(json, r#"{"dateKey":"2020-03","retail":1.5,"warehouse":2.0}"#);
    }

    #[test]
    fn source_location_detects_urls() {
        assert_eq!(
            SourceLocation::parse("https://example.com/s.json"),
            SourceLocation::Url("https://example.com/s.json".to_string())
        );
        assert_eq!(
            SourceLocation::parse("data/sales.csv"),
            SourceLocation::Path(PathBuf::from("data/sales.csv"))
        );
    }
}
