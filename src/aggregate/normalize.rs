//! Row normalization: raw record -> `(period key, retail, warehouse)`.
//!
//! Two policies apply, and they differ on purpose:
//! - a row whose year/month do not parse as finite numbers is dropped (`None`)
//! - a measure that does not parse contributes `0.0`; the row still counts

use crate::domain::{PeriodKey, PeriodRow, RawRecord, RawValue, SourceRecord, SummaryRecord};

/// Normalize one raw record. Pure; `None` means "unusable, skip silently".
pub fn normalize(record: &RawRecord) -> Option<PeriodRow> {
    match record {
        RawRecord::Source(row) => normalize_source(row),
        RawRecord::Summary(row) => normalize_summary(row),
    }
}

fn normalize_source(row: &SourceRecord) -> Option<PeriodRow> {
    let period_key = period_key(row.year.as_ref()?, row.month.as_ref()?)?;
    Some(PeriodRow {
        period_key,
        retail: coerce_amount(row.retail_sales.as_ref()),
        warehouse: coerce_amount(row.warehouse_sales.as_ref()),
    })
}

fn normalize_summary(row: &SummaryRecord) -> Option<PeriodRow> {
    // Re-derive the key so artifact rows obey the same invariant as CSV rows.
    let (year, month) = row.date_key.trim().split_once('-')?;
    let period_key = PeriodKey::from_parts(parse_strict(year)?, parse_strict(month)?)?;
    Some(PeriodRow {
        period_key,
        retail: coerce_amount(row.retail.as_ref().or(row.retail_sales.as_ref())),
        warehouse: coerce_amount(row.warehouse.as_ref().or(row.warehouse_sales.as_ref())),
    })
}

/// Build a period key from raw year/month values.
pub fn period_key(year: &RawValue, month: &RawValue) -> Option<PeriodKey> {
    PeriodKey::from_parts(strict_number(year)?, strict_number(month)?)
}

/// Coerce a measure to a finite number, substituting zero.
///
/// Text follows `parseFloat` semantics: the longest numeric prefix wins
/// (`"12.5kg"` -> `12.5`), and anything unparseable becomes `0.0`.
pub fn coerce_amount(value: Option<&RawValue>) -> f64 {
    let v = match value {
        Some(RawValue::Number(n)) => *n,
        Some(RawValue::Text(s)) => parse_float_prefix(s).unwrap_or(f64::NAN),
        None => f64::NAN,
    };
    if v.is_finite() { v } else { 0.0 }
}

fn strict_number(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Number(n) => n.is_finite().then_some(*n),
        RawValue::Text(s) => parse_strict(s),
    }
}

// Whole-string parse. Blank text is deliberately not a number: a row with an
// empty YEAR or MONTH is dropped rather than bucketed under year or month 0.
fn parse_strict(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Parse the longest leading float literal (`[+-]digits[.digits][e[+-]digits]`).
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}
