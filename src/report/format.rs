//! Terminal formatting for range summaries and period tables.

use crate::domain::{PeriodAggregate, RangeKind};

use super::RangeSummary;

/// Message shown when a range selects nothing.
pub const NO_DATA: &str = "No data available for this range.";

/// Format the headline block for one range.
pub fn format_range_summary(range: RangeKind, rows: &[PeriodAggregate]) -> String {
    let mut out = String::new();

    out.push_str("=== Supply Pulse: Warehouse and Retail Sales ===\n");
    out.push_str(&format!("Range: {}\n", range.display_name()));

    let Some(summary) = RangeSummary::from_rows(rows) else {
        out.push_str(NO_DATA);
        out.push('\n');
        return out;
    };

    out.push_str(&format!(
        "Retail volume:    {:>18} (across {} periods)\n",
        fmt_amount(summary.retail_total),
        summary.periods
    ));
    out.push_str(&format!(
        "Warehouse volume: {:>18} (same timeframe)\n",
        fmt_amount(summary.warehouse_total)
    ));
    out.push_str(&format!("Latest period:    {:>18}\n", summary.last_period));

    out
}

/// Format a per-period table.
pub fn format_series_table(rows: &[PeriodAggregate]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<8} {:>18} {:>18}", "period", "retail", "warehouse").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<8} {:-<18} {:-<18}", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<8} {:>18} {:>18}",
                r.period_key.as_str(),
                fmt_amount(r.retail),
                fmt_amount(r.warehouse),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// `1234567.891` -> `1,234,567.89`.
pub fn fmt_amount(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeriodKey;

    fn agg(month: f64, retail: f64, warehouse: f64) -> PeriodAggregate {
        PeriodAggregate {
            period_key: PeriodKey::from_parts(2020.0, month).unwrap(),
            retail,
            warehouse,
        }
    }

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(fmt_amount(0.0), "0.00");
        assert_eq!(fmt_amount(999.999), "1,000.00");
        assert_eq!(fmt_amount(1234567.891), "1,234,567.89");
        assert_eq!(fmt_amount(-12345.5), "-12,345.50");
        assert_eq!(fmt_amount(-0.001), "0.00");
        assert_eq!(fmt_amount(f64::NAN), "-");
    }

    #[test]
    fn summary_block_snapshot() {
        let rows = vec![agg(1.0, 1000.0, 20.5), agg(2.0, 234.5, 0.0)];
        let txt = format_range_summary(RangeKind::SixMonths, &rows);
        let expected = concat!(
            "=== Supply Pulse: Warehouse and Retail Sales ===\n",
            "Range: Last 6 months\n",
            "Retail volume:              1,234.50 (across 2 periods)\n",
            "Warehouse volume:              20.50 (same timeframe)\n",
            "Latest period:               2020-02\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_range_reports_no_data() {
        let txt = format_range_summary(RangeKind::Year, &[]);
        assert!(txt.ends_with("No data available for this range.\n"));
    }

    #[test]
    fn table_has_one_line_per_period() {
        let rows = vec![agg(1.0, 1.0, 2.0), agg(2.0, 3.0, 4.0)];
        let txt = format_series_table(&rows);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("2020-01"));
        assert!(lines[3].ends_with("4.00"));
    }
}
