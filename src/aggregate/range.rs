//! Range selection over a materialized (ascending) series.

use chrono::{Datelike, Local};

use crate::domain::{PeriodAggregate, RangeKind};

/// Number of trailing periods kept by `RangeKind::SixMonths`.
const TRAILING_PERIODS: usize = 6;

/// Select the sub-series for `range`. Pure: `current_year` is supplied by the caller.
pub fn select(series: &[PeriodAggregate], range: RangeKind, current_year: i32) -> Vec<PeriodAggregate> {
    let Some(last) = series.last() else {
        return Vec::new();
    };

    match range {
        RangeKind::All => series.to_vec(),
        RangeKind::Month => series
            .iter()
            .filter(|p| p.period_key == last.period_key)
            .cloned()
            .collect(),
        RangeKind::SixMonths => {
            let start = series.len().saturating_sub(TRAILING_PERIODS);
            series[start..].to_vec()
        }
        RangeKind::Year => {
            let Some(year) = target_year(series, current_year) else {
                return Vec::new();
            };
            series
                .iter()
                .filter(|p| p.period_key.year() == Some(year))
                .cloned()
                .collect()
        }
    }
}

/// `select` against the local calendar year.
pub fn select_now(series: &[PeriodAggregate], range: RangeKind) -> Vec<PeriodAggregate> {
    select(series, range, Local::now().year())
}

// Current year when present in the series, otherwise the latest year present.
fn target_year(series: &[PeriodAggregate], current_year: i32) -> Option<i32> {
    let mut years = series.iter().filter_map(|p| p.period_key.year()).peekable();
    years.peek()?;
    let mut max_year = i32::MIN;
    for y in years {
        if y == current_year {
            return Some(current_year);
        }
        max_year = max_year.max(y);
    }
    Some(max_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeriodKey;

    fn series(keys: &[(i32, u32)]) -> Vec<PeriodAggregate> {
        keys.iter()
            .enumerate()
            .map(|(i, &(y, m))| PeriodAggregate {
                period_key: PeriodKey::from_parts(f64::from(y), f64::from(m)).unwrap(),
                retail: i as f64,
                warehouse: 2.0 * i as f64,
            })
            .collect()
    }

    fn span(from_year: i32, to_year: i32) -> Vec<PeriodAggregate> {
        let mut keys = Vec::new();
        for y in from_year..=to_year {
            for m in 1..=12 {
                keys.push((y, m));
            }
        }
        series(&keys)
    }

    #[test]
    fn empty_series_is_empty_for_every_range() {
        for r in RangeKind::ALL {
            assert!(select(&[], r, 2024).is_empty());
        }
    }

    #[test]
    fn all_returns_input() {
        let s = span(2020, 2021);
        assert_eq!(select(&s, RangeKind::All, 2024), s);
    }

    #[test]
    fn month_returns_latest_only() {
        let s = span(2020, 2021);
        let got = select(&s, RangeKind::Month, 2024);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].period_key.as_str(), "2021-12");
    }

    #[test]
    fn six_months_returns_trailing_entries() {
        let s = span(2020, 2020);
        let got = select(&s, RangeKind::SixMonths, 2024);
        assert_eq!(got, s[6..].to_vec());

        let short = series(&[(2020, 1), (2020, 2), (2020, 3)]);
        assert_eq!(select(&short, RangeKind::SixMonths, 2024), short);

        for n in 0..10 {
            let s = series(&(1..=n).map(|m| (2020, m)).collect::<Vec<_>>());
            assert_eq!(select(&s, RangeKind::SixMonths, 2024).len(), (n as usize).min(6));
        }
    }

    #[test]
    fn year_falls_back_to_latest_year() {
        let s = span(2021, 2024);
        let got = select(&s, RangeKind::Year, 2030);
        assert_eq!(got.len(), 12);
        assert!(got.iter().all(|p| p.period_key.year() == Some(2024)));
    }

    #[test]
    fn year_prefers_current_year_when_present() {
        let s = span(2021, 2024);
        let got = select(&s, RangeKind::Year, 2022);
        assert_eq!(got.len(), 12);
        assert_eq!(got[0].period_key.as_str(), "2022-01");
        assert_eq!(got[11].period_key.as_str(), "2022-12");
    }

    #[test]
    fn select_now_matches_explicit_year() {
        let s = span(2001, 2002);
        assert_eq!(select_now(&s, RangeKind::Year), select(&s, RangeKind::Year, Local::now().year()));
    }
}
