//! Consumer-side view of an ingestion session.
//!
//! This is what the presentation layer reads: the latest snapshot plus
//! `loading` / `error` flags, and range queries over the snapshot.

use crate::aggregate::select_now;
use crate::domain::{PeriodAggregate, PeriodKey, RangeKind};

use super::{IngestError, IngestEvent, IngestObserver};

#[derive(Debug, Clone)]
pub struct IngestState {
    series: Vec<PeriodAggregate>,
    loading: bool,
    error: Option<String>,
}

impl Default for IngestState {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestState {
    pub fn new() -> Self {
        Self {
            series: Vec::new(),
            loading: true,
            error: None,
        }
    }

    pub fn apply(&mut self, event: IngestEvent) {
        match event {
            IngestEvent::Snapshot(series) => self.on_snapshot(series),
            IngestEvent::Done => self.on_done(),
            IngestEvent::Failed(err) => self.on_error(err),
        }
    }

    pub fn series(&self) -> &[PeriodAggregate] {
        &self.series
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn latest_month_key(&self) -> Option<&PeriodKey> {
        self.series.last().map(|p| &p.period_key)
    }

    /// Range query against the current snapshot (local calendar year).
    pub fn filtered(&self, range: RangeKind) -> Vec<PeriodAggregate> {
        select_now(&self.series, range)
    }
}

impl IngestObserver for IngestState {
    fn on_snapshot(&mut self, series: Vec<PeriodAggregate>) {
        self.series = series;
    }

    fn on_done(&mut self) {
        self.loading = false;
    }

    fn on_error(&mut self, err: IngestError) {
        self.error = Some(err.to_string());
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg(year: f64, month: f64) -> PeriodAggregate {
        PeriodAggregate::empty(PeriodKey::from_parts(year, month).unwrap())
    }

    #[test]
    fn starts_loading_and_empty() {
        let state = IngestState::new();
        assert!(state.loading());
        assert!(state.error().is_none());
        assert!(state.latest_month_key().is_none());
        for r in RangeKind::ALL {
            assert!(state.filtered(r).is_empty());
        }
    }

    #[test]
    fn snapshots_replace_series_until_done() {
        let mut state = IngestState::new();
        state.apply(IngestEvent::Snapshot(vec![agg(2020.0, 1.0)]));
        assert!(state.loading());
        state.apply(IngestEvent::Snapshot(vec![agg(2020.0, 1.0), agg(2020.0, 2.0)]));
        state.apply(IngestEvent::Done);

        assert!(!state.loading());
        assert_eq!(state.series().len(), 2);
        assert_eq!(state.latest_month_key().unwrap().as_str(), "2020-02");
        assert_eq!(state.filtered(RangeKind::Month).len(), 1);
    }

    #[test]
    fn failure_clears_loading_and_sets_error() {
        let mut state = IngestState::new();
        state.apply(IngestEvent::Failed(IngestError::EmptySummary));
        assert!(!state.loading());
        assert_eq!(state.error(), Some("summary contains no usable rows"));
    }
}
