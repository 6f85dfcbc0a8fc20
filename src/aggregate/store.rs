//! Monthly aggregation and series materialization.
//!
//! The store is owned by exactly one ingestion session (or one precompute run).
//! Consumers never see it directly: they receive `materialize()` snapshots.

use std::collections::BTreeMap;

use crate::domain::{PeriodAggregate, PeriodKey, PeriodRow, RawRecord};

use super::normalize::normalize;

/// Running per-period sums.
#[derive(Debug, Clone, Default)]
pub struct AggregateStore {
    by_period: BTreeMap<PeriodKey, PeriodAggregate>,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add each row's measures to its period bucket.
    ///
    /// Not idempotent: presenting the same rows twice counts them twice.
    pub fn accumulate<'a, I>(&mut self, rows: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a PeriodRow>,
    {
        for row in rows {
            let agg = self
                .by_period
                .entry(row.period_key.clone())
                .or_insert_with(|| PeriodAggregate::empty(row.period_key.clone()));
            agg.retail += row.retail;
            agg.warehouse += row.warehouse;
        }
        self
    }

    /// Normalize and accumulate a batch of raw records.
    ///
    /// Returns the number of records that contributed (unusable ones are skipped).
    pub fn ingest_records<'a, I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        let rows: Vec<PeriodRow> = records.into_iter().filter_map(normalize).collect();
        self.accumulate(&rows);
        rows.len()
    }

    /// Fresh, ascending-by-key copy of all aggregates.
    pub fn materialize(&self) -> Vec<PeriodAggregate> {
        self.by_period.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_period.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_period.is_empty()
    }

    pub fn get(&self, key: &PeriodKey) -> Option<&PeriodAggregate> {
        self.by_period.get(key)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    use super::*;
    use crate::domain::SourceRecord;

    fn row(year: f64, month: f64, retail: f64, warehouse: f64) -> PeriodRow {
        PeriodRow {
            period_key: PeriodKey::from_parts(year, month).unwrap(),
            retail,
            warehouse,
        }
    }

    fn sample_rows() -> Vec<PeriodRow> {
        vec![
            row(2023.0, 1.0, 10.0, 5.0),
            row(2023.0, 1.0, 3.0, 2.0),
            row(2023.0, 2.0, 7.0, 1.0),
        ]
    }

    #[test]
    fn materializes_sorted_sums() {
        let mut store = AggregateStore::new();
        store.accumulate(&sample_rows());

        let series = store.materialize();
        assert_eq!(
            series,
            vec![
                PeriodAggregate {
                    period_key: PeriodKey::from_parts(2023.0, 1.0).unwrap(),
                    retail: 13.0,
                    warehouse: 7.0,
                },
                PeriodAggregate {
                    period_key: PeriodKey::from_parts(2023.0, 2.0).unwrap(),
                    retail: 7.0,
                    warehouse: 1.0,
                },
            ]
        );
    }

    #[test]
    fn batching_does_not_change_result() {
        let rows = sample_rows();

        let mut single = AggregateStore::new();
        single.accumulate(&rows);

        let mut split = AggregateStore::new();
        for r in &rows {
            split.accumulate(std::slice::from_ref(r));
        }

        assert_eq!(single.materialize(), split.materialize());
    }

    #[test]
    fn accumulation_order_is_irrelevant() {
        let mut rows = Vec::new();
        for i in 0..500_i32 {
            let month = f64::from(i % 12 + 1);
            let year = f64::from(2018 + i % 5);
            rows.push(row(year, month, 0.1 * f64::from(i) + 1.37, 1e3 / f64::from(i + 1)));
        }

        let mut baseline = AggregateStore::new();
        baseline.accumulate(&rows);
        let expected = baseline.materialize();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            rows.shuffle(&mut rng);
            let mut store = AggregateStore::new();
            store.accumulate(&rows);
            let got = store.materialize();

            assert_eq!(got.len(), expected.len());
            for (a, b) in got.iter().zip(&expected) {
                assert_eq!(a.period_key, b.period_key);
                assert!((a.retail - b.retail).abs() <= 1e-6 * b.retail.abs().max(1.0));
                assert!((a.warehouse - b.warehouse).abs() <= 1e-6 * b.warehouse.abs().max(1.0));
            }
        }
    }

    #[test]
    fn repeated_rows_double_count() {
        let rows = sample_rows();
        let mut store = AggregateStore::new();
        store.accumulate(&rows).accumulate(&rows);
        let jan = store.get(&PeriodKey::from_parts(2023.0, 1.0).unwrap()).unwrap();
        assert_eq!(jan.retail, 26.0);
    }

    #[test]
    fn ingest_records_skips_unusable_rows() {
        let records = vec![
            RawRecord::Source(SourceRecord {
                year: Some("abc".into()),
                month: Some("1".into()),
                retail_sales: Some("100".into()),
                warehouse_sales: Some("100".into()),
            }),
            RawRecord::Source(SourceRecord {
                year: Some("2020".into()),
                month: Some("1".into()),
                retail_sales: Some("n/a".into()),
                warehouse_sales: Some("4".into()),
            }),
        ];

        let mut store = AggregateStore::new();
        assert_eq!(store.ingest_records(&records), 1);

        let series = store.materialize();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].period_key.as_str(), "2020-01");
        assert_eq!(series[0].retail, 0.0);
        assert_eq!(series[0].warehouse, 4.0);
    }

    #[test]
    fn empty_store_materializes_empty() {
        let store = AggregateStore::new();
        assert!(store.is_empty());
        assert!(store.materialize().is_empty());
    }
}
