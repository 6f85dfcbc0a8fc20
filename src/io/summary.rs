//! Write the precomputed summary artifact.
//!
//! The artifact is the "portable" form of an aggregated run: a compact JSON
//! array of `{ "dateKey", "retail", "warehouse" }` objects in ascending key
//! order. It is read back by `ingest::source::load_summary`.

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::PeriodAggregate;
use crate::error::AppError;

/// Write `series` as the summary JSON, creating parent directories as needed.
pub fn write_summary_json(path: &Path, series: &[PeriodAggregate]) -> Result<(), AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;
    }

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, series)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateStore;
    use crate::domain::{PeriodKey, SourceLocation};
    use crate::ingest::source::load_summary;

    #[test]
    fn written_summary_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("summary.json");
        let series = vec![
            PeriodAggregate {
                period_key: PeriodKey::from_parts(2020.0, 1.0).unwrap(),
                retail: 1234.56,
                warehouse: 7.0,
            },
            PeriodAggregate {
                period_key: PeriodKey::from_parts(2020.0, 2.0).unwrap(),
                retail: 0.0,
                warehouse: -3.5,
            },
        ];

        write_summary_json(&path, &series).unwrap();

        let records = load_summary(&SourceLocation::Path(path)).unwrap();
        let mut store = AggregateStore::new();
        store.ingest_records(&records);
        assert_eq!(store.materialize(), series);
    }
}
