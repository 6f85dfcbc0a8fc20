//! Opening inputs (local files or HTTP URLs) and loading the summary artifact.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::domain::{RawRecord, RawValue, SourceLocation};

use super::IngestError;

/// Open a byte stream for `location`.
///
/// No timeout is applied to URL fetches; network failures surface as errors.
pub fn open(location: &SourceLocation) -> Result<Box<dyn Read + Send>, IngestError> {
    match location {
        SourceLocation::Path(path) => {
            let file = File::open(path).map_err(|source| IngestError::Open {
                path: path.clone(),
                source,
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        SourceLocation::Url(url) => {
            debug!(%url, "fetching");
            let resp = Client::new().get(url).send().map_err(|source| IngestError::Request {
                url: url.clone(),
                source,
            })?;
            if !resp.status().is_success() {
                return Err(IngestError::Status {
                    url: url.clone(),
                    status: resp.status(),
                });
            }
            Ok(Box::new(resp))
        }
    }
}

/// Load the precomputed summary as raw records.
pub fn load_summary(location: &SourceLocation) -> Result<Vec<RawRecord>, IngestError> {
    parse_summary(open(location)?)
}

/// Parse a summary artifact: a JSON array of objects.
///
/// Non-object elements and non-scalar fields are ignored; an empty array is an error.
pub fn parse_summary<R: Read>(reader: R) -> Result<Vec<RawRecord>, IngestError> {
    let items: Vec<Value> = serde_json::from_reader(reader)?;
    if items.is_empty() {
        return Err(IngestError::EmptySummary);
    }

    let records = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(RawRecord::from_fields(
                map.into_iter()
                    .filter_map(|(k, v)| to_raw_value(v).map(|v| (k, v)))
                    .collect::<HashMap<_, _>>(),
            )),
            _ => None,
        })
        .collect();

    Ok(records)
}

fn to_raw_value(value: Value) -> Option<RawValue> {
    match value {
        Value::Number(n) => n.as_f64().map(RawValue::Number),
        Value::String(s) => Some(RawValue::Text(s)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateStore;

    #[test]
    fn parses_summary_rows() {
        let json = r#"[
            {"dateKey": "2020-01", "retail": 10.5, "warehouse": 2},
            {"dateKey": "2020-02", "retail": "3", "warehouse": null},
            42
        ]"#;
        let records = parse_summary(json.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let mut store = AggregateStore::new();
        store.ingest_records(&records);
        let series = store.materialize();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].retail, 10.5);
        assert_eq!(series[1].retail, 3.0);
        assert_eq!(series[1].warehouse, 0.0);
    }

    #[test]
    fn rejects_empty_and_malformed_summaries() {
        assert!(matches!(parse_summary("[]".as_bytes()), Err(IngestError::EmptySummary)));
        assert!(matches!(parse_summary("{\"a\":1}".as_bytes()), Err(IngestError::Json(_))));
        assert!(matches!(parse_summary("not json".as_bytes()), Err(IngestError::Json(_))));
    }

    #[test]
    fn missing_file_is_open_error() {
        let loc = SourceLocation::parse("/definitely/not/here/summary.json");
        assert!(matches!(load_summary(&loc), Err(IngestError::Open { .. })));
    }
}
