//! Chunked streaming over the raw sales CSV.
//!
//! Rows are delivered in batches bounded by the number of input bytes consumed,
//! so memory stays flat no matter how large the file is. Empty lines are skipped,
//! fields are accessed by header name and values stay untyped text.

use std::io::Read;
use std::ops::ControlFlow;

use csv::{ByteRecord, StringRecord};
use tracing::{debug, warn};

use crate::domain::{
    FIELD_MONTH, FIELD_RETAIL, FIELD_WAREHOUSE, FIELD_YEAR, RawRecord, RawValue, SourceRecord,
};

use super::IngestError;

/// Counters for one pass over the CSV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub rows: usize,
    pub chunks: usize,
    pub bytes: u64,
    /// `true` when the chunk callback asked to stop early.
    pub stopped: bool,
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy, Default)]
struct Columns {
    year: Option<usize>,
    month: Option<usize>,
    retail: Option<usize>,
    warehouse: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| normalize_header_name(h) == name);
        Self {
            year: find(FIELD_YEAR),
            month: find(FIELD_MONTH),
            retail: find(FIELD_RETAIL),
            warehouse: find(FIELD_WAREHOUSE),
        }
    }

    fn missing(&self) -> Vec<&'static str> {
        [
            (self.year, FIELD_YEAR),
            (self.month, FIELD_MONTH),
            (self.retail, FIELD_RETAIL),
            (self.warehouse, FIELD_WAREHOUSE),
        ]
        .into_iter()
        .filter_map(|(idx, name)| idx.is_none().then_some(name))
        .collect()
    }

    fn record(&self, row: &ByteRecord) -> RawRecord {
        let field = |idx: Option<usize>| {
            let raw = row.get(idx?)?;
            Some(RawValue::Text(String::from_utf8_lossy(raw).into_owned()))
        };
        RawRecord::Source(SourceRecord {
            year: field(self.year),
            month: field(self.month),
            retail_sales: field(self.retail),
            warehouse_sales: field(self.warehouse),
        })
    }
}

fn normalize_header_name(name: &str) -> &str {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, `YEAR` would never match.
    name.trim().trim_start_matches('\u{feff}')
}

/// Required columns absent from the header row of `reader`.
///
/// Only the header line is read.
pub fn missing_columns<R: Read>(reader: R) -> Result<Vec<&'static str>, IngestError> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv.headers()?;
    Ok(Columns::from_headers(headers).missing())
}

/// Stream `reader` as CSV, handing rows to `on_chunk` in batches of roughly
/// `chunk_bytes` input bytes. The trailing partial batch is always delivered.
///
/// Returning `ControlFlow::Break` from `on_chunk` stops reading.
pub fn for_each_chunk<R, F>(reader: R, chunk_bytes: usize, mut on_chunk: F) -> Result<StreamStats, IngestError>
where
    R: Read,
    F: FnMut(Vec<RawRecord>) -> ControlFlow<()>,
{
    let chunk_bytes = chunk_bytes.max(1) as u64;
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv.headers()?.clone();
    let columns = Columns::from_headers(&headers);
    let missing = columns.missing();
    if !missing.is_empty() {
        warn!(?missing, "raw CSV is missing expected columns");
    }

    let mut stats = StreamStats::default();
    let mut chunk = Vec::new();
    let mut chunk_start = csv.position().byte();
    let mut row = ByteRecord::new();

    while csv.read_byte_record(&mut row)? {
        chunk.push(columns.record(&row));
        stats.rows += 1;

        let pos = csv.position().byte();
        if pos.saturating_sub(chunk_start) >= chunk_bytes {
            stats.chunks += 1;
            stats.bytes = pos;
            chunk_start = pos;
            if on_chunk(std::mem::take(&mut chunk)).is_break() {
                stats.stopped = true;
                return Ok(stats);
            }
        }
    }

    stats.bytes = csv.position().byte();
    if !chunk.is_empty() {
        stats.chunks += 1;
        if on_chunk(chunk).is_break() {
            stats.stopped = true;
        }
    }

    debug!(rows = stats.rows, chunks = stats.chunks, bytes = stats.bytes, "CSV stream finished");
    Ok(stats)
}
