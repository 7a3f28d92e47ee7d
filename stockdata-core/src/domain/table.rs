//! Time-series table: the canonical, date-keyed OHLCV output of the pipeline.

use crate::data::raw::{Cell, RawTable};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Canonical column names, in output order.
pub const CANONICAL_COLUMNS: [&str; 7] =
    ["Date", "Open", "High", "Low", "Close", "Volume", "Adj_Close"];

/// One trading-period record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
    #[serde(rename = "Adj_Close", default, skip_serializing_if = "Option::is_none")]
    pub adj_close: Option<f64>,
}

/// Date-ordered OHLCV rows for one symbol.
///
/// Dates are unique and strictly ascending, and every `close` is finite.
/// Tables are never mutated after construction; a reload builds a new one.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimeSeriesTable {
    rows: Vec<OhlcvRow>,
    has_adj_close: bool,
}

impl TimeSeriesTable {
    /// Build a table from rows in any order.
    ///
    /// Rows with a non-finite close are discarded, the rest are stably sorted
    /// by date and the first row wins on duplicate dates.
    pub fn new(rows: Vec<OhlcvRow>, has_adj_close: bool) -> Self {
        let mut rows: Vec<OhlcvRow> = rows.into_iter().filter(|r| r.close.is_finite()).collect();
        rows.sort_by_key(|r| r.date);
        rows.dedup_by_key(|r| r.date);
        Self {
            rows,
            has_adj_close,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[OhlcvRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the source carried an adjusted-close column.
    pub fn has_adj_close(&self) -> bool {
        self.has_adj_close
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    /// Column names present in this table.
    pub fn columns(&self) -> Vec<&'static str> {
        let n = if self.has_adj_close { 7 } else { 6 };
        CANONICAL_COLUMNS[..n].to_vec()
    }

    /// Convert back into a generic record set with canonical headers.
    pub fn to_raw(&self) -> RawTable {
        let headers = self.columns().into_iter().map(String::from).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut cells = vec![
                    Cell::DateTime(r.date.and_time(NaiveTime::MIN)),
                    Cell::Number(r.open),
                    Cell::Number(r.high),
                    Cell::Number(r.low),
                    Cell::Number(r.close),
                    Cell::Number(r.volume),
                ];
                if self.has_adj_close {
                    cells.push(r.adj_close.map_or(Cell::Empty, Cell::Number));
                }
                cells
            })
            .collect();
        RawTable::new(headers, rows)
    }

    /// Deterministic BLAKE3 digest over dates and every numeric field.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for row in &self.rows {
            hasher.update(row.date.to_string().as_bytes());
            hasher.update(&row.open.to_le_bytes());
            hasher.update(&row.high.to_le_bytes());
            hasher.update(&row.low.to_le_bytes());
            hasher.update(&row.close.to_le_bytes());
            hasher.update(&row.volume.to_le_bytes());
            match row.adj_close {
                Some(adj) => hasher.update(&adj.to_le_bytes()),
                None => hasher.update(b"-"),
            };
        }
        hasher.finalize().to_hex().to_string()
    }
}
