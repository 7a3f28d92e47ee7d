//! Per-symbol data summary: range, price stats and backing files.

use crate::data::locator::CandidateFile;
use crate::domain::{Symbol, TimeSeriesTable};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// At most this many backing files are listed, most recent first.
pub const MAX_LISTED_FILES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

impl From<&CandidateFile> for FileInfo {
    fn from(file: &CandidateFile) -> Self {
        Self {
            name: file.file_name(),
            size_bytes: file.size,
            modified: DateTime::<Utc>::from(file.modified),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub symbol: Symbol,
    pub total_rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub latest_close: Option<f64>,
    pub min_close: Option<f64>,
    pub max_close: Option<f64>,
    pub avg_volume: Option<f64>,
    pub columns: Vec<&'static str>,
    pub content_hash: String,
    pub files: Vec<FileInfo>,
}

impl DataSummary {
    pub fn new(symbol: Symbol, table: &TimeSeriesTable, files: &[CandidateFile]) -> Self {
        let rows = table.rows();
        let closes = table.closes();
        let min_close = closes.iter().copied().reduce(f64::min);
        let max_close = closes.iter().copied().reduce(f64::max);
        let avg_volume = if rows.is_empty() {
            None
        } else {
            Some(rows.iter().map(|r| r.volume).sum::<f64>() / rows.len() as f64)
        };

        Self {
            symbol,
            total_rows: rows.len(),
            first_date: table.first_date(),
            last_date: table.last_date(),
            latest_close: closes.last().copied(),
            min_close,
            max_close,
            avg_volume,
            columns: table.columns(),
            content_hash: table.content_hash(),
            files: files.iter().take(MAX_LISTED_FILES).map(FileInfo::from).collect(),
        }
    }
}

/// Human-readable byte count (B / KB / MB / GB).
pub fn format_size(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
