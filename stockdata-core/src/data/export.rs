//! Write a normalized table back out as CSV, JSON, Parquet or an xlsx workbook.

use crate::domain::{Symbol, TimeSeriesTable, CANONICAL_COLUMNS};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, XlsxError};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Parquet,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Parquet => "parquet",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "parquet" | "pq" => Ok(ExportFormat::Parquet),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(format!(
                "unknown export format '{other}' (csv, json, parquet, xlsx)"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv write: {0}")]
    Csv(#[from] csv::Error),

    #[error("json write: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parquet write: {0}")]
    Parquet(#[from] PolarsError),

    #[error("xlsx write: {0}")]
    Xlsx(#[from] XlsxError),
}

/// `<SYMBOL>_export.<ext>` inside `dir`.
pub fn default_export_path(dir: &Path, symbol: &Symbol, format: ExportFormat) -> PathBuf {
    dir.join(format!("{symbol}_export.{}", format.extension()))
}

/// Write `table` to `path`. Dates are ISO `YYYY-MM-DD` in the text formats.
pub fn export_table(
    table: &TimeSeriesTable,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => write_csv(table, create(path)?)?,
        ExportFormat::Json => serde_json::to_writer_pretty(create(path)?, table.rows())?,
        ExportFormat::Parquet => {
            let mut df = table_to_dataframe(table)?;
            ParquetWriter::new(create(path)?).finish(&mut df)?;
        }
        ExportFormat::Xlsx => write_xlsx(table, path)?,
    }

    tracing::info!(path = %path.display(), rows = table.len(), ?format, "exported table");
    Ok(())
}

fn create(path: &Path) -> Result<fs::File, ExportError> {
    fs::File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })
}

fn write_csv(table: &TimeSeriesTable, file: fs::File) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);
    let width = table.columns().len();
    wtr.write_record(&CANONICAL_COLUMNS[..width])?;

    for r in table.rows() {
        let mut record = vec![
            r.date.to_string(),
            r.open.to_string(),
            r.high.to_string(),
            r.low.to_string(),
            r.close.to_string(),
            r.volume.to_string(),
        ];
        if table.has_adj_close() {
            record.push(r.adj_close.map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Single "Prices" sheet: canonical header row, date-formatted Date cells,
/// blank Adj_Close cells where the value is missing.
fn write_xlsx(table: &TimeSeriesTable, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Prices")?;
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let width = table.columns().len();
    for (col, name) in CANONICAL_COLUMNS[..width].iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }

    for (i, r) in table.rows().iter().enumerate() {
        let row = i as u32 + 1;
        let date = ExcelDateTime::from_ymd(
            r.date.year() as u16,
            r.date.month() as u8,
            r.date.day() as u8,
        )?;
        sheet.write_datetime_with_format(row, 0, &date, &date_format)?;
        for (col, value) in [r.open, r.high, r.low, r.close, r.volume].into_iter().enumerate() {
            sheet.write_number(row, col as u16 + 1, value)?;
        }
        if let Some(adj) = r.adj_close {
            sheet.write_number(row, 6, adj)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Canonical table as a polars DataFrame with a `Date`-typed first column.
pub fn table_to_dataframe(table: &TimeSeriesTable) -> PolarsResult<DataFrame> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let rows = table.rows();
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();

    let mut columns = vec![
        Column::new("Date".into(), dates).cast(&DataType::Date)?,
        Column::new("Open".into(), rows.iter().map(|r| r.open).collect::<Vec<f64>>()),
        Column::new("High".into(), rows.iter().map(|r| r.high).collect::<Vec<f64>>()),
        Column::new("Low".into(), rows.iter().map(|r| r.low).collect::<Vec<f64>>()),
        Column::new("Close".into(), rows.iter().map(|r| r.close).collect::<Vec<f64>>()),
        Column::new("Volume".into(), rows.iter().map(|r| r.volume).collect::<Vec<f64>>()),
    ];
    if table.has_adj_close() {
        let adj: Vec<Option<f64>> = rows.iter().map(|r| r.adj_close).collect();
        columns.push(Column::new("Adj_Close".into(), adj));
    }
    DataFrame::new(columns)
}
