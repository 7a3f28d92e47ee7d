//! Parquet loader built on polars.

use crate::data::raw::{Cell, RawTable};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::fs;
use std::path::Path;

pub fn load(path: &Path) -> Option<RawTable> {
    let file = fs::File::open(path).ok()?;
    let df = match ParquetReader::new(file).finish() {
        Ok(df) => df,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read parquet");
            return None;
        }
    };
    match dataframe_to_raw(&df) {
        Ok(table) => Some(table),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unsupported parquet columns");
            None
        }
    }
}

/// Convert a DataFrame into the generic record set.
///
/// Numeric columns become numbers, date/datetime columns become timestamps,
/// everything else is rendered as text.
pub fn dataframe_to_raw(df: &DataFrame) -> PolarsResult<RawTable> {
    let mut headers = Vec::with_capacity(df.width());
    let mut columns: Vec<Vec<Cell>> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        headers.push(column.name().to_string());
        columns.push(column_cells(column)?);
    }

    let rows = (0..df.height())
        .map(|i| columns.iter().map(|c| c[i].clone()).collect())
        .collect();
    Ok(RawTable::new(headers, rows))
}

fn column_cells(column: &Column) -> PolarsResult<Vec<Cell>> {
    match column.dtype() {
        DataType::Date => date_cells(column),
        DataType::Datetime(_, _) => date_cells(&column.cast(&DataType::Date)?),
        DataType::Float32
        | DataType::Float64
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let casted = column.cast(&DataType::Float64)?;
            Ok(casted
                .f64()?
                .iter()
                .map(|v| v.map_or(Cell::Empty, Cell::Number))
                .collect())
        }
        _ => {
            let casted = column.cast(&DataType::String)?;
            Ok(casted
                .str()?
                .iter()
                .map(|v| v.map_or(Cell::Empty, Cell::text))
                .collect())
        }
    }
}

fn date_cells(column: &Column) -> PolarsResult<Vec<Cell>> {
    let ca = column.date()?;
    Ok((0..column.len())
        .map(|i| {
            ca.get(i)
                .and_then(days_since_epoch)
                .map_or(Cell::Empty, Cell::DateTime)
        })
        .collect())
}

fn days_since_epoch(days: i32) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    let date = epoch.checked_add_signed(Duration::days(days as i64))?;
    Some(date.and_time(NaiveTime::MIN))
}
