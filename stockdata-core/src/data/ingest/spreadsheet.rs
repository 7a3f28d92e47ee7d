//! Workbook loader: first sheet only, first non-empty row is the header.

use crate::data::raw::{Cell, RawTable};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

pub fn load(path: &Path) -> Option<RawTable> {
    let mut workbook = match open_workbook_auto(path) {
        Ok(wb) => wb,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to open workbook");
            return None;
        }
    };

    let range = match workbook.worksheet_range_at(0)? {
        Ok(range) => range,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read first sheet");
            return None;
        }
    };

    let mut rows = range.rows();
    let header_row = rows.find(|row| row.iter().any(|c| !matches!(c, Data::Empty)))?;
    let headers: Vec<String> = header_row.iter().map(|c| c.to_string().trim().to_string()).collect();

    let body: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(to_cell).collect::<Vec<Cell>>())
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .collect();

    Some(RawTable::new(headers, body))
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt.as_datetime().map_or(Cell::Empty, Cell::DateTime),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}
