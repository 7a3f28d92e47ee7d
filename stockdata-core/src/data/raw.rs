//! Generic tabular record set produced by the format loaders.
//!
//! This is the boundary type: anything that can hand over a header row plus
//! loosely-typed cells (a file loader, a remote market-data client) feeds the
//! canonicalizer through it.

use chrono::NaiveDateTime;

/// A single loosely-typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Build a text cell, mapping blank strings to `Empty`.
    pub fn text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// Header row plus data rows. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Build a table, padding short rows with `Cell::Empty` and truncating long ones.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }
}
