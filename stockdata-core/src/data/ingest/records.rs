//! JSON loader: a top-level array of objects, or a single object as one row.

use crate::data::raw::{Cell, RawTable};
use serde_json::{Map, Value};
use std::path::Path;

pub fn load(path: &Path) -> Option<RawTable> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read json file");
            return None;
        }
    };
    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => records_to_table(value),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "json parse failed");
            None
        }
    }
}

/// Flatten a JSON value into rows. Headers are the union of object keys in
/// first-seen order; non-object array items are skipped.
pub fn records_to_table(value: Value) -> Option<RawTable> {
    let objects: Vec<Map<String, Value>> = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        Value::Object(map) => vec![map],
        _ => return None,
    };
    if objects.is_empty() {
        return None;
    }

    let mut headers: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = objects
        .iter()
        .map(|object| {
            headers
                .iter()
                .map(|h| object.get(h).map_or(Cell::Empty, json_cell))
                .collect()
        })
        .collect();

    Some(RawTable::new(headers, rows))
}

fn json_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => n.as_f64().map_or(Cell::Empty, Cell::Number),
        Value::String(s) => Cell::text(s),
        nested @ (Value::Array(_) | Value::Object(_)) => Cell::Text(nested.to_string()),
    }
}
