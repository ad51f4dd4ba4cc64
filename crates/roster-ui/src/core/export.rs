//! CSV rendering of the visible page.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// CSV export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    /// An item could not be serialized.
    #[error("item could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    /// An item serialized to something other than a JSON object.
    #[error("item at row {row} is not a JSON object")]
    NotAnObject {
        /// Zero-based row index.
        row: usize,
    },
}

/// Render `items` as RFC 4180 CSV with CRLF line endings.
///
/// With no `columns`, the header is `id` followed by the sorted union of
/// every other field name.
///
/// # Errors
/// Fails when an item does not serialize to a JSON object.
pub fn to_csv<T: Serialize>(items: &[T], columns: &[&str]) -> Result<String, ExportError> {
    let rows = items
        .iter()
        .enumerate()
        .map(|(row, item)| match serde_json::to_value(item)? {
            Value::Object(object) => Ok(object),
            _ => Err(ExportError::NotAnObject { row }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let header: Vec<String> = if columns.is_empty() {
        default_columns(&rows)
    } else {
        columns.iter().map(|column| (*column).to_string()).collect()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        header
            .iter()
            .map(|column| escape(column))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in &rows {
        let cells: Vec<String> = header
            .iter()
            .map(|column| escape(&cell(row.get(column))))
            .collect();
        lines.push(cells.join(","));
    }
    let mut csv = lines.join("\r\n");
    csv.push_str("\r\n");
    Ok(csv)
}

fn default_columns(rows: &[Map<String, Value>]) -> Vec<String> {
    let names: BTreeSet<&String> = rows
        .iter()
        .flat_map(Map::keys)
        .filter(|name| name.as_str() != "id")
        .collect();
    std::iter::once("id".to_string())
        .chain(names.into_iter().cloned())
        .collect()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn escape(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
