//! Output renderers and formatting helpers for CLI commands.

use std::collections::BTreeSet;

use anyhow::anyhow;
use roster_api_models::Record;
use roster_ui::{BulkReport, PageSnapshot, Toast};
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_page(
    page: &PageSnapshot<Record>,
    columns: &[String],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&page_json(page)),
        OutputFormat::Table => {
            println!("{}", page_table(page, columns));
            Ok(())
        }
    }
}

pub(crate) fn render_record(record: &Record, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            println!("id: {}", record.id);
            for (name, value) in &record.fields {
                println!("{name}: {}", cell_text(Some(value)));
            }
            Ok(())
        }
    }
}

pub(crate) fn render_bulk(report: &BulkReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&bulk_json(report)),
        OutputFormat::Table => {
            println!("{}", report.summary());
            for failure in &report.failed {
                println!("  {}: {}", failure.id, failure.error);
            }
            Ok(())
        }
    }
}

/// Toasts go to stderr so stdout stays parseable.
pub(crate) fn print_toasts(toasts: &[Toast]) {
    for toast in toasts {
        eprintln!("[{}] {}", toast.kind.as_str(), toast.message);
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn page_json(page: &PageSnapshot<Record>) -> Value {
    let info = &page.pagination;
    json!({
        "items": page.items,
        "pagination": {
            "total": info.total,
            "pages": info.pages,
            "current_page": info.current_page,
            "has_prev": info.has_prev,
            "has_next": info.has_next,
        },
    })
}

pub(crate) fn bulk_json(report: &BulkReport) -> Value {
    json!({
        "succeeded": report.succeeded,
        "failed": report
            .failed
            .iter()
            .map(|failure| json!({ "id": failure.id, "error": failure.error }))
            .collect::<Vec<_>>(),
    })
}

/// Aligned text table: id first, then `columns` or every field seen.
pub(crate) fn page_table(page: &PageSnapshot<Record>, columns: &[String]) -> String {
    let columns: Vec<String> = if columns.is_empty() {
        page.items
            .iter()
            .flat_map(|record| record.fields.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        columns.to_vec()
    };

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(page.items.len() + 1);
    rows.push(
        std::iter::once("ID".to_string())
            .chain(columns.iter().map(|column| column.to_ascii_uppercase()))
            .collect(),
    );
    for record in &page.items {
        rows.push(
            std::iter::once(record.id.to_string())
                .chain(columns.iter().map(|column| cell_text(record.field(column))))
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..=columns.len())
        .map(|index| {
            rows.iter()
                .map(|row| row[index].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines: Vec<String> = rows
        .iter()
        .map(|row| {
            let last = row.len() - 1;
            row.iter()
                .enumerate()
                .map(|(index, cell)| {
                    if index == last {
                        cell.clone()
                    } else {
                        format!("{cell:<width$}", width = widths[index])
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect();

    let info = &page.pagination;
    lines.push(format!(
        "page {}/{} ({} total)",
        info.current_page,
        info.pages.max(1),
        info.total
    ));
    lines.join("\n")
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_api_models::ResourceId;
    use roster_ui::{BulkItemFailure, PaginationInfo};

    fn record(id: i64, name: &str, extra: Option<(&str, Value)>) -> Record {
        let mut value = json!({ "id": id, "name": name });
        if let Some((key, field)) = extra {
            value[key] = field;
        }
        serde_json::from_value(value).expect("record")
    }

    fn page(items: Vec<Record>) -> PageSnapshot<Record> {
        PageSnapshot {
            pagination: PaginationInfo {
                total: 12,
                pages: 6,
                current_page: 2,
                has_prev: true,
                has_next: true,
            },
            items,
            generation: 1,
        }
    }

    #[test]
    fn table_aligns_columns_and_reports_position() {
        let snapshot = page(vec![
            record(1, "ann", Some(("age", json!(31)))),
            record(10, "bartholomew", None),
        ]);
        let table = page_table(&snapshot, &[]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID  AGE  NAME");
        assert_eq!(lines[1], "1   31   ann");
        assert_eq!(lines[2], "10       bartholomew");
        assert_eq!(lines[3], "page 2/6 (12 total)");
    }

    #[test]
    fn explicit_columns_limit_the_table() {
        let snapshot = page(vec![record(1, "ann", Some(("age", json!(31))))]);
        let table = page_table(&snapshot, &["name".to_string()]);
        assert_eq!(table.lines().next(), Some("ID  NAME"));
        assert_eq!(table.lines().nth(1), Some("1   ann"));
    }

    #[test]
    fn page_json_includes_pagination() {
        let value = page_json(&page(vec![record(1, "ann", None)]));
        assert_eq!(value["items"][0]["name"], "ann");
        assert_eq!(value["pagination"]["current_page"], 2);
        assert_eq!(value["pagination"]["has_next"], true);
    }

    #[test]
    fn bulk_json_lists_failures() {
        let report = BulkReport {
            succeeded: vec![ResourceId::Int(1)],
            failed: vec![BulkItemFailure {
                id: ResourceId::Int(2),
                error: "locked".into(),
            }],
            session_lost: false,
        };
        let value = bulk_json(&report);
        assert_eq!(value["succeeded"], json!([1]));
        assert_eq!(value["failed"][0], json!({ "id": 2, "error": "locked" }));
    }
}
