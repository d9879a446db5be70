use anyhow::Result;
use serde_json::{Map, Value};

use crate::commands::CommandReport;
use crate::tier::ledger::{self, LedgerKind, row_matches};
use crate::tier::paths::resolve_paths;

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct LogsOptions {
    pub ledger: LedgerKind,
    pub search: Option<String>,
    pub limit: usize,
}

fn row_object(header: &[&str], row: &[String]) -> Value {
    let mut object = Map::new();
    for (idx, name) in header.iter().enumerate() {
        let value = row.get(idx).cloned().unwrap_or_default();
        object.insert((*name).to_string(), Value::String(value));
    }
    Value::Object(object)
}

/// Newest rows first, optionally filtered by a case-insensitive substring.
pub fn select_rows(rows: Vec<Vec<String>>, search: Option<&str>, limit: usize) -> Vec<Vec<String>> {
    rows.into_iter()
        .rev()
        .filter(|row| search.map(|needle| row_matches(row, needle)).unwrap_or(true))
        .take(limit)
        .collect()
}

pub fn run(opts: &LogsOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("logs");
    let path = opts.ledger.path(&paths);
    report.detail(format!("ledger={}", path.display()));

    let rows = match ledger::read_rows(&path) {
        Ok(rows) => rows,
        Err(err) => {
            report.issue(format!("{err:#}"));
            return Ok(report);
        }
    };
    let total = rows.len();
    let selected = select_rows(rows, opts.search.as_deref(), opts.limit);
    report.detail(format!("showing {} of {total} row(s)", selected.len()));

    let header = opts.ledger.header();
    for row in &selected {
        report.detail(row.join(" | "));
    }
    let objects = selected
        .iter()
        .map(|row| row_object(header, row))
        .collect::<Vec<_>>();
    report.attach(&objects);
    Ok(report)
}
