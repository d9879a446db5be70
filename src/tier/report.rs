use crate::tier::ledger;
use crate::tier::paths::TierPaths;
use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;

const ACTION_COLUMN: usize = 5;
const COMMENTS_COLUMN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRow {
    pub timestamp: String,
    pub job: String,
    pub importer: String,
    pub billing_folder: String,
    pub trigger: String,
    pub comments: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PromotionReport {
    pub generated_at: String,
    pub total: usize,
    pub moved: usize,
    pub skipped: usize,
    pub errors: usize,
    pub error_rows: Vec<ErrorRow>,
    pub skip_reasons: Vec<String>,
}

fn column(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

pub fn summarize(rows: &[Vec<String>]) -> PromotionReport {
    let mut report = PromotionReport {
        generated_at: ledger::now_timestamp(),
        total: rows.len(),
        ..PromotionReport::default()
    };

    for row in rows {
        let action = column(row, ACTION_COLUMN).trim().to_uppercase();
        if action.starts_with("MOVED") {
            report.moved += 1;
        } else if action.starts_with("SKIPPED") {
            report.skipped += 1;
            let reason = column(row, COMMENTS_COLUMN);
            if !reason.is_empty() && !report.skip_reasons.contains(&reason) {
                report.skip_reasons.push(reason);
            }
        } else if action.starts_with("ERROR") {
            report.errors += 1;
            report.error_rows.push(ErrorRow {
                timestamp: column(row, 0),
                job: column(row, 1),
                importer: column(row, 2),
                billing_folder: column(row, 3),
                trigger: column(row, 4),
                comments: column(row, COMMENTS_COLUMN),
            });
        }
    }
    report
}

pub fn build(paths: &TierPaths) -> Result<PromotionReport> {
    let rows = ledger::read_rows(&paths.promotion_log())?;
    Ok(summarize(&rows))
}

pub fn render(report: &PromotionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Job move report generated {}", report.generated_at);
    let _ = writeln!(out);
    let _ = writeln!(out, "Total rows: {}", report.total);
    let _ = writeln!(out, "Moved:      {}", report.moved);
    let _ = writeln!(out, "Skipped:    {}", report.skipped);
    let _ = writeln!(out, "Errors:     {}", report.errors);

    if !report.error_rows.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Errors:");
        for row in &report.error_rows {
            let _ = writeln!(
                out,
                "- [{}] {} | importer={} | folder={} | trigger={} | {}",
                row.timestamp, row.job, row.importer, row.billing_folder, row.trigger, row.comments
            );
        }
    }

    if !report.skip_reasons.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Skip reasons:");
        for reason in &report.skip_reasons {
            let _ = writeln!(out, "- {reason}");
        }
    }
    out
}
