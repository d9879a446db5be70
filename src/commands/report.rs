use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::tier::paths::resolve_paths;
use crate::tier::report::{build, render};

pub fn run(out: Option<&PathBuf>) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("report");

    let summary = match build(&paths) {
        Ok(summary) => summary,
        Err(err) => {
            report.issue(format!("{err:#}"));
            return Ok(report);
        }
    };
    let text = render(&summary);

    match out {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            report.detail(format!("report written to {}", path.display()));
        }
        None => {
            for line in text.lines().filter(|l| !l.is_empty()) {
                report.detail(line);
            }
        }
    }
    report.attach(&summary);
    Ok(report)
}
