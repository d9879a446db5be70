use anyhow::Result;

use crate::commands::CommandReport;
use crate::tier::paths::resolve_paths;
use crate::tier::transactions::remove_for_keys;

/// Drops Transaction Log rows only; folders stay where they are.
pub fn run(jobs: &[String]) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("forget");

    match remove_for_keys(&paths, jobs) {
        Ok(0) => report.issue(format!("no transaction rows found for {}", jobs.join(", "))),
        Ok(removed) => report.detail(format!(
            "removed {removed} transaction row(s) from {}",
            paths.transaction_log().display()
        )),
        Err(err) => report.issue(format!("failed to update transaction log: {err:#}")),
    }
    Ok(report)
}
