use anyhow::Result;

use crate::commands::CommandReport;
use crate::tier::paths::resolve_paths;
use crate::tier::undo::revert_outcome;

pub fn run(jobs: &[String]) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("revert");
    let mut outcomes = Vec::new();

    for job in jobs {
        let outcome = revert_outcome(&paths, job);
        let mut item = CommandReport::new("revert");
        if outcome.is_success() {
            item.detail(format!("{job}: {}", outcome.message()));
        } else {
            item.issue(format!("{job}: {}", outcome.message()));
        }
        report.merge(item);
        outcomes.push(outcome);
    }

    report.attach(&outcomes);
    Ok(report)
}
