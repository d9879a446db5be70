use anyhow::Result;

use crate::commands::CommandReport;
use crate::tier::config::load_config;
use crate::tier::paths::resolve_paths;
use crate::tier::state::WatcherKind;
use crate::tier::watcher::{self, WatcherContext};

#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub once: bool,
    /// Empty selects every watcher.
    pub only: Vec<WatcherKind>,
}

impl WatchOptions {
    fn kinds(&self) -> Vec<WatcherKind> {
        if self.only.is_empty() {
            return WatcherKind::ALL.to_vec();
        }
        let mut kinds = self.only.clone();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

pub fn run(opts: &WatchOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("watch");
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let ctx = WatcherContext::new(paths, cfg);
    let kinds = opts.kinds();

    if !opts.once {
        report.detail("starting watcher daemon");
        let snap = watcher::run_daemon(ctx, &kinds)?;
        for kind in WatcherKind::ALL {
            let c = snap.get(kind);
            report.detail(format!(
                "{}.moved={} {}.skipped={} {}.errors={}",
                kind.name(),
                c.moved,
                kind.name(),
                c.skipped,
                kind.name(),
                c.errors
            ));
        }
        report.attach(&snap);
        return Ok(report);
    }

    let mut outcomes = Vec::new();
    for (kind, result) in watcher::run_once(&ctx, &kinds) {
        match result {
            Ok(out) => {
                report.detail(out.summary());
                for event in &out.events {
                    report.detail(format!(
                        "{} {} {} {}",
                        kind.name(),
                        event.status.as_str(),
                        event.subject,
                        event.detail
                    ));
                }
                outcomes.push(out);
            }
            Err(err) => report.issue(format!("{} cycle failed: {err:#}", kind.name())),
        }
    }
    report.attach(&outcomes);
    Ok(report)
}
