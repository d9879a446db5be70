use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::commands::stop::daemon_running;
use crate::tier::config::{load_config, resolve_config_path};
use crate::tier::daemon_lock::{lock_path, read_payload};
use crate::tier::paths::resolve_paths;
use crate::tier::state::{self, WatcherKind};

include!(concat!(env!("OUT_DIR"), "/tiersync_env_allowlist.rs"));

const ENV_PREFIX: &str = "TIERSYNC_";

fn unknown_env_vars() -> Vec<String> {
    let mut unknown = env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with(ENV_PREFIX))
        .filter(|key| !GENERATED_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect::<Vec<_>>();
    unknown.sort();
    unknown
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("home={}", paths.home.display()));
    for (name, path) in [
        ("working_root", &paths.working_root),
        ("inbox_dir", &paths.inbox_dir),
        ("destination_root", &paths.destination_root),
    ] {
        if path.is_dir() {
            report.detail(format!("{name}={}", path.display()));
        } else {
            report.issue(format!("{name}=missing ({})", path.display()));
        }
    }
    // Created by the first ledger write.
    if paths.ledger_dir.is_dir() {
        report.detail(format!("ledger_dir={}", paths.ledger_dir.display()));
    } else {
        report.detail(format!("ledger_dir={} (not created yet)", paths.ledger_dir.display()));
    }
    report.detail(format!("state_dir={}", paths.state_dir.display()));
    if let Some(config_path) = resolve_config_path() {
        let found = if config_path.exists() { "found" } else { "absent" };
        report.detail(format!("config_path={} ({found})", config_path.display()));
    }

    match load_config() {
        Ok(cfg) => {
            report.detail(format!(
                "intervals.ingest={}s intervals.promote={}s intervals.reconcile={}s",
                cfg.watcher.ingest_interval_secs,
                cfg.watcher.promote_interval_secs,
                cfg.watcher.reconcile_interval_secs
            ));
            report.detail(format!(
                "trigger_prefixes={}",
                cfg.promotion.trigger_prefixes.join(",")
            ));
            report.detail(format!(
                "monitored_extensions={}",
                cfg.reconcile.monitored_extensions.join(",")
            ));
            report.detail(format!("importers={}", cfg.importers.len()));
            for (key, destination) in cfg.importers.iter() {
                report.detail(format!("importer {key} -> {destination}"));
            }
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    let lock = lock_path(&paths);
    if lock.exists() {
        match read_payload(&lock) {
            Ok(payload) => {
                report.detail(format!(
                    "daemon.pid={} daemon.start_time={}",
                    payload.pid, payload.start_time
                ));
                if daemon_running(payload.pid).unwrap_or(false) {
                    report.detail("daemon.process=alive");
                } else {
                    report.issue("daemon.process=dead (stale lock)");
                }
                let current = env!("BUILD_UUID");
                if payload.build_uuid != current {
                    report.issue(format!(
                        "daemon.build_mismatch (lock={} current={current})",
                        payload.build_uuid
                    ));
                }
            }
            Err(err) => report.issue(format!("daemon.lock=corrupt ({err:#})")),
        }
    } else {
        report.detail("daemon.lock=not_found (daemon likely not running)");
    }

    match state::load(&paths) {
        Ok(Some(snap)) => {
            report.detail(format!("status.updated_at={}", snap.updated_at));
            for kind in WatcherKind::ALL {
                let c = snap.get(kind);
                report.detail(format!(
                    "{}: running={} moved={} skipped={} errors={}",
                    kind.name(),
                    c.running,
                    c.moved,
                    c.skipped,
                    c.errors
                ));
            }
            report.attach(&snap);
        }
        Ok(None) => report.detail("status=no snapshot yet"),
        Err(err) => report.issue(format!("status snapshot unreadable: {err:#}")),
    }

    for key in unknown_env_vars() {
        report.detail(format!("warning: unknown environment variable {key}"));
    }

    Ok(report)
}
