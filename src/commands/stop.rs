use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use crate::commands::CommandReport;
use crate::tier::daemon_lock::{lock_path, read_payload};
use crate::tier::paths::resolve_paths;

const STOP_TIMEOUT: Duration = Duration::from_secs(8);
const EXIT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProcessInfo {
    stat: String,
    command: String,
}

impl ProcessInfo {
    fn is_zombie(&self) -> bool {
        self.stat.starts_with('Z')
    }
}

fn parse_ps_row(row: &str) -> Option<ProcessInfo> {
    let row = row.trim();
    let (stat, command) = row.split_once(char::is_whitespace).unwrap_or((row, ""));
    if stat.is_empty() {
        return None;
    }
    Some(ProcessInfo {
        stat: stat.to_string(),
        command: command.trim().to_string(),
    })
}

fn inspect_process(pid: u32) -> Result<Option<ProcessInfo>> {
    let output = Command::new("ps")
        .args(["-o", "stat=", "-o", "command=", "-p", &pid.to_string()])
        .output()
        .with_context(|| format!("failed to run ps for pid {pid}"))?;
    if !output.status.success() {
        return Ok(None);
    }
    Ok(parse_ps_row(&String::from_utf8_lossy(&output.stdout)))
}

pub(crate) fn daemon_running(pid: u32) -> Result<bool> {
    Ok(inspect_process(pid)?.is_some_and(|process| !process.is_zombie()))
}

/// Daemon invocations are `tiersync watch` without `--once`.
fn looks_like_daemon(command_line: &str) -> bool {
    let mut words = command_line.split_whitespace();
    let binary_matches = words
        .next()
        .map(|bin| bin.rsplit('/').next().unwrap_or(bin).starts_with("tiersync"))
        .unwrap_or(false);
    let args = words.collect::<Vec<_>>();
    binary_matches && args.contains(&"watch") && !args.contains(&"--once")
}

fn request_shutdown(pid: u32) -> Result<()> {
    let status = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()
        .with_context(|| format!("failed to signal daemon pid {pid}"))?;
    if !status.success() && daemon_running(pid)? {
        anyhow::bail!("daemon pid {pid} rejected SIGTERM");
    }
    Ok(())
}

fn wait_for_exit(pid: u32) -> Result<bool> {
    let started = Instant::now();
    loop {
        if !daemon_running(pid)? {
            return Ok(true);
        }
        if started.elapsed() >= STOP_TIMEOUT {
            return Ok(false);
        }
        thread::sleep(EXIT_POLL);
    }
}

fn remove_leftover_lock(lock: &Path, report: &mut CommandReport) {
    match fs::remove_file(lock) {
        Ok(()) => report.detail(format!("removed leftover daemon lock {}", lock.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => report.detail(format!("could not remove daemon lock {}: {err}", lock.display())),
    }
}

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("stop");
    let paths = resolve_paths()?;
    let lock = lock_path(&paths);
    report.detail(format!("daemon_lock={}", lock.display()));

    if !lock.exists() {
        report.detail("watcher daemon already stopped (lock file not found)");
        return Ok(report);
    }

    let pid = match read_payload(&lock) {
        Ok(payload) => payload.pid,
        Err(err) => {
            report.issue(format!("failed to read daemon pid: {err:#}"));
            return Ok(report);
        }
    };
    report.detail(format!("daemon_pid={pid}"));

    let Some(process) = inspect_process(pid)?.filter(|process| !process.is_zombie()) else {
        report.detail(format!("daemon pid {pid} is not running"));
        remove_leftover_lock(&lock, &mut report);
        return Ok(report);
    };
    if !looks_like_daemon(&process.command) {
        report.issue(format!(
            "refusing to stop pid {pid}; it is not a tiersync watch daemon: {}",
            if process.command.is_empty() { "<unknown>" } else { process.command.as_str() }
        ));
        return Ok(report);
    }

    request_shutdown(pid)?;
    if wait_for_exit(pid)? {
        report.detail(format!("stopped watcher daemon pid={pid}"));
        remove_leftover_lock(&lock, &mut report);
    } else {
        report.issue(format!(
            "daemon pid {pid} still running after {}s",
            STOP_TIMEOUT.as_secs()
        ));
    }
    Ok(report)
}
