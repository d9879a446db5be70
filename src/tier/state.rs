use crate::tier::paths::TierPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherKind {
    Ingest,
    Promote,
    Reconcile,
}

impl WatcherKind {
    pub const ALL: [WatcherKind; 3] = [Self::Ingest, Self::Promote, Self::Reconcile];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Promote => "promote",
            Self::Reconcile => "reconcile",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(raw.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Moved,
    Skipped,
    Error,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Moved => "MOVED",
            Self::Skipped => "SKIPPED",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Default)]
pub struct WatcherState {
    running: AtomicBool,
    moved: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
}

impl WatcherState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn try_mark_running(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn record(&self, status: ItemStatus) {
        let counter = match status {
            ItemStatus::Moved => &self.moved,
            ItemStatus::Skipped => &self.skipped,
            ItemStatus::Error => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn counters(&self) -> WatcherCounters {
        WatcherCounters {
            running: self.is_running(),
            moved: self.moved.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherCounters {
    pub running: bool,
    pub moved: u64,
    pub skipped: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSnapshot {
    pub schema_version: u32,
    pub pid: u32,
    pub updated_at: String,
    pub ingest: WatcherCounters,
    pub promote: WatcherCounters,
    pub reconcile: WatcherCounters,
}

impl StatusSnapshot {
    pub fn get(&self, kind: WatcherKind) -> WatcherCounters {
        match kind {
            WatcherKind::Ingest => self.ingest,
            WatcherKind::Promote => self.promote,
            WatcherKind::Reconcile => self.reconcile,
        }
    }

    pub fn set(&mut self, kind: WatcherKind, counters: WatcherCounters) {
        match kind {
            WatcherKind::Ingest => self.ingest = counters,
            WatcherKind::Promote => self.promote = counters,
            WatcherKind::Reconcile => self.reconcile = counters,
        }
    }
}

pub fn status_file_path(paths: &TierPaths) -> PathBuf {
    paths.state_dir.join("watchers.json")
}

pub fn load(paths: &TierPaths) -> Result<Option<StatusSnapshot>> {
    let file = status_file_path(paths);
    if !file.exists() {
        return Ok(None);
    }

    let raw =
        fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let parsed: StatusSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    Ok(Some(parsed))
}

pub fn save(paths: &TierPaths, snapshot: &StatusSnapshot) -> Result<PathBuf> {
    let file = status_file_path(paths);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(snapshot)?;
    fs::write(&file, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", file.display()))?;
    Ok(file)
}
