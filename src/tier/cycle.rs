use crate::tier::state::{ItemStatus, WatcherKind, WatcherState};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CycleEvent {
    pub subject: String,
    pub job_key: String,
    pub status: ItemStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub watcher: WatcherKind,
    pub scanned: usize,
    pub moved: usize,
    pub skipped: usize,
    pub errors: usize,
    pub events: Vec<CycleEvent>,
}

impl CycleOutcome {
    pub fn new(watcher: WatcherKind) -> Self {
        Self {
            watcher,
            scanned: 0,
            moved: 0,
            skipped: 0,
            errors: 0,
            events: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        state: &WatcherState,
        subject: impl Into<String>,
        job_key: impl Into<String>,
        status: ItemStatus,
        detail: impl Into<String>,
    ) {
        match status {
            ItemStatus::Moved => self.moved += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Error => self.errors += 1,
        }
        state.record(status);
        self.events.push(CycleEvent {
            subject: subject.into(),
            job_key: job_key.into(),
            status,
            detail: detail.into(),
        });
    }

    pub fn summary(&self) -> String {
        format!(
            "watcher={} scanned={} moved={} skipped={} errors={}",
            self.watcher.name(),
            self.scanned,
            self.moved,
            self.skipped,
            self.errors
        )
    }
}
