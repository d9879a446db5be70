use crate::error::TierErrorCode;
use crate::tier::ledger::now_timestamp;
use crate::tier::paths::TierPaths;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DAEMON_LOCK_FILE: &str = "tiersync.lock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPayload {
    pub pid: u32,
    pub build_uuid: String,
    pub start_time: String,
}

#[derive(Debug)]
pub struct DaemonLock {
    file: File,
    path: PathBuf,
}

pub fn lock_path(paths: &TierPaths) -> PathBuf {
    paths.state_dir.join(DAEMON_LOCK_FILE)
}

pub fn acquire(paths: &TierPaths) -> Result<DaemonLock> {
    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("failed to create {}", paths.state_dir.display()))?;
    let path = lock_path(paths);
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        let holder = read_payload(&path)
            .map(|p| format!("pid {}", p.pid))
            .unwrap_or_else(|_| "another process".to_string());
        anyhow::bail!(
            "{}: daemon lock {} is held by {holder}",
            TierErrorCode::E001Locked.as_str(),
            path.display()
        );
    }

    let payload = LockPayload {
        pid: std::process::id(),
        build_uuid: env!("BUILD_UUID").to_string(),
        start_time: now_timestamp(),
    };
    file.set_len(0)?;
    file.write_all(serde_json::to_string(&payload)?.as_bytes())?;
    file.flush()?;
    tracing::debug!("daemon lock acquired at {}", path.display());
    Ok(DaemonLock { file, path })
}

pub fn read_payload(path: &Path) -> Result<LockPayload> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(raw.trim())
        .with_context(|| format!("invalid daemon lock payload in {}", path.display()))
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}
