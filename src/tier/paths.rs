use anyhow::Result;
use std::env;
use std::path::PathBuf;

pub const INGEST_LOG: &str = "ooc_upload_log.csv";
pub const PROMOTION_LOG: &str = "job_move_log.csv";
pub const TRANSACTION_LOG: &str = "revert_log.csv";
pub const REVERT_HISTORY_LOG: &str = "revert_history_log.csv";
pub const RECONCILE_LOG: &str = "loose_file_log.csv";

#[derive(Debug, Clone)]
pub struct TierPaths {
    pub home: PathBuf,
    pub working_root: PathBuf,
    pub inbox_dir: PathBuf,
    pub destination_root: PathBuf,
    pub ledger_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl TierPaths {
    pub fn promotion_log(&self) -> PathBuf {
        self.ledger_dir.join(PROMOTION_LOG)
    }

    pub fn transaction_log(&self) -> PathBuf {
        self.ledger_dir.join(TRANSACTION_LOG)
    }

    pub fn reconcile_log(&self) -> PathBuf {
        self.ledger_dir.join(RECONCILE_LOG)
    }
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<TierPaths> {
    let home = match env::var("TIERSYNC_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join("tiersync"),
    };

    let working_root = env_or_default_path("TIERSYNC_WORKING_ROOT", home.join("working"));
    let inbox_dir = env_or_default_path("TIERSYNC_INBOX_DIR", working_root.join("Upload_ooc"));
    let destination_root =
        env_or_default_path("TIERSYNC_DESTINATION_ROOT", home.join("destination"));
    let ledger_dir = env_or_default_path(
        "TIERSYNC_LEDGER_DIR",
        destination_root.join("Automation Logs"),
    );
    let state_dir = env_or_default_path("TIERSYNC_STATE_DIR", ledger_dir.join("state"));

    Ok(TierPaths {
        home,
        working_root,
        inbox_dir,
        destination_root,
        ledger_dir,
        state_dir,
    })
}

#[cfg(test)]
pub(crate) fn fixture_paths(root: &std::path::Path) -> TierPaths {
    let working_root = root.join("working");
    let destination_root = root.join("destination");
    let ledger_dir = destination_root.join("Automation Logs");
    TierPaths {
        home: root.to_path_buf(),
        inbox_dir: working_root.join("Upload_ooc"),
        state_dir: ledger_dir.join("state"),
        working_root,
        destination_root,
        ledger_dir,
    }
}
