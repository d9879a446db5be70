use crate::error::{FailureKind, RevertError, classify_anyhow};
use crate::tier::fsops::{move_path, timestamped_destination_path};
use crate::tier::keys::ledger_key;
use crate::tier::paths::TierPaths;
use crate::tier::transactions::{RevertRecord, append_revert_record, latest_for, read_transactions};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RevertOutcome {
    Reverted { job: String, path: PathBuf },
    Failed { job: String, message: String },
}

impl RevertOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Self::Reverted { path, .. } => format!("Reverted successfully to {}", path.display()),
            Self::Failed { message, .. } => message.clone(),
        }
    }
}

fn fail(paths: &TierPaths, job: &str, from: &str, to: &str, err: RevertError) -> RevertError {
    tracing::warn!("revert of {job} failed: {err}");
    append_revert_record(paths, &RevertRecord::new(job, from, to, err.ledger_status()));
    err
}

/// Move the job folder back to where the latest promotion found it. Exactly
/// one revert history row is appended per call; the Transaction Log itself
/// is only read.
pub fn revert(paths: &TierPaths, job: &str) -> Result<PathBuf, RevertError> {
    let key = ledger_key(job);

    let txs = match read_transactions(paths) {
        Ok(txs) => txs,
        Err(err) => {
            let err = RevertError::NoLedger {
                path: paths.transaction_log(),
                reason: format!("{err:#}"),
            };
            return Err(fail(paths, &key, "", "", err));
        }
    };

    let Some(tx) = latest_for(&txs, &key) else {
        return Err(fail(paths, &key, "", "", RevertError::NoEntry(key.clone())));
    };
    let from = tx.moved_path.clone();
    let original = tx.original_path.clone();
    let from_str = from.display().to_string();
    let original_str = original.display().to_string();

    if !from.exists() {
        let err = RevertError::SourceMissing(from.clone());
        return Err(fail(paths, &key, &from_str, &original_str, err));
    }

    let parent_ok = original.parent().map(|p| p.is_dir()).unwrap_or(false);
    if !parent_ok {
        let err = RevertError::DestinationUnreachable(original.clone());
        return Err(fail(paths, &key, &from_str, &original_str, err));
    }

    let target = timestamped_destination_path(&original);
    let target_str = target.display().to_string();
    if let Err(err) = move_path(&from, &target) {
        let reason = format!("{err:#}");
        let err = match classify_anyhow(&err) {
            FailureKind::PermissionDenied => RevertError::PermissionDenied {
                from: from.clone(),
                to: target.clone(),
                reason,
            },
            _ => RevertError::MoveFailed {
                from: from.clone(),
                to: target.clone(),
                reason,
            },
        };
        return Err(fail(paths, &key, &from_str, &target_str, err));
    }

    tracing::info!("reverted {key}: {from_str} -> {target_str}");
    append_revert_record(paths, &RevertRecord::new(&key, &from_str, &target_str, "SUCCESS"));
    Ok(target)
}

pub fn revert_outcome(paths: &TierPaths, job: &str) -> RevertOutcome {
    let key = ledger_key(job);
    match revert(paths, job) {
        Ok(path) => RevertOutcome::Reverted { job: key, path },
        Err(err) => RevertOutcome::Failed {
            job: key,
            message: err.to_string(),
        },
    }
}
