use crate::tier::keys::ledger_key;
use crate::tier::ledger::{self, LedgerKind, now_timestamp};
use crate::tier::paths::TierPaths;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveTransaction {
    pub job_key: String,
    pub original_path: PathBuf,
    pub moved_path: PathBuf,
    pub timestamp: String,
}

impl MoveTransaction {
    pub fn new(job_key: impl Into<String>, original_path: &Path, moved_path: &Path) -> Self {
        Self {
            job_key: job_key.into(),
            original_path: original_path.to_path_buf(),
            moved_path: moved_path.to_path_buf(),
            timestamp: now_timestamp(),
        }
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.job_key.clone(),
            self.original_path.display().to_string(),
            self.moved_path.display().to_string(),
            self.timestamp.clone(),
        ]
    }

    fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < 3 || row[0].trim().is_empty() {
            return None;
        }
        Some(Self {
            job_key: row[0].clone(),
            original_path: PathBuf::from(&row[1]),
            moved_path: PathBuf::from(&row[2]),
            timestamp: row.get(3).cloned().unwrap_or_default(),
        })
    }

    pub fn matches_key(&self, key: &str) -> bool {
        ledger_key(&self.job_key) == ledger_key(key)
    }

    pub fn state(&self) -> TransactionState {
        if self.original_path.exists() {
            TransactionState::Reverted
        } else if self.moved_path.exists() {
            TransactionState::Pending
        } else {
            TransactionState::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Reverted,
    Pending,
    Unknown,
}

impl TransactionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reverted => "reverted",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }
}

pub fn append_transaction(paths: &TierPaths, tx: &MoveTransaction) -> Result<()> {
    ledger::append_row(paths, LedgerKind::Transactions, &tx.to_row())
}

pub fn read_transactions(paths: &TierPaths) -> Result<Vec<MoveTransaction>> {
    let rows = ledger::read_rows(&paths.transaction_log())?;
    Ok(rows
        .iter()
        .filter_map(|row| MoveTransaction::from_row(row))
        .collect())
}

/// Last appended entry for `key`; ledger order decides, not timestamps.
pub fn latest_for<'a>(txs: &'a [MoveTransaction], key: &str) -> Option<&'a MoveTransaction> {
    txs.iter().rev().find(|tx| tx.matches_key(key))
}

pub fn remove_for_keys(paths: &TierPaths, keys: &[String]) -> Result<usize> {
    let path = paths.transaction_log();
    let rows = ledger::read_rows(&path)?;
    let wanted = keys.iter().map(|k| ledger_key(k)).collect::<BTreeSet<_>>();
    let before = rows.len();
    let remaining = rows
        .into_iter()
        .filter(|row| {
            row.first()
                .map(|job| !wanted.contains(&ledger_key(job)))
                .unwrap_or(true)
        })
        .collect::<Vec<_>>();
    let removed = before - remaining.len();
    if removed > 0 {
        ledger::rewrite_rows(&path, LedgerKind::Transactions.header(), &remaining)?;
    }
    Ok(removed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevertRecord {
    pub timestamp: String,
    pub job_key: String,
    pub reverted_from: String,
    pub reverted_to: String,
    pub status: String,
}

impl RevertRecord {
    pub fn new(job_key: &str, from: &str, to: &str, status: impl Into<String>) -> Self {
        Self {
            timestamp: now_timestamp(),
            job_key: job_key.to_string(),
            reverted_from: from.to_string(),
            reverted_to: to.to_string(),
            status: status.into(),
        }
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.job_key.clone(),
            self.reverted_from.clone(),
            self.reverted_to.clone(),
            self.status.clone(),
        ]
    }
}

pub fn append_revert_record(paths: &TierPaths, record: &RevertRecord) {
    ledger::record(paths, LedgerKind::Reverts, &record.to_row());
}
