use crate::tier::paths::{self, TierPaths};
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerKind {
    Ingest,
    Promotion,
    Transactions,
    Reverts,
    Reconcile,
}

impl LedgerKind {
    pub const ALL: [LedgerKind; 5] = [
        Self::Ingest,
        Self::Promotion,
        Self::Transactions,
        Self::Reverts,
        Self::Reconcile,
    ];

    pub fn header(self) -> &'static [&'static str] {
        match self {
            Self::Ingest => &["Timestamp", "Filename", "Job No", "Destination Path", "Status"],
            Self::Promotion => &[
                "Timestamp",
                "Job No",
                "Importer",
                "Billing Folder",
                "Trigger File",
                "Action",
                "Comments",
            ],
            Self::Transactions => &["Job No", "Original Path", "Moved Path", "Timestamp"],
            Self::Reverts => &["Timestamp", "Job", "Reverted From", "Reverted To", "Status"],
            Self::Reconcile => &[
                "Timestamp",
                "Company Folder",
                "Filename",
                "Source Path",
                "Destination Path",
                "Status",
            ],
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Ingest => paths::INGEST_LOG,
            Self::Promotion => paths::PROMOTION_LOG,
            Self::Transactions => paths::TRANSACTION_LOG,
            Self::Reverts => paths::REVERT_HISTORY_LOG,
            Self::Reconcile => paths::RECONCILE_LOG,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Promotion => "promote",
            Self::Transactions => "transactions",
            Self::Reverts => "reverts",
            Self::Reconcile => "reconcile",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn path(self, paths: &TierPaths) -> PathBuf {
        paths.ledger_dir.join(self.file_name())
    }
}

pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn write_header_if_missing(path: &Path, header: &[&str]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let empty = match fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(_) => true,
    };
    if !empty {
        return Ok(());
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(header)
        .with_context(|| format!("failed to write header to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub fn ensure(paths: &TierPaths, kind: LedgerKind) -> Result<PathBuf> {
    let path = kind.path(paths);
    write_header_if_missing(&path, kind.header())?;
    Ok(path)
}

pub fn append_row(paths: &TierPaths, kind: LedgerKind, row: &[String]) -> Result<()> {
    let path = ensure(paths, kind)?;
    let file = fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(row)
        .with_context(|| format!("failed to append to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub fn record(paths: &TierPaths, kind: LedgerKind, row: &[String]) {
    if let Err(err) = append_row(paths, kind, row) {
        tracing::warn!(
            ledger = kind.name(),
            code = crate::error::TierErrorCode::E004LedgerUnavailable.as_str(),
            "ledger write failed: {err:#}"
        );
    }
}

pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    if !path.exists() {
        return Err(anyhow!("ledger not found: {}", path.display()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to parse {}", path.display()))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        out.push(record.iter().map(ToOwned::to_owned).collect());
    }
    Ok(out)
}

pub fn rewrite_rows(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("ledger path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(tmp.as_file_mut());
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    tmp.as_file_mut().flush()?;
    tmp.persist(path)
        .map_err(|err| anyhow!("failed to replace {}: {}", path.display(), err.error))?;
    Ok(())
}

pub fn row_matches(row: &[String], needle: &str) -> bool {
    let needle = needle.trim().to_uppercase();
    if needle.is_empty() {
        return true;
    }
    row.join(" ").to_uppercase().contains(&needle)
}
