use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single item (file or job folder) did not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    PatternMismatch,
    ResolutionFailure,
    NotFound,
    PermissionDenied,
    LedgerUnavailable,
    Io,
}

impl FailureKind {
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PatternMismatch => "pattern-mismatch",
            Self::ResolutionFailure => "resolution-failure",
            Self::NotFound => "not-found",
            Self::PermissionDenied => "permission-denied",
            Self::LedgerUnavailable => "ledger-unavailable",
            Self::Io => "io",
        }
    }
}

/// Walk an `anyhow` chain looking for the io error that caused it.
pub fn classify_anyhow(err: &anyhow::Error) -> FailureKind {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<io::Error>())
        .map(FailureKind::classify)
        .unwrap_or(FailureKind::Io)
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("text extraction failed for {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("document {0} has no pages")]
    NoPages(PathBuf),
}

#[derive(Debug, Error)]
pub enum RevertError {
    #[error("transaction log unavailable at {path}: {reason}")]
    NoLedger { path: PathBuf, reason: String },
    #[error("no transaction entry found for {0}")]
    NoEntry(String),
    #[error("folder no longer exists at {0}")]
    SourceMissing(PathBuf),
    #[error("original directory doesn't exist: {0}")]
    DestinationUnreachable(PathBuf),
    #[error("permission denied moving {from} to {to}: {reason}")]
    PermissionDenied {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
    #[error("failed to move {from} to {to}: {reason}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
}

impl RevertError {
    /// Status column written to the revert history ledger.
    pub fn ledger_status(&self) -> String {
        let reason = match self {
            Self::NoLedger { .. } => "Revert log missing".to_string(),
            Self::NoEntry(_) => "No transaction entry".to_string(),
            Self::SourceMissing(_) => "Folder not at moved location".to_string(),
            Self::DestinationUnreachable(_) => "Original directory missing".to_string(),
            Self::PermissionDenied { reason, .. } => format!("Permission denied - {reason}"),
            Self::MoveFailed { reason, .. } => reason.clone(),
        };
        format!("FAILED: {reason}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierErrorCode {
    E001Locked,
    E002ConfigInvalid,
    E003RootMissing,
    E004LedgerUnavailable,
}

impl TierErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001Locked => "E001_LOCKED",
            Self::E002ConfigInvalid => "E002_CONFIG_INVALID",
            Self::E003RootMissing => "E003_ROOT_MISSING",
            Self::E004LedgerUnavailable => "E004_LEDGER_UNAVAILABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_operator_kinds() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let missing = io::Error::from(io::ErrorKind::NotFound);
        let other = io::Error::other("disk on fire");
        assert_eq!(FailureKind::classify(&denied), FailureKind::PermissionDenied);
        assert_eq!(FailureKind::classify(&missing), FailureKind::NotFound);
        assert_eq!(FailureKind::classify(&other), FailureKind::Io);
    }

    #[test]
    fn anyhow_chain_is_searched_for_io_cause() {
        let err = anyhow::Error::new(io::Error::from(io::ErrorKind::PermissionDenied))
            .context("failed to move a to b");
        assert_eq!(classify_anyhow(&err), FailureKind::PermissionDenied);
    }

    #[test]
    fn revert_failures_render_failed_status() {
        let err = RevertError::SourceMissing(PathBuf::from("/dest/IR00451"));
        assert_eq!(err.ledger_status(), "FAILED: Folder not at moved location");
    }

    #[test]
    fn move_failures_carry_their_reason() {
        let denied = RevertError::PermissionDenied {
            from: PathBuf::from("/dest/IR00451"),
            to: PathBuf::from("/working/IR00451"),
            reason: "access is denied".to_string(),
        };
        assert_eq!(denied.ledger_status(), "FAILED: Permission denied - access is denied");
        assert!(denied.to_string().starts_with("permission denied moving"));

        let failed = RevertError::MoveFailed {
            from: PathBuf::from("/dest/IR00451"),
            to: PathBuf::from("/working/IR00451"),
            reason: "disk full".to_string(),
        };
        assert_eq!(failed.ledger_status(), "FAILED: disk full");
    }
}
