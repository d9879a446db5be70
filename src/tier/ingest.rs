use crate::error::{FailureKind, classify_anyhow};
use crate::tier::config::{TierConfig, normalize_extension};
use crate::tier::cycle::CycleOutcome;
use crate::tier::fsops::{move_path, unique_destination_path};
use crate::tier::keys::{JobKey, extract_ingest_key};
use crate::tier::ledger::{self, LedgerKind, now_timestamp};
use crate::tier::paths::TierPaths;
use crate::tier::state::{ItemStatus, WatcherKind, WatcherState};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        out.push(entry?.path());
    }
    out.sort();
    Ok(out)
}

pub fn resolve_job_folder(working_root: &Path, key: &JobKey) -> Option<PathBuf> {
    let exact = working_root.join(key.as_str());
    if exact.is_dir() {
        return Some(exact);
    }
    let children = match sorted_entries(working_root) {
        Ok(children) => children,
        Err(err) => {
            tracing::warn!("job folder search failed: {err:#}");
            return None;
        }
    };
    children.into_iter().find(|child| {
        child.is_dir()
            && child
                .file_name()
                .map(|n| key.matches_folder_name(&n.to_string_lossy()))
                .unwrap_or(false)
    })
}

fn extension_allowed(cfg: &TierConfig, path: &Path) -> bool {
    if cfg.ingest.extensions.is_empty() {
        return true;
    }
    let ext = path
        .extension()
        .map(|e| normalize_extension(&e.to_string_lossy()))
        .unwrap_or_default();
    cfg.ingest.extensions.contains(&ext)
}

fn log_row(paths: &TierPaths, filename: &str, job: &str, dest: &str, status: &str) {
    ledger::record(
        paths,
        LedgerKind::Ingest,
        &[
            now_timestamp(),
            filename.to_string(),
            job.to_string(),
            dest.to_string(),
            status.to_string(),
        ],
    );
}

pub fn run_cycle(paths: &TierPaths, cfg: &TierConfig, state: &WatcherState) -> Result<CycleOutcome> {
    let mut out = CycleOutcome::new(WatcherKind::Ingest);

    for file_path in sorted_entries(&paths.inbox_dir)? {
        if !file_path.is_file() || !extension_allowed(cfg, &file_path) {
            continue;
        }
        let Some(name) = file_path.file_name() else {
            continue;
        };
        out.scanned += 1;
        let filename = name.to_string_lossy().to_string();

        let Some(key) = extract_ingest_key(&filename) else {
            tracing::debug!(kind = FailureKind::PatternMismatch.as_str(), "no IR pattern in {filename}");
            log_row(paths, &filename, "", "", "SKIPPED: no pattern");
            out.push(state, &filename, "", ItemStatus::Skipped, "no pattern");
            continue;
        };

        let Some(job_folder) = resolve_job_folder(&paths.working_root, &key) else {
            tracing::warn!(kind = FailureKind::NotFound.as_str(), "job folder not found for {key} ({filename})");
            log_row(paths, &filename, key.as_str(), "", "ERROR: folder not found");
            out.push(state, &filename, key.as_str(), ItemStatus::Error, "folder not found");
            continue;
        };

        let dest = unique_destination_path(&job_folder.join(name));
        match move_path(&file_path, &dest) {
            Ok(()) => {
                tracing::info!("MOVED {filename} -> {}", job_folder.display());
                let dest_str = dest.display().to_string();
                log_row(paths, &filename, key.as_str(), &dest_str, "MOVED");
                out.push(state, &filename, key.as_str(), ItemStatus::Moved, dest_str);
            }
            Err(err) => {
                let kind = classify_anyhow(&err);
                let reason = format!("{err:#}");
                tracing::warn!(kind = kind.as_str(), "failed to move {filename}: {reason}");
                log_row(paths, &filename, key.as_str(), "", &format!("ERROR: {reason}"));
                out.push(state, &filename, key.as_str(), ItemStatus::Error, reason);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::fsops::name_at_limit;
    use crate::tier::paths::fixture_paths;
    use tempfile::tempdir;

    fn setup(root: &Path) -> TierPaths {
        let paths = fixture_paths(root);
        fs::create_dir_all(&paths.inbox_dir).expect("mkdir inbox");
        paths
    }

    fn ledger_rows(paths: &TierPaths) -> Vec<Vec<String>> {
        ledger::read_rows(&LedgerKind::Ingest.path(paths)).expect("ledger")
    }

    #[test]
    fn moves_document_into_exact_job_folder() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        fs::create_dir_all(paths.working_root.join("IR00451")).expect("mkdir job");
        fs::write(paths.inbox_dir.join("Invoice_IR_00451.pdf"), "pdf").expect("write");

        let state = WatcherState::default();
        let out = run_cycle(&paths, &TierConfig::default(), &state).expect("cycle");

        assert_eq!(out.moved, 1);
        assert!(paths.working_root.join("IR00451/Invoice_IR_00451.pdf").exists());
        assert!(!paths.inbox_dir.join("Invoice_IR_00451.pdf").exists());
        let rows = ledger_rows(&paths);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], "IR00451");
        assert_eq!(rows[0][4], "MOVED");
        assert_eq!(state.counters().moved, 1);
    }

    #[test]
    fn falls_back_to_folder_containing_key() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        fs::create_dir_all(paths.working_root.join("ir00451 - BMW")).expect("mkdir job");
        fs::write(paths.inbox_dir.join("bl-ir-00451.pdf"), "pdf").expect("write");

        let out = run_cycle(&paths, &TierConfig::default(), &WatcherState::default())
            .expect("cycle");
        assert_eq!(out.moved, 1);
        assert!(paths.working_root.join("ir00451 - BMW/bl-ir-00451.pdf").exists());
    }

    #[test]
    fn missing_folder_is_an_error_and_file_stays() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        fs::write(paths.inbox_dir.join("Invoice_IR_00451.pdf"), "pdf").expect("write");

        let state = WatcherState::default();
        let out = run_cycle(&paths, &TierConfig::default(), &state).expect("cycle");
        assert_eq!(out.errors, 1);
        assert_eq!(out.events[0].detail, "folder not found");
        assert!(paths.inbox_dir.join("Invoice_IR_00451.pdf").exists());
        assert_eq!(ledger_rows(&paths)[0][4], "ERROR: folder not found");
        assert_eq!(state.counters().errors, 1);
    }

    #[test]
    fn unrecognised_name_is_skipped() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        fs::write(paths.inbox_dir.join("scan_0001.pdf"), "pdf").expect("write");
        fs::create_dir_all(paths.inbox_dir.join("IR00451")).expect("dirs are ignored");

        let out = run_cycle(&paths, &TierConfig::default(), &WatcherState::default())
            .expect("cycle");
        assert_eq!(out.scanned, 1);
        assert_eq!(out.skipped, 1);
        assert_eq!(ledger_rows(&paths)[0][4], "SKIPPED: no pattern");
        assert!(paths.inbox_dir.join("scan_0001.pdf").exists());
    }

    #[test]
    fn name_collision_gets_counter_suffix() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let job = paths.working_root.join("IR00451");
        fs::create_dir_all(&job).expect("mkdir job");
        fs::write(job.join("Invoice_IR_00451.pdf"), "old").expect("write");
        fs::write(paths.inbox_dir.join("Invoice_IR_00451.pdf"), "new").expect("write");

        run_cycle(&paths, &TierConfig::default(), &WatcherState::default()).expect("cycle");
        assert_eq!(fs::read_to_string(job.join("Invoice_IR_00451.pdf")).expect("read"), "old");
        assert_eq!(fs::read_to_string(job.join("Invoice_IR_00451_1.pdf")).expect("read"), "new");
    }

    #[test]
    fn extension_filter_limits_candidates() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        fs::create_dir_all(paths.working_root.join("IR00451")).expect("mkdir job");
        fs::write(paths.inbox_dir.join("Invoice_IR_00451.tmp"), "partial").expect("write");
        let mut cfg = TierConfig::default();
        cfg.ingest.extensions = vec!["pdf".to_string()];

        let out = run_cycle(&paths, &cfg, &WatcherState::default()).expect("cycle");
        assert_eq!(out.scanned, 0);
        assert!(paths.inbox_dir.join("Invoice_IR_00451.tmp").exists());
    }

    #[test]
    fn missing_inbox_fails_the_cycle() {
        let tmp = tempdir().expect("tempdir");
        let paths = fixture_paths(tmp.path());
        assert!(run_cycle(&paths, &TierConfig::default(), &WatcherState::default()).is_err());
    }

    #[test]
    fn failed_move_is_an_error_and_file_stays() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let job = paths.working_root.join("IR00451");
        fs::create_dir_all(&job).expect("mkdir job");
        let name = name_at_limit("Invoice_IR_00451_", ".pdf");
        fs::write(job.join(&name), "old").expect("write");
        fs::write(paths.inbox_dir.join(&name), "new").expect("write");

        let state = WatcherState::default();
        let out = run_cycle(&paths, &TierConfig::default(), &state).expect("cycle");
        assert_eq!(out.errors, 1);
        assert_eq!(out.moved, 0);
        assert_eq!(fs::read_to_string(paths.inbox_dir.join(&name)).expect("read"), "new");
        assert_eq!(fs::read_to_string(job.join(&name)).expect("read"), "old");
        assert!(ledger_rows(&paths)[0][4].starts_with("ERROR: "));
        assert_eq!(state.counters().errors, 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_name_is_kept_byte_for_byte() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let job = paths.working_root.join("IR00451");
        fs::create_dir_all(&job).expect("mkdir job");
        let name = OsStr::from_bytes(b"Invoice_IR_00451_\xff.pdf");
        fs::write(paths.inbox_dir.join(name), "pdf").expect("write");

        let out = run_cycle(&paths, &TierConfig::default(), &WatcherState::default())
            .expect("cycle");
        assert_eq!(out.moved, 1);
        assert!(job.join(name).exists());
        assert!(!paths.inbox_dir.join(name).exists());
    }
}
