use crate::error::{FailureKind, classify_anyhow};
use crate::tier::config::TierConfig;
use crate::tier::cycle::CycleOutcome;
use crate::tier::extract::{TextExtractor, extract_upper};
use crate::tier::fsops::{file_name_string, move_path, timestamped_destination_path};
use crate::tier::keys::{is_trigger_document, ledger_key};
use crate::tier::ledger::{self, LedgerKind, now_timestamp};
use crate::tier::paths::TierPaths;
use crate::tier::state::{ItemStatus, WatcherKind, WatcherState};
use crate::tier::transactions::{MoveTransaction, append_transaction};
use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub fn find_trigger_documents(paths: &TierPaths, cfg: &TierConfig) -> Result<Vec<PathBuf>> {
    let root = Pattern::escape(&paths.working_root.to_string_lossy());
    let mut found = BTreeSet::new();

    for prefix in &cfg.promotion.trigger_prefixes {
        for ext in &cfg.promotion.trigger_extensions {
            let pattern = format!("{root}/*/{}*.{}", Pattern::escape(prefix), Pattern::escape(ext));
            let entries = glob::glob_with(&pattern, MATCH_OPTIONS)
                .with_context(|| format!("invalid trigger pattern {pattern}"))?;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        found.insert(path);
                    }
                    Err(err) => tracing::debug!("trigger search skipped an entry: {err}"),
                }
            }
        }
    }

    Ok(found
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| is_trigger_document(&file_name_string(path), &cfg.promotion.trigger_prefixes))
        .collect())
}

fn log_row(
    paths: &TierPaths,
    job: &str,
    importer: &str,
    billing_folder: &str,
    trigger: &str,
    action: ItemStatus,
    comments: &str,
) {
    ledger::record(
        paths,
        LedgerKind::Promotion,
        &[
            now_timestamp(),
            job.to_string(),
            importer.to_string(),
            billing_folder.to_string(),
            trigger.to_string(),
            action.as_str().to_string(),
            comments.to_string(),
        ],
    );
}

fn is_inbox(paths: &TierPaths, job_path: &Path) -> bool {
    if job_path == paths.inbox_dir {
        return true;
    }
    match (job_path.file_name(), paths.inbox_dir.file_name()) {
        (Some(job), Some(inbox)) => {
            job_path.parent() == paths.inbox_dir.parent()
                && job.to_string_lossy().eq_ignore_ascii_case(&inbox.to_string_lossy())
        }
        _ => false,
    }
}

pub fn promote_folder(paths: &TierPaths, job_path: &Path, dest_parent: &Path) -> Result<PathBuf> {
    let name = job_path
        .file_name()
        .with_context(|| format!("job folder has no name: {}", job_path.display()))?;
    let job = name.to_string_lossy().to_string();
    let dest = timestamped_destination_path(&dest_parent.join(name));
    move_path(job_path, &dest)?;

    let tx = MoveTransaction::new(ledger_key(&job), job_path, &dest);
    if let Err(err) = append_transaction(paths, &tx) {
        tracing::error!(
            kind = FailureKind::LedgerUnavailable.as_str(),
            "{job} moved to {} but the transaction log write failed; revert will not find it: {err:#}",
            dest.display()
        );
    }
    Ok(dest)
}

fn process_trigger(
    paths: &TierPaths,
    cfg: &TierConfig,
    extractor: &dyn TextExtractor,
    state: &WatcherState,
    trigger_path: &Path,
    out: &mut CycleOutcome,
) {
    let Some(job_path) = trigger_path.parent() else {
        return;
    };
    if !job_path.is_dir() || is_inbox(paths, job_path) {
        return;
    }
    out.scanned += 1;
    let job = file_name_string(job_path);
    let trigger = file_name_string(trigger_path);
    let key = ledger_key(&job);
    tracing::debug!("trigger {trigger} found in {job}");

    let Some(text) = extract_upper(extractor, trigger_path) else {
        let reason = "Could not extract text from PDF";
        tracing::warn!(kind = FailureKind::ResolutionFailure.as_str(), "SKIPPED {job}: {reason}");
        log_row(paths, &job, "", "", &trigger, ItemStatus::Skipped, reason);
        out.push(state, &job, &key, ItemStatus::Skipped, reason);
        return;
    };

    let Some(importer) = cfg.importers.find_importer_key(&text) else {
        let reason = "No matching importer found in PDF";
        tracing::warn!(kind = FailureKind::ResolutionFailure.as_str(), "SKIPPED {job}: {reason}");
        log_row(paths, &job, "", "", &trigger, ItemStatus::Skipped, reason);
        out.push(state, &job, &key, ItemStatus::Skipped, reason);
        return;
    };

    let Some(billing_folder) = cfg.importers.destination(importer) else {
        let reason = "No billing folder mapping found";
        tracing::warn!(kind = FailureKind::ResolutionFailure.as_str(), "SKIPPED {job}: {reason}");
        log_row(paths, &job, importer, "", &trigger, ItemStatus::Skipped, reason);
        out.push(state, &job, &key, ItemStatus::Skipped, reason);
        return;
    };

    let dest_parent = paths.destination_root.join(billing_folder);
    if let Err(err) = fs::create_dir_all(&dest_parent) {
        let comments = format!("Processing error: failed to create {}: {err}", dest_parent.display());
        tracing::warn!(kind = FailureKind::classify(&err).as_str(), "ERROR {job}: {comments}");
        log_row(paths, &job, importer, billing_folder, &trigger, ItemStatus::Error, &comments);
        out.push(state, &job, &key, ItemStatus::Error, comments);
        return;
    }
    match promote_folder(paths, job_path, &dest_parent) {
        Ok(final_path) => {
            let comments = format!("Moved to {}", final_path.display());
            tracing::info!("MOVED {job} -> {billing_folder}");
            log_row(paths, &job, importer, billing_folder, &trigger, ItemStatus::Moved, &comments);
            out.push(state, &job, &key, ItemStatus::Moved, final_path.display().to_string());
        }
        Err(err) => {
            let kind = classify_anyhow(&err);
            let comments = match kind {
                FailureKind::PermissionDenied => format!("Permission denied: {err:#}"),
                _ => format!("Move failed: {err:#}"),
            };
            tracing::warn!(kind = kind.as_str(), "ERROR {job}: {comments}");
            log_row(paths, &job, importer, billing_folder, &trigger, ItemStatus::Error, &comments);
            out.push(state, &job, &key, ItemStatus::Error, comments);
        }
    }
}

pub fn run_cycle(
    paths: &TierPaths,
    cfg: &TierConfig,
    extractor: &dyn TextExtractor,
    state: &WatcherState,
) -> Result<CycleOutcome> {
    if !paths.working_root.is_dir() {
        anyhow::bail!("working area does not exist: {}", paths.working_root.display());
    }
    let mut out = CycleOutcome::new(WatcherKind::Promote);
    for trigger_path in find_trigger_documents(paths, cfg)? {
        process_trigger(paths, cfg, extractor, state, &trigger_path, &mut out);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::tier::fsops::name_at_limit;
    use crate::tier::paths::fixture_paths;
    use crate::tier::transactions::read_transactions;
    use tempfile::tempdir;

    struct FakeExtractor(Option<&'static str>);

    impl TextExtractor for FakeExtractor {
        fn extract_first_page(&self, path: &Path) -> Result<String, ExtractionError> {
            self.0.map(str::to_string).ok_or_else(|| ExtractionError::NoPages(path.to_path_buf()))
        }
    }

    const BMW_TEXT: &str = "Out of Charge\nImporter: Bmw India Private Limited\nPort: NHAVA SHEVA";

    fn setup(root: &Path) -> TierPaths {
        let paths = fixture_paths(root);
        fs::create_dir_all(&paths.inbox_dir).expect("mkdir inbox");
        fs::create_dir_all(&paths.destination_root).expect("mkdir destination");
        paths
    }

    fn job_with_trigger(paths: &TierPaths, job: &str, trigger: &str) -> PathBuf {
        let dir = paths.working_root.join(job);
        fs::create_dir_all(&dir).expect("mkdir job");
        fs::write(dir.join(trigger), "pdf").expect("write trigger");
        fs::write(dir.join("Invoice.pdf"), "invoice").expect("write doc");
        dir
    }

    #[test]
    fn promotes_job_to_mapped_company_folder() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let job = job_with_trigger(&paths, "IR00451", "Out_of_Charge_IR_00451.pdf");

        let state = WatcherState::default();
        let out = run_cycle(&paths, &TierConfig::default(), &FakeExtractor(Some(BMW_TEXT)), &state)
            .expect("cycle");

        let target = paths.destination_root.join("BMW INDIA PVT LTD/IR00451");
        assert_eq!(out.moved, 1);
        assert!(!job.exists());
        assert!(target.join("Invoice.pdf").exists());

        let txs = read_transactions(&paths).expect("transactions");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].job_key, "IR00451");
        assert_eq!(txs[0].original_path, job);
        assert_eq!(txs[0].moved_path, target);

        let rows = ledger::read_rows(&paths.promotion_log()).expect("promotion log");
        assert_eq!(rows[0][2], "BMW INDIA PRIVATE LIMITED");
        assert_eq!(rows[0][3], "BMW INDIA PVT LTD");
        assert_eq!(rows[0][5], "MOVED");
    }

    #[test]
    fn collision_at_destination_gets_timestamp_suffix() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        job_with_trigger(&paths, "IR00451", "OUT OF CHARGE_IR_00451.PDF");
        let occupied = paths.destination_root.join("BMW INDIA PVT LTD/IR00451");
        fs::create_dir_all(&occupied).expect("mkdir occupied");

        let out = run_cycle(
            &paths,
            &TierConfig::default(),
            &FakeExtractor(Some(BMW_TEXT)),
            &WatcherState::default(),
        )
        .expect("cycle");
        assert_eq!(out.moved, 1);
        let txs = read_transactions(&paths).expect("transactions");
        let name = file_name_string(&txs[0].moved_path);
        assert!(name.starts_with("IR00451_"), "{name}");
        assert!(txs[0].moved_path.join("Invoice.pdf").exists());
    }

    #[test]
    fn substring_trigger_names_are_ignored() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let job = job_with_trigger(&paths, "IR00451", "INBOUND_OOC_OUT_OF_CHARGE_IR_00451.pdf");

        let out = run_cycle(
            &paths,
            &TierConfig::default(),
            &FakeExtractor(Some(BMW_TEXT)),
            &WatcherState::default(),
        )
        .expect("cycle");
        assert_eq!(out.scanned, 0);
        assert!(job.exists());
    }

    #[test]
    fn unreadable_or_unknown_documents_are_skipped() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let job = job_with_trigger(&paths, "IR00451", "Out_of_Charge_IR_00451.pdf");

        let state = WatcherState::default();
        let out = run_cycle(&paths, &TierConfig::default(), &FakeExtractor(None), &state)
            .expect("cycle");
        assert_eq!(out.skipped, 1);
        assert_eq!(out.events[0].detail, "Could not extract text from PDF");

        let out = run_cycle(
            &paths,
            &TierConfig::default(),
            &FakeExtractor(Some("IMPORTER: NOBODY WE KNOW")),
            &state,
        )
        .expect("cycle");
        assert_eq!(out.events[0].detail, "No matching importer found in PDF");
        assert!(job.exists());
        assert_eq!(state.counters().skipped, 2);
        assert!(read_transactions(&paths).is_err());
    }

    #[test]
    fn inbox_folder_is_never_promoted() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        fs::write(paths.inbox_dir.join("Out_of_Charge_IR_00451.pdf"), "pdf").expect("write");

        let out = run_cycle(
            &paths,
            &TierConfig::default(),
            &FakeExtractor(Some(BMW_TEXT)),
            &WatcherState::default(),
        )
        .expect("cycle");
        assert_eq!(out.scanned, 0);
        assert!(paths.inbox_dir.exists());
    }

    #[test]
    fn second_trigger_in_moved_folder_is_not_reprocessed() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let job = job_with_trigger(&paths, "IR00451", "Out_of_Charge_IR_00451.pdf");
        fs::write(job.join("Out of Charge_IR_00451.pdf"), "dup").expect("write");

        let out = run_cycle(
            &paths,
            &TierConfig::default(),
            &FakeExtractor(Some(BMW_TEXT)),
            &WatcherState::default(),
        )
        .expect("cycle");
        assert_eq!(out.moved, 1);
        assert_eq!(out.errors, 0);
        assert_eq!(read_transactions(&paths).expect("transactions").len(), 1);
    }

    #[test]
    fn missing_working_root_fails_the_cycle() {
        let tmp = tempdir().expect("tempdir");
        let paths = fixture_paths(tmp.path());
        assert!(
            run_cycle(
                &paths,
                &TierConfig::default(),
                &FakeExtractor(None),
                &WatcherState::default()
            )
            .is_err()
        );
    }

    #[test]
    fn blocked_company_folder_leaves_job_in_place() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let job = job_with_trigger(&paths, "IR00451", "Out_of_Charge_IR_00451.pdf");
        fs::write(paths.destination_root.join("BMW INDIA PVT LTD"), "not a folder")
            .expect("write blocker");

        let state = WatcherState::default();
        let out = run_cycle(&paths, &TierConfig::default(), &FakeExtractor(Some(BMW_TEXT)), &state)
            .expect("cycle");
        assert_eq!(out.errors, 1);
        assert!(job.join("Invoice.pdf").exists());
        assert!(!paths.transaction_log().exists());

        let rows = ledger::read_rows(&paths.promotion_log()).expect("promotion log");
        assert_eq!(rows[0][5], "ERROR");
        assert!(rows[0][6].starts_with("Processing error"), "{}", rows[0][6]);
        assert_eq!(state.counters().errors, 1);
    }

    #[test]
    fn failed_folder_move_writes_no_transaction() {
        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let name = name_at_limit("IR00451_", "");
        let job = job_with_trigger(&paths, &name, "Out_of_Charge_IR_00451.pdf");
        fs::create_dir_all(paths.destination_root.join("BMW INDIA PVT LTD").join(&name))
            .expect("mkdir occupied");

        let out = run_cycle(
            &paths,
            &TierConfig::default(),
            &FakeExtractor(Some(BMW_TEXT)),
            &WatcherState::default(),
        )
        .expect("cycle");
        assert_eq!(out.errors, 1);
        assert_eq!(out.moved, 0);
        assert!(job.join("Invoice.pdf").exists());
        assert!(!paths.transaction_log().exists());
        let rows = ledger::read_rows(&paths.promotion_log()).expect("promotion log");
        assert!(rows[0][6].starts_with("Move failed: "), "{}", rows[0][6]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_job_folder_keeps_its_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempdir().expect("tempdir");
        let paths = setup(tmp.path());
        let name = OsStr::from_bytes(b"IR00451_\xff");
        let job = paths.working_root.join(name);
        fs::create_dir_all(&job).expect("mkdir job");
        fs::write(job.join("Out_of_Charge_IR_00451.pdf"), "pdf").expect("write trigger");

        let company = paths.destination_root.join("BMW INDIA PVT LTD");
        fs::create_dir_all(&company).expect("mkdir company");

        let moved = promote_folder(&paths, &job, &company).expect("promote");
        assert_eq!(moved, company.join(name));
        assert!(moved.join("Out_of_Charge_IR_00451.pdf").exists());
        assert!(!job.exists());
    }
}
