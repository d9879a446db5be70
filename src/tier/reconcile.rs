use crate::error::classify_anyhow;
use crate::tier::config::{TierConfig, normalize_extension};
use crate::tier::cycle::CycleOutcome;
use crate::tier::fsops::{file_name_string, move_path, unique_destination_path};
use crate::tier::keys::{JobKey, extract_job_key};
use crate::tier::ledger::{self, LedgerKind, now_timestamp};
use crate::tier::paths::TierPaths;
use crate::tier::state::{ItemStatus, WatcherKind, WatcherState};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    out.sort();
    Ok(out)
}

fn is_excluded(cfg: &TierConfig, name: &str) -> bool {
    cfg.reconcile
        .excluded_folders
        .iter()
        .any(|excluded| excluded.trim().eq_ignore_ascii_case(name.trim()))
}

fn is_monitored(cfg: &TierConfig, path: &Path) -> bool {
    path.extension()
        .map(|e| normalize_extension(&e.to_string_lossy()))
        .map(|ext| cfg.reconcile.monitored_extensions.contains(&ext))
        .unwrap_or(false)
}

fn matching_job_folder(siblings: &[PathBuf], key: &JobKey) -> Option<PathBuf> {
    siblings
        .iter()
        .find(|dir| dir.is_dir() && key.matches_folder_name(&file_name_string(dir)))
        .cloned()
}

fn log_row(paths: &TierPaths, company: &str, filename: &str, source: &Path, dest: &Path, status: &str) {
    ledger::record(
        paths,
        LedgerKind::Reconcile,
        &[
            now_timestamp(),
            company.to_string(),
            filename.to_string(),
            source.display().to_string(),
            dest.display().to_string(),
            status.to_string(),
        ],
    );
}

fn reconcile_company(
    paths: &TierPaths,
    cfg: &TierConfig,
    state: &WatcherState,
    company_dir: &Path,
    out: &mut CycleOutcome,
) {
    let company = file_name_string(company_dir);
    let children = match sorted_children(company_dir) {
        Ok(children) => children,
        Err(err) => {
            tracing::warn!("skipping company folder {company}: {err:#}");
            return;
        }
    };

    for file_path in children.iter().filter(|p| p.is_file()) {
        if !is_monitored(cfg, file_path) {
            continue;
        }
        let Some(name) = file_path.file_name() else {
            continue;
        };
        out.scanned += 1;
        let filename = name.to_string_lossy().to_string();

        let Some(key) = extract_job_key(&filename) else {
            tracing::debug!("{company}/{filename}: no job key");
            continue;
        };
        let Some(job_folder) = matching_job_folder(&children, &key) else {
            tracing::debug!("{company}/{filename}: no folder for {key}");
            continue;
        };

        let dest = unique_destination_path(&job_folder.join(name));
        match move_path(file_path, &dest) {
            Ok(()) => {
                tracing::info!("MOVED {company}/{filename} -> {}", file_name_string(&job_folder));
                log_row(paths, &company, &filename, file_path, &dest, "MOVED");
                out.push(state, &filename, key.as_str(), ItemStatus::Moved, dest.display().to_string());
            }
            Err(err) => {
                let kind = classify_anyhow(&err);
                let reason = format!("{err:#}");
                tracing::warn!(kind = kind.as_str(), "failed to move {company}/{filename}: {reason}");
                log_row(paths, &company, &filename, file_path, &dest, &format!("ERROR: {reason}"));
                out.push(state, &filename, key.as_str(), ItemStatus::Error, reason);
            }
        }
    }
}

pub fn run_cycle(paths: &TierPaths, cfg: &TierConfig, state: &WatcherState) -> Result<CycleOutcome> {
    let mut out = CycleOutcome::new(WatcherKind::Reconcile);
    for company_dir in sorted_children(&paths.destination_root)? {
        if !company_dir.is_dir() || is_excluded(cfg, &file_name_string(&company_dir)) {
            continue;
        }
        reconcile_company(paths, cfg, state, &company_dir, &mut out);
    }
    Ok(out)
}
