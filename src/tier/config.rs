use crate::error::TierErrorCode;
use crate::tier::importer_map::ImporterMap;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherIntervals {
    pub ingest_interval_secs: u64,
    pub promote_interval_secs: u64,
    pub reconcile_interval_secs: u64,
    #[serde(default = "default_status_refresh_secs")]
    pub status_refresh_secs: u64,
}

fn default_status_refresh_secs() -> u64 {
    5
}

impl Default for WatcherIntervals {
    fn default() -> Self {
        Self {
            ingest_interval_secs: 15,
            promote_interval_secs: 15,
            reconcile_interval_secs: 15,
            status_refresh_secs: default_status_refresh_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionConfig {
    pub trigger_prefixes: Vec<String>,
    pub trigger_extensions: Vec<String>,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            trigger_prefixes: vec![
                "OUT_OF_CHARGE_IR_".to_string(),
                "OUT OF CHARGE_IR_".to_string(),
            ],
            trigger_extensions: vec!["pdf".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub monitored_extensions: Vec<String>,
    pub excluded_folders: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            monitored_extensions: ["pdf", "docx", "xlsx", "jpg", "png", "zip"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            excluded_folders: [
                "BILL RECEVING COPY",
                "BHARTI AIRTEL  AIFTA",
                "Automation Logs",
                "AUTO_SCRIPT",
                "File_Organization_Logs",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TierConfig {
    pub watcher: WatcherIntervals,
    pub ingest: IngestConfig,
    pub promotion: PromotionConfig,
    pub reconcile: ReconcileConfig,
    pub importers: ImporterMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialTierConfig {
    watcher: Option<WatcherIntervals>,
    ingest: Option<IngestConfig>,
    promotion: Option<PromotionConfig>,
    reconcile: Option<ReconcileConfig>,
    importers: Option<BTreeMap<String, String>>,
}

pub fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn normalize_extensions(list: &mut Vec<String>) {
    let mut out = list
        .iter()
        .map(|e| normalize_extension(e))
        .filter(|e| !e.is_empty())
        .collect::<Vec<_>>();
    out.dedup();
    *list = out;
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn validate(cfg: &TierConfig) -> Result<()> {
    for (name, secs) in [
        ("ingest", cfg.watcher.ingest_interval_secs),
        ("promote", cfg.watcher.promote_interval_secs),
        ("reconcile", cfg.watcher.reconcile_interval_secs),
        ("status refresh", cfg.watcher.status_refresh_secs),
    ] {
        if secs == 0 {
            return Err(anyhow!("invalid {name} interval: must be >= 1 second"));
        }
    }
    if cfg
        .promotion
        .trigger_prefixes
        .iter()
        .all(|p| p.trim().is_empty())
    {
        return Err(anyhow!("invalid trigger prefixes: at least one is required"));
    }
    if cfg.promotion.trigger_extensions.is_empty() {
        return Err(anyhow!(
            "invalid trigger extensions: at least one is required"
        ));
    }
    if cfg.importers.is_empty() {
        return Err(anyhow!("invalid importer map: cannot be empty"));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("TIERSYNC_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".tiersync").join("tiersync.toml"))
}

fn merge_file_config(base: &mut TierConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_toml(base, &raw)
        .map_err(|err| anyhow!("failed to parse tiersync config {}: {err}", path.display()))
}

fn merge_toml(base: &mut TierConfig, raw: &str) -> Result<()> {
    let parsed: PartialTierConfig = toml::from_str(raw)?;
    if let Some(watcher) = parsed.watcher {
        base.watcher = watcher;
    }
    if let Some(ingest) = parsed.ingest {
        base.ingest = ingest;
    }
    if let Some(promotion) = parsed.promotion {
        base.promotion = promotion;
    }
    if let Some(reconcile) = parsed.reconcile {
        base.reconcile = reconcile;
    }
    if let Some(importers) = parsed.importers {
        base.importers = ImporterMap::from_pairs(importers);
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut TierConfig) {
    cfg.watcher.ingest_interval_secs = env_or_u64(
        "TIERSYNC_INGEST_INTERVAL_SECS",
        cfg.watcher.ingest_interval_secs,
    );
    cfg.watcher.promote_interval_secs = env_or_u64(
        "TIERSYNC_PROMOTE_INTERVAL_SECS",
        cfg.watcher.promote_interval_secs,
    );
    cfg.watcher.reconcile_interval_secs = env_or_u64(
        "TIERSYNC_RECONCILE_INTERVAL_SECS",
        cfg.watcher.reconcile_interval_secs,
    );
    cfg.watcher.status_refresh_secs = env_or_u64(
        "TIERSYNC_STATUS_REFRESH_SECS",
        cfg.watcher.status_refresh_secs,
    );
    cfg.ingest.extensions = env_or_csv("TIERSYNC_INBOX_EXTENSIONS", &cfg.ingest.extensions);
    cfg.promotion.trigger_prefixes =
        env_or_csv("TIERSYNC_TRIGGER_PREFIXES", &cfg.promotion.trigger_prefixes);
    cfg.promotion.trigger_extensions = env_or_csv(
        "TIERSYNC_TRIGGER_EXTENSIONS",
        &cfg.promotion.trigger_extensions,
    );
    cfg.reconcile.monitored_extensions = env_or_csv(
        "TIERSYNC_MONITORED_EXTENSIONS",
        &cfg.reconcile.monitored_extensions,
    );
    cfg.reconcile.excluded_folders = env_or_csv(
        "TIERSYNC_EXCLUDED_FOLDERS",
        &cfg.reconcile.excluded_folders,
    );
}

fn finish(cfg: &mut TierConfig) -> Result<()> {
    normalize_extensions(&mut cfg.ingest.extensions);
    normalize_extensions(&mut cfg.promotion.trigger_extensions);
    normalize_extensions(&mut cfg.reconcile.monitored_extensions);
    cfg.promotion.trigger_prefixes = cfg
        .promotion
        .trigger_prefixes
        .iter()
        .map(|p| p.to_uppercase())
        .filter(|p| !p.trim().is_empty())
        .collect();
    validate(cfg)
}

pub fn load_config() -> Result<TierConfig> {
    let code = TierErrorCode::E002ConfigInvalid.as_str();
    let mut cfg = TierConfig::default();
    merge_file_config(&mut cfg).map_err(|err| anyhow!("{code}: {err:#}"))?;
    apply_env_overrides(&mut cfg);
    finish(&mut cfg).map_err(|err| anyhow!("{code}: {err:#}"))?;
    Ok(cfg)
}
