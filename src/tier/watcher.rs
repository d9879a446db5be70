use crate::error::TierErrorCode;
use crate::tier::config::TierConfig;
use crate::tier::cycle::CycleOutcome;
use crate::tier::daemon_lock;
use crate::tier::extract::{PdfTextExtractor, TextExtractor};
use crate::tier::ledger::now_timestamp;
use crate::tier::paths::TierPaths;
use crate::tier::state::{self, ItemStatus, StatusSnapshot, WatcherKind, WatcherState};
use crate::tier::{ingest, promote, reconcile};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const STOP_SLICE: Duration = Duration::from_millis(200);
const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

pub struct WatcherContext {
    pub paths: TierPaths,
    pub cfg: TierConfig,
    pub extractor: Arc<dyn TextExtractor>,
}

impl WatcherContext {
    pub fn new(paths: TierPaths, cfg: TierConfig) -> Self {
        Self {
            paths,
            cfg,
            extractor: Arc::new(PdfTextExtractor),
        }
    }

    pub fn root(&self, kind: WatcherKind) -> &Path {
        match kind {
            WatcherKind::Ingest => &self.paths.inbox_dir,
            WatcherKind::Promote => &self.paths.working_root,
            WatcherKind::Reconcile => &self.paths.destination_root,
        }
    }

    pub fn interval(&self, kind: WatcherKind) -> Duration {
        let secs = match kind {
            WatcherKind::Ingest => self.cfg.watcher.ingest_interval_secs,
            WatcherKind::Promote => self.cfg.watcher.promote_interval_secs,
            WatcherKind::Reconcile => self.cfg.watcher.reconcile_interval_secs,
        };
        Duration::from_secs(secs)
    }
}

pub fn run_cycle(ctx: &WatcherContext, kind: WatcherKind, state: &WatcherState) -> Result<CycleOutcome> {
    match kind {
        WatcherKind::Ingest => ingest::run_cycle(&ctx.paths, &ctx.cfg, state),
        WatcherKind::Promote => promote::run_cycle(&ctx.paths, &ctx.cfg, ctx.extractor.as_ref(), state),
        WatcherKind::Reconcile => reconcile::run_cycle(&ctx.paths, &ctx.cfg, state),
    }
}

fn sleep_sliced(total: Duration, keep_going: impl Fn() -> bool) {
    let deadline = Instant::now() + total;
    while keep_going() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(STOP_SLICE.min(deadline - now));
    }
}

fn poll_loop(ctx: &WatcherContext, kind: WatcherKind, state: &WatcherState) {
    let root = ctx.root(kind);
    if !root.is_dir() {
        tracing::error!(
            code = TierErrorCode::E003RootMissing.as_str(),
            "{} watcher not started: {} does not exist",
            kind.name(),
            root.display()
        );
        state.set_running(false);
        return;
    }

    tracing::info!("{} watcher started on {}", kind.name(), root.display());
    while state.is_running() {
        match run_cycle(ctx, kind, state) {
            Ok(out) if out.moved + out.skipped + out.errors > 0 => tracing::info!("{}", out.summary()),
            Ok(out) => tracing::debug!("{}", out.summary()),
            Err(err) => {
                state.record(ItemStatus::Error);
                tracing::error!("{} cycle failed: {err:#}", kind.name());
            }
        }
        sleep_sliced(ctx.interval(kind), || state.is_running());
    }
    tracing::info!("{} watcher stopped", kind.name());
}

pub struct WatcherController {
    ctx: Arc<WatcherContext>,
    states: BTreeMap<WatcherKind, Arc<WatcherState>>,
    handles: Mutex<BTreeMap<WatcherKind, JoinHandle<()>>>,
}

impl WatcherController {
    pub fn new(ctx: Arc<WatcherContext>) -> Self {
        let states = WatcherKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::new(WatcherState::default())))
            .collect();
        Self {
            ctx,
            states,
            handles: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn state(&self, kind: WatcherKind) -> Arc<WatcherState> {
        self.states
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Spawn the poll loop unless it is already running. Returns whether a
    /// new loop was started. A loop that was asked to stop is joined first so
    /// two loops never share one kind.
    pub fn start(&self, kind: WatcherKind) -> Result<bool> {
        let state = self.state(kind);
        let mut handles = self
            .handles
            .lock()
            .map_err(|_| anyhow::anyhow!("watcher handle table poisoned"))?;
        if state.is_running() {
            return Ok(false);
        }
        if let Some(previous) = handles.remove(&kind) {
            join_logged(kind, previous);
        }
        if !state.try_mark_running() {
            return Ok(false);
        }

        let ctx = Arc::clone(&self.ctx);
        let thread_state = Arc::clone(&state);
        let spawned = thread::Builder::new()
            .name(format!("tiersync-{}", kind.name()))
            .spawn(move || poll_loop(&ctx, kind, &thread_state));
        match spawned {
            Ok(handle) => {
                handles.insert(kind, handle);
                Ok(true)
            }
            Err(err) => {
                state.set_running(false);
                Err(err).with_context(|| format!("failed to spawn {} watcher", kind.name()))
            }
        }
    }

    pub fn stop(&self, kind: WatcherKind) {
        self.state(kind).set_running(false);
    }

    pub fn start_all(&self) -> Result<()> {
        for kind in WatcherKind::ALL {
            self.start(kind)?;
        }
        Ok(())
    }

    pub fn stop_all(&self) {
        for kind in WatcherKind::ALL {
            self.stop(kind);
        }
    }

    pub fn any_running(&self) -> bool {
        self.states.values().any(|state| state.is_running())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let mut snap = StatusSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            pid: std::process::id(),
            updated_at: now_timestamp(),
            ..StatusSnapshot::default()
        };
        for (kind, state) in &self.states {
            snap.set(*kind, state.counters());
        }
        snap
    }

    pub fn join_all(&self) {
        let handles = match self.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(_) => return,
        };
        for (kind, handle) in handles {
            join_logged(kind, handle);
        }
    }
}

fn join_logged(kind: WatcherKind, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("{} watcher thread panicked", kind.name());
    }
}

pub fn run_once(ctx: &WatcherContext, kinds: &[WatcherKind]) -> Vec<(WatcherKind, Result<CycleOutcome>)> {
    kinds
        .iter()
        .map(|&kind| {
            let state = WatcherState::default();
            let root = ctx.root(kind);
            let result = if root.is_dir() {
                run_cycle(ctx, kind, &state)
            } else {
                Err(anyhow::anyhow!(
                    "{}: {} does not exist",
                    TierErrorCode::E003RootMissing.as_str(),
                    root.display()
                ))
            };
            (kind, result)
        })
        .collect()
}

fn save_snapshot(paths: &TierPaths, snap: &StatusSnapshot) {
    if let Err(err) = state::save(paths, snap) {
        tracing::warn!("failed to write watcher status: {err:#}");
    }
}

pub fn run_daemon(ctx: WatcherContext, kinds: &[WatcherKind]) -> Result<StatusSnapshot> {
    let _lock = daemon_lock::acquire(&ctx.paths)?;
    let paths = ctx.paths.clone();
    let refresh = Duration::from_secs(ctx.cfg.watcher.status_refresh_secs.max(1));
    let controller = WatcherController::new(Arc::new(ctx));

    let stop_requested = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop_requested);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install signal handler")?;

    if kinds.len() == WatcherKind::ALL.len() {
        controller.start_all()?;
    } else {
        for &kind in kinds {
            controller.start(kind)?;
        }
    }
    tracing::info!(
        "daemon running pid={} watchers={}",
        std::process::id(),
        kinds.iter().map(|k| k.name()).collect::<Vec<_>>().join(",")
    );

    loop {
        save_snapshot(&paths, &controller.snapshot());
        if stop_requested.load(Ordering::SeqCst) {
            tracing::info!("stop requested; waiting for running cycles to finish");
            break;
        }
        if !controller.any_running() {
            tracing::warn!("no watcher is running; daemon exiting");
            break;
        }
        sleep_sliced(refresh, || !stop_requested.load(Ordering::SeqCst));
    }

    controller.stop_all();
    controller.join_all();
    let snap = controller.snapshot();
    save_snapshot(&paths, &snap);
    Ok(snap)
}
