//! Daemon orchestration
//!
//! Wires the snapshot store, retention policy, pointer manager, disable
//! gate and scheduler into the rotation cycle, and owns the daemon's
//! main line of control. All shared state lives in a single `SnapContext`
//! constructed once at startup and passed to every job; there are no
//! ambient globals.
//!
//! A rotation runs five steps in strict sequence: gate check, snapshot
//! creation, retention pruning, pointer phase 1 (previous survivor), and
//! registration of the deferred phase-2 job that repoints the link at
//! the newest survivor half a period later. A per-repository mutex is
//! held across the whole cycle — and by the paired deferred job — so
//! overlapping firings for the same repository serialize; firings for
//! different repositories proceed independently.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::Local;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{debug, info};

use crate::config::loader::DaemonConfig;
use crate::config::model::RepositoryConfig;
use crate::error::{SnapError, SnapResult};
use crate::scheduler::engine::{Scheduler, SchedulerHandle};
use crate::scheduler::timing;
use crate::snapshot::name::SnapshotName;
use crate::snapshot::pointer::{self, PointerManager};
use crate::snapshot::retention;
use crate::snapshot::store::SnapshotStore;
use crate::state::gate::DisableGate;
use crate::state::status::{ServiceStatus, StatusStore};

/// Poll interval of the main liveness loop
const LIVENESS_POLL: Duration = Duration::from_secs(1);

/// Everything a job firing needs, constructed once at startup
pub struct SnapContext {
    repositories: Vec<Arc<RepositoryConfig>>,
    // One lock per repository, covering {recurring job body, its paired
    // deferred job}.
    cycle_locks: Vec<Mutex<()>>,
    gate: DisableGate,
    store: SnapshotStore,
    pointer: PointerManager,
    status: Arc<StatusStore>,
}

impl SnapContext {
    pub fn new(
        config: DaemonConfig,
        store: SnapshotStore,
        pointer: PointerManager,
        status: Arc<StatusStore>,
    ) -> Arc<Self> {
        let repositories: Vec<Arc<RepositoryConfig>> =
            config.repositories.into_iter().map(Arc::new).collect();
        let cycle_locks = repositories.iter().map(|_| Mutex::new(())).collect();

        Arc::new(Self {
            repositories,
            cycle_locks,
            gate: DisableGate::new(config.stoppers),
            store,
            pointer,
            status,
        })
    }

    /// Number of configured repository/level entries
    pub fn repository_count(&self) -> usize {
        self.repositories.len()
    }

    /// The entry at `idx`
    pub fn repository(&self, idx: usize) -> &Arc<RepositoryConfig> {
        &self.repositories[idx]
    }

    /// The process-wide status store
    pub fn status(&self) -> &Arc<StatusStore> {
        &self.status
    }

    fn cycle_lock(&self, idx: usize) -> MutexGuard<'_, ()> {
        // A poisoned lock only means a previous cycle panicked; the
        // filesystem state is re-derived from scratch each cycle.
        self.cycle_locks[idx]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Run one rotation cycle for the repository at `idx`
///
/// With a scheduler handle present the deferred phase-2 job is
/// registered at the end; without one (bootstrap, manual invocation)
/// the cycle finishes after pointer phase 1.
pub fn rotate(ctx: &Arc<SnapContext>, idx: usize, scheduler: Option<&SchedulerHandle>) {
    let config = Arc::clone(ctx.repository(idx));
    let _cycle = ctx.cycle_lock(idx);

    info!("snapshot for {} will be taken", config.full_name());

    if ctx.gate.is_disabled(&ctx.status) {
        info!("service is disabled, ignoring");
        return;
    }

    if let Err(e) = ctx.store.create(&config) {
        ctx.status.record_runtime_error(format!(
            "failed to create snapshot for {} repository: {}",
            config.full_name(),
            e
        ));
    }

    let snapshots = match ctx.store.list(&config) {
        Ok(snapshots) => snapshots,
        Err(e) => {
            ctx.status.record_runtime_error(format!(
                "failed to list snapshots for {}: {}",
                config.full_name(),
                e
            ));
            return;
        }
    };

    let plan = retention::plan(&snapshots, false);
    for expired in &plan.expired {
        if let Err(e) = ctx.store.delete(&config, expired) {
            ctx.status.record_runtime_error(e.to_string());
        }
    }

    let target = pointer::previous_survivor(&plan.survivors, &config, &ctx.status)
        .map(|name| ctx.store.snapshot_path(&config, name));
    ctx.pointer.update_link(&config, target.as_deref(), &ctx.status);

    if let Some(handle) = scheduler {
        schedule_repoint(ctx, idx, &config, plan.survivors, handle);
    }
}

/// Register the one-shot phase-2 job at half the repository's period
fn schedule_repoint(
    ctx: &Arc<SnapContext>,
    idx: usize,
    config: &RepositoryConfig,
    survivors: Vec<SnapshotName>,
    handle: &SchedulerHandle,
) {
    let run_at = timing::deferred_fire(config.unit, config.frequency, Local::now().naive_local());
    debug!(
        "scheduling link update for {} at {}",
        config.full_name(),
        run_at
    );

    let job_ctx = Arc::clone(ctx);
    let result = handle.schedule_at(
        format!("relink-{}", config.full_name()),
        run_at,
        Box::new(move || repoint(&job_ctx, idx, survivors)),
    );
    if let Err(e) = result {
        ctx.status.record_runtime_error(format!(
            "failed to schedule link update for {}: {}",
            config.full_name(),
            e
        ));
    }
}

/// Deferred phase 2: repoint the link at the newest survivor
///
/// Uses the survivor list computed when the rotation ran, and re-checks
/// the disable gate before acting.
pub fn repoint(ctx: &Arc<SnapContext>, idx: usize, survivors: Vec<SnapshotName>) {
    let config = Arc::clone(ctx.repository(idx));
    let _cycle = ctx.cycle_lock(idx);

    debug!("going to update symbolic link to latest snapshot");

    if ctx.gate.is_disabled(&ctx.status) {
        info!("service is disabled, ignoring");
        return;
    }

    let target = pointer::newest_survivor(&survivors, &config, &ctx.status)
        .map(|name| ctx.store.snapshot_path(&config, name));
    ctx.pointer.update_link(&config, target.as_deref(), &ctx.status);
}

/// Ensure every repository has a resolvable link before jobs register
///
/// Runs one synchronous rotation for each repository whose link does
/// not currently resolve, so a valid reference exists before the daemon
/// is considered up.
pub fn bootstrap(ctx: &Arc<SnapContext>) {
    for idx in 0..ctx.repository_count() {
        let config = ctx.repository(idx);
        if ctx.pointer.link_resolves(config) {
            debug!("link {} exists, nothing to do", config.link_path.display());
            continue;
        }

        info!(
            "link {} does not exist on startup, creating first snapshot",
            config.link_path.display()
        );
        rotate(ctx, idx, None);
    }
}

/// Register the recurring rotation job for every repository
pub fn register_jobs(ctx: &Arc<SnapContext>, handle: &SchedulerHandle) -> SnapResult<()> {
    for idx in 0..ctx.repository_count() {
        let config = ctx.repository(idx);
        let job_ctx = Arc::clone(ctx);
        let job_handle = handle.clone();

        handle.schedule_recurring(
            config.full_name(),
            config.unit,
            config.frequency,
            Arc::new(move || rotate(&job_ctx, idx, Some(&job_handle))),
        )?;
    }
    Ok(())
}

/// Delete every snapshot and latest link for every repository
pub fn delete_all(ctx: &Arc<SnapContext>) {
    info!("going to delete all snapshots for all repositories");

    for idx in 0..ctx.repository_count() {
        let config = Arc::clone(ctx.repository(idx));
        let _cycle = ctx.cycle_lock(idx);

        info!("deleting all snapshots for {}", config.full_name());

        let snapshots = match ctx.store.list(&config) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                ctx.status.record_runtime_error(format!(
                    "failed to list snapshots for {}: {}",
                    config.full_name(),
                    e
                ));
                continue;
            }
        };

        let plan = retention::plan(&snapshots, true);
        for expired in &plan.expired {
            if let Err(e) = ctx.store.delete(&config, expired) {
                ctx.status.record_runtime_error(e.to_string());
            }
        }

        ctx.pointer.remove_link(&config);
    }

    info!("deletion has been finished");
}

/// Run the daemon until a termination signal stops the scheduler
///
/// Startup order: dispatch engine, bootstrap cycles, job registration,
/// `Up` transition, signal listener. The calling thread then blocks,
/// polling the dispatch thread's liveness once a second, until shutdown.
pub fn run(ctx: Arc<SnapContext>) -> SnapResult<()> {
    let mut scheduler = Scheduler::start()?;
    let handle = scheduler.handle();

    bootstrap(&ctx);
    register_jobs(&ctx, &handle)?;

    ctx.status.set_status(ServiceStatus::Up);

    spawn_signal_listener(Arc::clone(&ctx.status), handle)?;

    while scheduler.is_running() {
        thread::sleep(LIVENESS_POLL);
    }
    scheduler.join();

    info!("scheduler stopped, exiting");
    Ok(())
}

/// Funnel termination signals into scheduler shutdown
///
/// The signal thread never mutates state directly beyond the status
/// store's own synchronized path: it cancels the scheduler (which
/// drains all pending jobs) and records the terminal status.
fn spawn_signal_listener(status: Arc<StatusStore>, handle: SchedulerHandle) -> SnapResult<()> {
    let mut signals = Signals::new([SIGTERM, SIGINT])
        .map_err(|e| SnapError::Scheduler(format!("failed to install signal handler: {}", e)))?;

    thread::Builder::new()
        .name("btrsnapd-signals".into())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!("got termination signal {}, exiting", signal);
                handle.shutdown();
                status.set_status(ServiceStatus::Stopped);
            }
        })
        .map_err(|e| SnapError::Scheduler(format!("failed to start signal thread: {}", e)))?;

    Ok(())
}
