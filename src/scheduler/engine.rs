//! Job dispatch engine
//!
//! A single dedicated thread owns the pending-job queue, ordered by fire
//! time, and sleeps until the earliest job is due or a control message
//! arrives. Job bodies block on external process invocation, so each
//! firing runs on its own worker thread; firings for different
//! repositories may overlap, while the per-repository mutex held inside
//! the job bodies serializes firings for the same repository.
//!
//! Shutdown drains every pending job — recurring and deferred — before
//! the dispatch thread exits, and is safe to request more than once.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::config::model::TimeUnit;
use crate::error::{SnapError, SnapResult};
use crate::scheduler::timing;

/// Body of a recurring job, invoked on every firing
pub type RecurringBody = Arc<dyn Fn() + Send + Sync>;

/// Body of a one-shot deferred job
pub type OneShotBody = Box<dyn FnOnce() + Send>;

/// Idle wait when no job is pending
const IDLE_WAIT: Duration = Duration::from_secs(60);

enum JobKind {
    Recurring {
        unit: TimeUnit,
        every: u32,
        body: RecurringBody,
    },
    OneShot {
        body: OneShotBody,
    },
}

struct PendingJob {
    run_at: NaiveDateTime,
    seq: u64,
    name: String,
    kind: JobKind,
}

// The queue is a max-heap; invert the ordering so the earliest fire
// time sits on top, with the registration sequence as tie-breaker.
impl Ord for PendingJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .run_at
            .cmp(&self.run_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingJob {
    fn eq(&self, other: &Self) -> bool {
        self.run_at == other.run_at && self.seq == other.seq
    }
}

impl Eq for PendingJob {}

enum Command {
    Schedule(PendingJob),
    Shutdown,
}

/// Cloneable handle for registering jobs and requesting shutdown
///
/// Job bodies hold one of these to schedule their paired deferred job.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: Sender<Command>,
    seq: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Register a recurring job; the first firing is the next cron
    /// boundary after now
    pub fn schedule_recurring(
        &self,
        name: impl Into<String>,
        unit: TimeUnit,
        every: u32,
        body: RecurringBody,
    ) -> SnapResult<()> {
        let name = name.into();
        let run_at = timing::next_recurring_fire(unit, every, Local::now().naive_local());
        debug!("registering recurring job '{}', first fire {}", name, run_at);
        self.send(PendingJob {
            run_at,
            seq: self.next_seq(),
            name,
            kind: JobKind::Recurring { unit, every, body },
        })
    }

    /// Register a one-shot job at an absolute fire time
    pub fn schedule_at(
        &self,
        name: impl Into<String>,
        run_at: NaiveDateTime,
        body: OneShotBody,
    ) -> SnapResult<()> {
        let name = name.into();
        debug!("registering one-shot job '{}' at {}", name, run_at);
        self.send(PendingJob {
            run_at,
            seq: self.next_seq(),
            name,
            kind: JobKind::OneShot { body },
        })
    }

    /// Request shutdown; safe to call when the engine already stopped
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    fn send(&self, job: PendingJob) -> SnapResult<()> {
        self.tx
            .send(Command::Schedule(job))
            .map_err(|_| SnapError::Scheduler("dispatch thread is not running".into()))
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

/// The dispatch engine and its thread
pub struct Scheduler {
    handle: SchedulerHandle,
    thread: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Start the dispatch thread with an empty queue
    pub fn start() -> SnapResult<Self> {
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("btrsnapd-dispatch".into())
            .spawn(move || dispatch_loop(rx))
            .map_err(|e| SnapError::Scheduler(format!("failed to start dispatch thread: {}", e)))?;

        Ok(Self {
            handle: SchedulerHandle {
                tx,
                seq: Arc::new(AtomicU64::new(0)),
            },
            thread: Some(thread),
        })
    }

    /// Handle for registering jobs from outside and from job bodies
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Whether the dispatch thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Request shutdown; idempotent
    pub fn shutdown(&self) {
        self.handle.shutdown();
    }

    /// Wait for the dispatch thread to exit
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("dispatch thread panicked");
            }
        }
    }
}

fn dispatch_loop(rx: Receiver<Command>) {
    let mut queue: BinaryHeap<PendingJob> = BinaryHeap::new();

    loop {
        let timeout = match queue.peek() {
            Some(job) => duration_until(job.run_at),
            None => IDLE_WAIT,
        };

        match rx.recv_timeout(timeout) {
            Ok(Command::Schedule(job)) => queue.push(job),
            Ok(Command::Shutdown) => {
                info!("shutting down, cancelling {} pending jobs", queue.len());
                queue.clear();
                break;
            }
            Err(RecvTimeoutError::Timeout) => run_due_jobs(&mut queue),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn run_due_jobs(queue: &mut BinaryHeap<PendingJob>) {
    let now = Local::now().naive_local();

    while queue.peek().is_some_and(|job| job.run_at <= now) {
        let job = queue.pop().expect("peeked job is present");
        debug!("firing job '{}'", job.name);

        match job.kind {
            JobKind::Recurring { unit, every, body } => {
                spawn_worker(&job.name, {
                    let body = Arc::clone(&body);
                    Box::new(move || body())
                });
                // Re-arm from the current time so a long-running body
                // never piles up missed firings.
                queue.push(PendingJob {
                    run_at: timing::next_recurring_fire(unit, every, now),
                    seq: job.seq,
                    name: job.name,
                    kind: JobKind::Recurring { unit, every, body },
                });
            }
            JobKind::OneShot { body } => spawn_worker(&job.name, body),
        }
    }
}

fn spawn_worker(name: &str, body: OneShotBody) {
    let result = thread::Builder::new()
        .name(format!("job-{}", name))
        .spawn(body);
    if let Err(e) = result {
        warn!("failed to spawn worker for '{}': {}", name, e);
    }
}

fn duration_until(run_at: NaiveDateTime) -> Duration {
    let now = Local::now().naive_local();
    (run_at - now).to_std().unwrap_or(Duration::ZERO)
}
