//! The shared timeout sweep.
//!
//! One background thread serves every registration with queued connections.
//! It starts lazily on the first registration, wakes every half timeout,
//! sweeps each target, and shuts itself down after thirty seconds with
//! nothing to sweep. Registrations drop out by returning `false` from
//! `sweep`; an explicit `deregister` exists for callers that know they are
//! done.
//!
//! The scheduler lock is held across a whole sweep pass, so targets must
//! not call `register` from inside `sweep`. Registration teardown paths
//! never do; fresh connections register from `route`, which runs without
//! any scheduler involvement.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::clock::{Clock, Timestamp};
use crate::pending::PENDING_TIMEOUT_MS;

/// Sweep wake interval: half the pending timeout.
const SWEEP_TICK: Duration = Duration::from_millis(PENDING_TIMEOUT_MS / 2);

/// Cumulative empty time after which the thread exits.
const IDLE_SHUTDOWN: Duration = Duration::from_secs(30);

/// Something with time-bounded work. `sweep` returns `false` once the
/// target has nothing left to watch; the scheduler then drops it.
pub trait SweepTarget: Send + Sync {
    fn sweep(&self, now: Timestamp) -> bool;
}

/// Lazily started, self-stopping sweep loop.
#[derive(Clone)]
pub struct SweepScheduler {
    inner: Arc<SweepInner>,
}

struct SweepInner {
    clock: Arc<dyn Clock>,
    tick: Duration,
    idle_shutdown: Duration,
    state: Mutex<SweepState>,
}

struct SweepState {
    targets: Vec<Arc<dyn SweepTarget>>,
    thread_live: bool,
}

impl SweepScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_timing(clock, SWEEP_TICK, IDLE_SHUTDOWN)
    }

    /// Production timing is seconds; tests inject something faster.
    pub fn with_timing(clock: Arc<dyn Clock>, tick: Duration, idle_shutdown: Duration) -> Self {
        Self {
            inner: Arc::new(SweepInner {
                clock,
                tick,
                idle_shutdown,
                state: Mutex::new(SweepState {
                    targets: Vec::new(),
                    thread_live: false,
                }),
            }),
        }
    }

    /// Add a target and make sure the sweep thread is up.
    /// Re-registering an already-registered target is a no-op.
    pub fn register(&self, target: Arc<dyn SweepTarget>) {
        let mut state = self.inner.lock_state();
        if state.targets.iter().any(|t| same_target(t, &target)) {
            return;
        }
        state.targets.push(target);
        if !state.thread_live {
            state.thread_live = true;
            let inner = self.inner.clone();
            let spawned = thread::Builder::new()
                .name("berth-sweep".to_string())
                .spawn(move || run_loop(inner));
            if let Err(e) = spawned {
                state.thread_live = false;
                tracing::warn!(error = %e, "failed to spawn sweep thread");
            }
        }
    }

    pub fn deregister(&self, target: &Arc<dyn SweepTarget>) {
        let mut state = self.inner.lock_state();
        state.targets.retain(|t| !same_target(t, target));
    }

    /// Is the sweep thread currently alive?
    pub fn is_running(&self) -> bool {
        self.inner.lock_state().thread_live
    }

    pub fn target_count(&self) -> usize {
        self.inner.lock_state().targets.len()
    }
}

impl SweepInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, SweepState> {
        // A panicking target must not wedge the sweep for everyone else.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Identity by data address. `Arc::ptr_eq` also compares vtable pointers,
// which are not unique per type across codegen units.
fn same_target(a: &Arc<dyn SweepTarget>, b: &Arc<dyn SweepTarget>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn run_loop(inner: Arc<SweepInner>) {
    tracing::debug!("sweep thread started");
    let mut idle = Duration::ZERO;
    loop {
        thread::sleep(inner.tick);
        let now = inner.clock.now();
        let mut state = inner.lock_state();
        if state.targets.is_empty() {
            idle += inner.tick;
            if idle >= inner.idle_shutdown {
                state.thread_live = false;
                tracing::debug!("sweep thread idle, shutting down");
                return;
            }
        } else {
            idle = Duration::ZERO;
            // Lock held across the pass: targets see a consistent tick.
            state.targets.retain(|target| target.sweep(now));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
