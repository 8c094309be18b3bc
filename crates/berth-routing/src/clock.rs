//! Wall-clock time as the engine sees it.
//!
//! Pending-connection ages are measured against wall time, which can jump
//! backward under NTP adjustment; the sweep logic compensates rather than
//! assuming monotonicity. Production uses `SystemClock`; tests inject a
//! `ManualClock` and drive it by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the UNIX epoch.
pub type Timestamp = u64;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::Relaxed);
    }

    /// Move backward, saturating at zero. Models an NTP step.
    pub fn rewind(&self, millis: u64) {
        let now = self.now.load(Ordering::Relaxed);
        self.now.store(now.saturating_sub(millis), Ordering::Relaxed);
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::Relaxed)
    }
}
