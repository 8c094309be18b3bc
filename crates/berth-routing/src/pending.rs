//! The per-swarm queue of connections waiting for activation.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::clock::Timestamp;
use crate::conn::{InboundConnection, RoutingListener};

/// Queue capacity. The connection that would become entry eleven is refused.
pub(crate) const MAX_PENDING: usize = 10;

/// How long a queued connection may wait before it is evicted.
pub(crate) const PENDING_TIMEOUT_MS: u64 = 10_000;

/// One connection parked until its swarm activates.
pub(crate) struct PendingPeer {
    pub conn: Box<dyn InboundConnection>,
    pub enqueued_at: Timestamp,
    pub listener: Option<Arc<dyn RoutingListener>>,
}

/// FIFO of pending peers. Created lazily on first enqueue and discarded by
/// the owning registration when drained or emptied.
pub(crate) struct PendingQueue {
    entries: VecDeque<PendingPeer>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, peer: PendingPeer) {
        self.entries.push_back(peer);
    }

    /// Take everything, oldest first.
    pub fn drain(&mut self) -> Vec<PendingPeer> {
        self.entries.drain(..).collect()
    }

    /// Remove and return entries older than the timeout.
    ///
    /// Wall time may have stepped backward since an entry was stamped; such
    /// entries are re-stamped to `now` instead of being treated as stale
    /// (unsigned age arithmetic would otherwise wrap and evict them on the
    /// spot).
    pub fn evict_stale(&mut self, now: Timestamp) -> Vec<PendingPeer> {
        let mut evicted = Vec::new();
        let mut index = 0;
        while index < self.entries.len() {
            let entry = &mut self.entries[index];
            if entry.enqueued_at > now {
                entry.enqueued_at = now;
                index += 1;
            } else if now - entry.enqueued_at > PENDING_TIMEOUT_MS {
                if let Some(peer) = self.entries.remove(index) {
                    evicted.push(peer);
                }
            } else {
                index += 1;
            }
        }
        evicted
    }
}
