//! One registered swarm and its activation lifecycle.
//!
//! A registration exists from `SwarmRegistry::register` until `unregister`.
//! In between it is inactive (connections queue up) or active (connections
//! dispatch straight to the controller). Activation drains the queue in
//! arrival order; deactivation flushes it. The registration's own mutex
//! guards the controller slot, the pending queue, the known-seed set, and
//! the local link map; the directory lock is never taken while it is held.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use berth_core::{InfoHash, PeerAddr, PeerSource};

use crate::adapter::SessionAdapter;
use crate::clock::Timestamp;
use crate::conn::{InboundConnection, RoutingListener};
use crate::controller::SessionController;
use crate::dispatch;
use crate::error::RegistryError;
use crate::pending::{PendingPeer, PendingQueue, MAX_PENDING};
use crate::registry::{RegistryInner, RouterContext};
use crate::seeds::KnownSeeds;
use crate::sweep::SweepTarget;

/// Opaque session resource stored under a link name.
pub type LinkTarget = Arc<dyn Any + Send + Sync>;

/// A swarm known to the registry, active or not.
pub struct Registration {
    hash: InfoHash,
    adapter: Arc<dyn SessionAdapter>,
    ctx: Arc<RouterContext>,
    directory: Weak<RegistryInner>,
    me: Weak<Registration>,
    state: Mutex<RegState>,
}

#[derive(Default)]
struct RegState {
    controller: Option<Arc<dyn SessionController>>,
    pending: Option<PendingQueue>,
    known_seeds: KnownSeeds,
    links: HashMap<String, LinkTarget>,
}

/// Verdict of the activation-admission policy.
pub(crate) enum AdmitDecision {
    Admitted,
    KnownSeed,
    Refused,
}

/// What `route` decided under the lock, executed after releasing it.
enum RoutePlan {
    Dispatch(Arc<dyn SessionController>, Box<dyn InboundConnection>, Option<Arc<dyn RoutingListener>>),
    Queued { first: bool },
    Overflow(Box<dyn InboundConnection>),
}

impl Registration {
    pub(crate) fn new(
        hash: InfoHash,
        adapter: Arc<dyn SessionAdapter>,
        ctx: Arc<RouterContext>,
        directory: Weak<RegistryInner>,
        me: Weak<Registration>,
    ) -> Self {
        Self {
            hash,
            adapter,
            ctx,
            directory,
            me,
            state: Mutex::new(RegState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RegState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn hash(&self) -> InfoHash {
        self.hash
    }

    pub fn is_active(&self) -> bool {
        self.lock_state().controller.is_some()
    }

    /// Hex hash, controller name and adapter description, for log lines.
    pub fn description(&self) -> String {
        let control = match self.controller() {
            Some(controller) => controller.display_name(),
            None => "none".to_string(),
        };
        format!("{}, control={}: {}", self.hash, control, self.adapter.description())
    }

    // ── Activation lifecycle ──────────────────────────────────────────────────

    /// Bring the swarm live and replay every queued connection, oldest
    /// first. Activating an already active swarm is reported and the
    /// controller is replaced.
    pub fn activate(&self, controller: Arc<dyn SessionController>) {
        let drained = {
            let mut state = self.lock_state();
            if state.controller.is_some() {
                tracing::warn!(swarm = %self.hash, "activate called while already active");
            }
            state.controller = Some(controller.clone());
            state.pending.take().map(|mut queue| queue.drain())
        };
        if let Some(peers) = drained {
            for peer in peers {
                dispatch::dispatch(self, &controller, peer.conn, true, peer.listener);
            }
        }
    }

    /// Take the swarm offline. Anything still queued is closed.
    pub fn deactivate(&self) {
        let flushed = {
            let mut state = self.lock_state();
            if state.controller.take().is_none() {
                tracing::warn!(swarm = %self.hash, "deactivate called while not active");
            }
            state.pending.take().map(|mut queue| queue.drain())
        };
        if let Some(peers) = flushed {
            for peer in peers {
                tracing::warn!(
                    remote = %peer.conn.describe(),
                    "pending connection closed by deactivation"
                );
                peer.conn.close("deactivated");
            }
        }
    }

    /// Remove the swarm from the registry for good. Forces deactivation
    /// first when the caller forgot to.
    pub fn unregister(&self) {
        if self.is_active() {
            tracing::warn!(swarm = %self.hash, "unregister called while still active");
            self.deactivate();
        }
        if let (Some(directory), Some(me)) = (self.directory.upgrade(), self.me.upgrade()) {
            directory.unregister(&me);
        }
    }

    // ── Routing entry point ───────────────────────────────────────────────────

    /// Accept a matched connection: queue it while inactive, dispatch it
    /// while active. The adapter gets first claim via manual routing.
    pub fn route(
        &self,
        conn: Box<dyn InboundConnection>,
        listener: Option<Arc<dyn RoutingListener>>,
    ) {
        let conn = match self.adapter.manual_route(conn) {
            Some(conn) => conn,
            None => return,
        };

        if !self.adapter.peer_source_enabled(PeerSource::Incoming) {
            tracing::warn!(
                remote = %conn.describe(),
                swarm = %self.adapter.description(),
                "incoming connection dropped, peer source disabled"
            );
            conn.close("peer source disabled");
            return;
        }

        let plan = {
            let mut state = self.lock_state();
            match state.controller.clone() {
                Some(controller) => RoutePlan::Dispatch(controller, conn, listener),
                None => {
                    let queue = state.pending.get_or_insert_with(PendingQueue::new);
                    if queue.len() >= MAX_PENDING {
                        RoutePlan::Overflow(conn)
                    } else {
                        queue.push(PendingPeer {
                            conn,
                            enqueued_at: self.ctx.clock.now(),
                            listener,
                        });
                        RoutePlan::Queued {
                            first: queue.len() == 1,
                        }
                    }
                }
            }
        };

        match plan {
            RoutePlan::Dispatch(controller, conn, listener) => {
                dispatch::dispatch(self, &controller, conn, false, listener);
            }
            RoutePlan::Queued { first } => {
                // Outside the lock: the sweep thread calls back into this
                // registration while holding the scheduler's own lock.
                if first {
                    if let Some(me) = self.me.upgrade() {
                        self.ctx.scheduler.register(me);
                    }
                }
            }
            RoutePlan::Overflow(conn) => {
                tracing::warn!(
                    remote = %conn.describe(),
                    swarm = %self.adapter.description(),
                    "incoming connection dropped, too many pending activations"
                );
                conn.close("too many pending activations");
            }
        }
    }

    // ── Admission policy ──────────────────────────────────────────────────────

    /// May this remote trigger or join the swarm? Active swarms admit
    /// unconditionally; inactive swarms refuse known seeds, then defer to
    /// the adapter's activation policy. Denials are logged here.
    pub(crate) fn admission(&self, remote: &PeerAddr) -> AdmitDecision {
        let seed_hit = {
            let state = self.lock_state();
            if state.controller.is_some() {
                return AdmitDecision::Admitted;
            }
            state.known_seeds.contains(remote)
        };
        if seed_hit {
            tracing::info!(
                remote = %remote,
                swarm = %self.adapter.description(),
                "activation denied, remote is a known seed"
            );
            return AdmitDecision::KnownSeed;
        }
        if self.adapter.activate_request(remote) {
            AdmitDecision::Admitted
        } else {
            tracing::info!(
                remote = %remote,
                swarm = %self.adapter.description(),
                "activation denied by session rules"
            );
            AdmitDecision::Refused
        }
    }

    pub(crate) fn record_seed(&self, addr: &PeerAddr) {
        self.lock_state().known_seeds.record(addr);
    }

    // ── Links ─────────────────────────────────────────────────────────────────

    pub fn link(&self, name: &str) -> Option<LinkTarget> {
        self.lock_state().links.get(name).cloned()
    }

    /// Install an alternate lookup name for this swarm. Fails when the name
    /// is taken, by anyone, without touching either map.
    pub fn add_link(&self, name: &str, target: LinkTarget) -> Result<(), RegistryError> {
        let directory = self.directory.upgrade().ok_or(RegistryError::RegistryGone)?;
        let me = self.me.upgrade().ok_or(RegistryError::RegistryGone)?;
        directory.add_link(&me, name, target)
    }

    /// Drop a link name. Idempotent; a name owned by another registration
    /// is left alone.
    pub fn remove_link(&self, name: &str) {
        if let (Some(directory), Some(me)) = (self.directory.upgrade(), self.me.upgrade()) {
            directory.remove_link(&me, name);
        }
    }

    // Called by the directory with the directory lock held.
    pub(crate) fn store_link(&self, name: String, target: LinkTarget) {
        self.lock_state().links.insert(name, target);
    }

    pub(crate) fn forget_link(&self, name: &str) {
        self.lock_state().links.remove(name);
    }

    pub(crate) fn take_link_names(&self) -> Vec<String> {
        self.lock_state().links.drain().map(|(name, _)| name).collect()
    }

    // ── Internal accessors ────────────────────────────────────────────────────

    pub(crate) fn adapter(&self) -> &Arc<dyn SessionAdapter> {
        &self.adapter
    }

    pub(crate) fn ctx(&self) -> &Arc<RouterContext> {
        &self.ctx
    }

    pub(crate) fn controller(&self) -> Option<Arc<dyn SessionController>> {
        self.lock_state().controller.clone()
    }

    pub(crate) fn weak(&self) -> Weak<Registration> {
        self.me.clone()
    }
}

impl SweepTarget for Registration {
    /// Evict queued connections older than the pending timeout. Returns
    /// whether anything is still queued; `false` drops this registration
    /// from the scheduler.
    fn sweep(&self, now: Timestamp) -> bool {
        let (evicted, still_pending) = {
            let mut state = self.lock_state();
            let queue = match state.pending.as_mut() {
                Some(queue) => queue,
                None => return false,
            };
            let evicted = queue.evict_stale(now);
            if queue.is_empty() {
                state.pending = None;
            }
            (evicted, state.pending.is_some())
        };
        for peer in evicted {
            tracing::warn!(
                remote = %peer.conn.describe(),
                swarm = %self.adapter.description(),
                "pending connection closed by activation timeout"
            );
            peer.conn.close("activation timeout");
        }
        still_pending
    }
}
