//! The process-wide swarm directory.
//!
//! `SwarmRegistry` owns two maps: info hash to the registrations for that
//! hash, and link name to registration. A single mutex guards both; each
//! registration carries its own lock for per-swarm state. A hash normally
//! holds one registration, transiently two while a session is being
//! replaced; lookups pick the first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use berth_core::config::RoutingConfig;
use berth_core::{InfoHash, PeerAddr};

use crate::adapter::SessionAdapter;
use crate::clock::{Clock, SystemClock};
use crate::conn::{InboundConnection, RoutingListener, SecretSink};
use crate::controller::TransportFactory;
use crate::error::RegistryError;
use crate::matcher::HandshakeMatcher;
use crate::registration::{AdmitDecision, LinkTarget, Registration};
use crate::sweep::SweepScheduler;

/// Collaborators shared by every registration of one registry.
pub(crate) struct RouterContext {
    pub config: RoutingConfig,
    pub factory: Arc<dyn TransportFactory>,
    pub secrets: Arc<dyn SecretSink>,
    pub clock: Arc<dyn Clock>,
    pub scheduler: SweepScheduler,
}

/// Aggregate counts across all registrations, for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoutingStats {
    /// Registered session hashes.
    pub swarms: usize,
    /// Peers across all active controllers.
    pub peers: usize,
    pub snubbed: usize,
    pub stalled_pending_load: usize,
}

/// Handle to the directory. Cheap to clone; registrations keep only weak
/// back-references, so dropping the last handle ends the registry.
#[derive(Clone)]
pub struct SwarmRegistry {
    inner: Arc<RegistryInner>,
}

pub(crate) struct RegistryInner {
    ctx: Arc<RouterContext>,
    directory: Mutex<DirectoryState>,
}

#[derive(Default)]
struct DirectoryState {
    by_hash: HashMap<InfoHash, Vec<Arc<Registration>>>,
    by_link: HashMap<String, Arc<Registration>>,
}

impl SwarmRegistry {
    pub fn new(
        config: RoutingConfig,
        factory: Arc<dyn TransportFactory>,
        secrets: Arc<dyn SecretSink>,
    ) -> Self {
        Self::with_clock(config, factory, secrets, Arc::new(SystemClock))
    }

    /// As `new`, with an injected clock driving pending-entry timestamps
    /// and the sweep.
    pub fn with_clock(
        config: RoutingConfig,
        factory: Arc<dyn TransportFactory>,
        secrets: Arc<dyn SecretSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scheduler = SweepScheduler::new(clock.clone());
        Self::with_scheduler(config, factory, secrets, clock, scheduler)
    }

    /// Full injection, for tests that also control sweep timing.
    pub fn with_scheduler(
        config: RoutingConfig,
        factory: Arc<dyn TransportFactory>,
        secrets: Arc<dyn SecretSink>,
        clock: Arc<dyn Clock>,
        scheduler: SweepScheduler,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                ctx: Arc::new(RouterContext {
                    config,
                    factory,
                    secrets,
                    clock,
                    scheduler,
                }),
                directory: Mutex::new(DirectoryState::default()),
            }),
        }
    }

    /// Register a swarm under its hash. Never fails; a second registration
    /// for the same hash is legal and shows up while a session is being
    /// replaced. Only the first registration for a hash installs its
    /// handshake secrets with the transport layer.
    pub fn register(
        &self,
        hash: InfoHash,
        adapter: Arc<dyn SessionAdapter>,
    ) -> Arc<Registration> {
        let ctx = self.inner.ctx.clone();
        let directory = Arc::downgrade(&self.inner);
        let registration = Arc::new_cyclic(|me| {
            Registration::new(hash, adapter.clone(), ctx, directory, me.clone())
        });

        let mut dir = self.inner.lock_directory();
        let list = dir.by_hash.entry(hash).or_default();
        if list.is_empty() {
            self.inner.ctx.secrets.add_secrets(&adapter.secrets());
        }
        list.push(registration.clone());
        registration
    }

    /// First registration for a hash, if any.
    pub fn resolve(&self, hash: InfoHash) -> Option<Arc<Registration>> {
        let dir = self.inner.lock_directory();
        dir.by_hash.get(&hash).and_then(|list| list.first()).cloned()
    }

    pub fn resolve_link(&self, name: &str) -> Option<Arc<Registration>> {
        self.inner.lock_directory().by_link.get(name).cloned()
    }

    /// Hash lookup plus the same admission policy the byte matcher applies.
    /// No transport exists on this path, so a denial closes nothing.
    pub fn match_hash(&self, remote: &PeerAddr, hash: InfoHash) -> Option<Arc<Registration>> {
        let registration = self.resolve(hash)?;
        match registration.admission(remote) {
            AdmitDecision::Admitted => Some(registration),
            AdmitDecision::KnownSeed | AdmitDecision::Refused => None,
        }
    }

    /// Link-name variant of `match_hash`. The link resolves to its swarm's
    /// hash first, so the admission target is the first registration for
    /// that hash, exactly as on the hash path.
    pub fn match_link(&self, remote: &PeerAddr, link: &str) -> Option<Arc<Registration>> {
        let hash = self.resolve_link(link)?.hash();
        self.match_hash(remote, hash)
    }

    /// Manual routing entry for callers that resolved a registration out of
    /// band.
    pub fn route(
        &self,
        registration: &Registration,
        conn: Box<dyn InboundConnection>,
        listener: Option<Arc<dyn RoutingListener>>,
    ) {
        registration.route(conn, listener);
    }

    /// The matcher to hand to the transport layer.
    pub fn byte_matcher(&self) -> HandshakeMatcher {
        HandshakeMatcher::new(self.clone())
    }

    /// Counts for reporting. Registrations are snapshotted under the
    /// directory lock; controllers are queried after it is released.
    pub fn stats(&self) -> RoutingStats {
        let (swarms, registrations) = {
            let dir = self.inner.lock_directory();
            let all: Vec<Arc<Registration>> =
                dir.by_hash.values().flatten().cloned().collect();
            (dir.by_hash.len(), all)
        };
        let mut stats = RoutingStats {
            swarms,
            ..RoutingStats::default()
        };
        for registration in &registrations {
            if let Some(controller) = registration.controller() {
                let counts = controller.peer_counts();
                stats.peers += counts.peers;
                stats.snubbed += counts.snubbed;
                stats.stalled_pending_load += counts.stalled_pending_load;
            }
        }
        stats
    }
}

impl RegistryInner {
    fn lock_directory(&self) -> MutexGuard<'_, DirectoryState> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a link name. Nothing is touched when the name is taken,
    /// whoever holds it.
    pub(crate) fn add_link(
        &self,
        registration: &Arc<Registration>,
        name: &str,
        target: LinkTarget,
    ) -> Result<(), RegistryError> {
        let mut dir = self.lock_directory();
        if dir.by_link.contains_key(name) {
            return Err(RegistryError::DuplicateLink(name.to_string()));
        }
        dir.by_link.insert(name.to_string(), registration.clone());
        registration.store_link(name.to_string(), target);
        Ok(())
    }

    /// Remove a link name, both maps. Idempotent; a name that has moved to
    /// another registration is left in place.
    pub(crate) fn remove_link(&self, registration: &Arc<Registration>, name: &str) {
        let mut dir = self.lock_directory();
        let owned = dir
            .by_link
            .get(name)
            .is_some_and(|owner| Arc::ptr_eq(owner, registration));
        if owned {
            dir.by_link.remove(name);
        }
        registration.forget_link(name);
    }

    /// Drop a registration from both maps. The last registration for a
    /// hash uninstalls the swarm's handshake secrets.
    pub(crate) fn unregister(&self, registration: &Arc<Registration>) {
        let hash = registration.hash();
        let mut dir = self.lock_directory();

        let mut removed_last = false;
        match dir.by_hash.get_mut(&hash) {
            None => {
                tracing::warn!(swarm = %hash, "unregister for unknown swarm");
            }
            Some(list) => {
                let before = list.len();
                list.retain(|existing| !Arc::ptr_eq(existing, registration));
                if list.len() == before {
                    tracing::warn!(swarm = %hash, "unregister for unknown registration");
                } else {
                    removed_last = list.is_empty();
                }
            }
        }
        if removed_last {
            dir.by_hash.remove(&hash);
            self.ctx
                .secrets
                .remove_secrets(&registration.adapter().secrets());
        }

        for name in registration.take_link_names() {
            let owned = dir
                .by_link
                .get(&name)
                .is_some_and(|owner| Arc::ptr_eq(owner, registration));
            if owned {
                dir.by_link.remove(&name);
            }
        }
    }
}
