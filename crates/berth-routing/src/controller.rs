//! The session side of a routed connection.
//!
//! Once a swarm is active it exposes a `SessionController`; the engine
//! builds a `PeerTransport` per admitted connection through the injected
//! `TransportFactory` and hands it over. Everything past that handoff,
//! starting with the peer-wire protocol itself, is the controller's world.

use std::sync::Arc;

use berth_core::{NetworkClass, PeerAddr, PeerSource};

use crate::conn::InboundConnection;

/// The live session for an activated swarm.
pub trait SessionController: Send + Sync {
    fn display_name(&self) -> String;

    /// Is this network category enabled for the swarm?
    fn is_network_enabled(&self, class: NetworkClass) -> bool;

    /// Does the swarm already hold a peer connected from this host?
    /// Keyed on the host string, port excluded.
    fn has_peer_from(&self, host: &str) -> bool;

    /// Take ownership of a started transport.
    fn add_peer_transport(&self, transport: Box<dyn PeerTransport>);

    /// Current peer totals, consumed for reporting only.
    fn peer_counts(&self) -> PeerCounts;
}

/// Peer totals for one controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerCounts {
    pub peers: usize,
    pub snubbed: usize,
    pub stalled_pending_load: usize,
}

/// Coarse transport lifecycle, as visible to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Constructed, not yet started.
    Pending,
    /// Started and transferring.
    Running,
    /// Shutting down. The last state an observer sees.
    Closing,
}

/// State-change notifications from a transport.
pub trait TransportObserver: Send + Sync {
    fn on_state(&self, transport: &dyn PeerTransport, state: TransportState);
}

/// A peer connection wrapped for a specific controller.
pub trait PeerTransport: Send {
    fn remote_addr(&self) -> PeerAddr;

    fn start(&mut self);

    fn close(&mut self, reason: &str);

    /// Has the remote identified itself as a seed?
    fn is_seed(&self) -> bool;

    fn add_observer(&mut self, observer: Arc<dyn TransportObserver>);
}

/// Builds transports for admitted connections.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        controller: Arc<dyn SessionController>,
        source: PeerSource,
        conn: Box<dyn InboundConnection>,
    ) -> Box<dyn PeerTransport>;
}
