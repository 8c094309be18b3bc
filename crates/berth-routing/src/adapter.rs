//! Per-swarm policy supplied by the session owner.

use bytes::Bytes;

use berth_core::{PeerAddr, PeerSource};

use crate::conn::InboundConnection;

/// One adapter per registration, set at registration time and never
/// replaced. Activation-policy calls arrive while the swarm is inactive and
/// may block briefly; the engine never holds a lock across them.
pub trait SessionAdapter: Send + Sync {
    /// Handshake secret material for this swarm, installed with the
    /// transport layer while any registration for the hash exists.
    fn secrets(&self) -> Vec<Bytes>;

    /// May a connection from this address trigger session activation?
    /// Consulted for inactive swarms only.
    fn activate_request(&self, remote: &PeerAddr) -> bool;

    /// A previously activated session looks idle-reconnected-to (a known
    /// seed came back); the owner may wind the session down.
    fn deactivate_request(&self, remote: &PeerAddr);

    fn peer_source_enabled(&self, source: PeerSource) -> bool;

    /// First claim on every fresh connection. Returning `None` takes
    /// ownership and ends routing; returning the connection back lets the
    /// normal path proceed.
    fn manual_route(&self, conn: Box<dyn InboundConnection>) -> Option<Box<dyn InboundConnection>>;

    /// Human-readable swarm description for log lines.
    fn description(&self) -> String;
}
