//! berth-routing — registration and routing of inbound peer connections.
//!
//! Many swarms share one listening surface. An inbound connection announces
//! which swarm it belongs to through its handshake prefix; the swarm's
//! session may not be fully set up when the connection arrives. This crate
//! owns the registry of swarms, the handshake matcher, the pending queue
//! with timeout eviction, the activation lifecycle, and the admission checks
//! run before a connection is handed to its session controller.
//!
//! Locking: one directory-wide mutex guards the hash and link maps, one
//! mutex per registration guards that swarm's local state. The directory
//! lock may be held while taking a registration lock, never the reverse.

pub mod adapter;
pub mod clock;
pub mod conn;
pub mod controller;
mod dispatch;
pub mod error;
pub mod matcher;
mod pending;
pub mod registration;
pub mod registry;
mod seeds;
pub mod sweep;

pub use adapter::SessionAdapter;
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use conn::{ByteMatcher, InboundConnection, RoutedCallback, RoutingListener, SecretSink};
pub use controller::{
    PeerCounts, PeerTransport, SessionController, TransportFactory, TransportObserver,
    TransportState,
};
pub use error::RegistryError;
pub use matcher::{HandshakeMatcher, MatchOutcome};
pub use registration::{LinkTarget, Registration};
pub use registry::{RoutingStats, SwarmRegistry};
pub use sweep::{SweepScheduler, SweepTarget};
