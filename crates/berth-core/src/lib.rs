//! berth-core — shared types for the berth connection-routing engine.
//! The routing crate and external collaborators depend on this one.

pub mod bloom;
pub mod config;
pub mod handshake;
pub mod hash;
pub mod net;
pub mod source;

pub use hash::InfoHash;
pub use net::{HostAddr, NetworkClass, PeerAddr, TransportKind};
pub use source::PeerSource;
