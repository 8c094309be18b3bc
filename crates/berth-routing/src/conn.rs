//! The transport-layer boundary.
//!
//! The engine never touches sockets. The transport layer hands it
//! unclassified connections behind `InboundConnection`, asks it to classify
//! leading bytes through `ByteMatcher`, and accepts handshake secret
//! material through `SecretSink`. All three are defined here so a transport
//! implementation depends on this crate, not the other way around.

use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;

use berth_core::{PeerAddr, TransportKind};

use crate::controller::{PeerTransport, SessionController};
use crate::matcher::MatchOutcome;

/// A freshly accepted connection that has not been routed yet.
///
/// `close` is terminal and idempotent; the reason string ends up in peer
/// logs, so the engine uses stable, human-readable phrases.
pub trait InboundConnection: Send {
    /// The notional remote address. May be an unresolved overlay hostname.
    fn remote_addr(&self) -> PeerAddr;

    fn transport_kind(&self) -> TransportKind;

    /// True when the peer sits on the local subnet.
    fn is_lan_local(&self) -> bool {
        false
    }

    /// Callback attached upstream, invoked once the owning controller is
    /// known. Used by callers that route manually and want the controller.
    fn routed_callback(&self) -> Option<Arc<dyn RoutedCallback>> {
        None
    }

    fn close(&self, reason: &str);

    /// Short form for log lines.
    fn describe(&self) -> String {
        self.remote_addr().to_string()
    }
}

/// Pre-attached notification that a connection reached its controller.
pub trait RoutedCallback: Send + Sync {
    fn invoke(&self, controller: &Arc<dyn SessionController>) -> Result<()>;
}

/// Caller-supplied veto on the constructed transport.
///
/// Consulted after the peer transport is built but before it is started.
/// `Ok(false)` or an error stops the routing; the transport is closed and
/// never started.
pub trait RoutingListener: Send + Sync {
    fn routed(&self, transport: &mut dyn PeerTransport) -> Result<bool>;
}

/// Classifies the leading bytes of an unrouted connection.
///
/// The transport layer buffers at least `min_bytes` before consulting
/// `match_prefix`, and up to `max_bytes` before a `match_full` verdict is
/// final. On an admission denial `match_full` closes the connection itself
/// and reports `NoMatch`, leaving nothing for the caller to clean up.
pub trait ByteMatcher: Send + Sync {
    /// Bytes needed before `match_prefix` is meaningful.
    fn min_bytes(&self) -> usize;

    /// Bytes needed for a definitive `match_full` verdict.
    fn max_bytes(&self) -> usize;

    /// Restrict matching to connections accepted on one local port.
    /// `None` matches on any port.
    fn specific_port(&self) -> Option<u16> {
        None
    }

    /// Cheap protocol-recognition test on the first `min_bytes`.
    fn match_prefix(&self, bytes: &[u8]) -> bool;

    /// Full classification. `bytes` holds everything buffered so far.
    fn match_full(&self, conn: &dyn InboundConnection, bytes: &[u8]) -> MatchOutcome;
}

/// Where per-swarm handshake secret material is installed.
///
/// Called with the directory lock held: implementations must not call back
/// into the registry.
pub trait SecretSink: Send + Sync {
    fn add_secrets(&self, secrets: &[Bytes]);
    fn remove_secrets(&self, secrets: &[Bytes]);
}
