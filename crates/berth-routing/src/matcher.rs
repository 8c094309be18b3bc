//! Handshake recognition for unclassified connections.
//!
//! The transport layer buffers leading bytes and asks twice: a cheap
//! header test once twenty bytes are in, a full verdict once the whole
//! forty-eight byte prefix is in. The full pass resolves the embedded hash
//! through the registry and applies activation admission before
//! confirming. On a denial the matcher closes the connection itself and
//! reports `NoMatch`; the caller never sees a half-admitted transport.

use std::fmt;
use std::sync::Arc;

use berth_core::handshake::{self, HEADER_LEN, PREFIX_LEN};

use crate::conn::{ByteMatcher, InboundConnection};
use crate::registration::{AdmitDecision, Registration};
use crate::registry::SwarmRegistry;

/// What the matcher made of the bytes seen so far.
pub enum MatchOutcome {
    /// Not this protocol, or this protocol but denied. The connection is
    /// left to whatever other matchers the transport layer runs.
    NoMatch,
    /// Header recognized; the rest of the prefix has not arrived yet.
    Partial,
    /// Identified and admitted.
    Matched(Arc<Registration>),
}

impl MatchOutcome {
    pub fn matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }
}

impl fmt::Debug for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOutcome::NoMatch => f.write_str("NoMatch"),
            MatchOutcome::Partial => f.write_str("Partial"),
            MatchOutcome::Matched(registration) => write!(f, "Matched({})", registration.hash()),
        }
    }
}

/// Recognizes the handshake prefix and resolves its swarm.
pub struct HandshakeMatcher {
    registry: SwarmRegistry,
}

impl HandshakeMatcher {
    pub fn new(registry: SwarmRegistry) -> Self {
        Self { registry }
    }
}

impl ByteMatcher for HandshakeMatcher {
    fn min_bytes(&self) -> usize {
        HEADER_LEN
    }

    fn max_bytes(&self) -> usize {
        PREFIX_LEN
    }

    fn match_prefix(&self, bytes: &[u8]) -> bool {
        handshake::header_matches(bytes)
    }

    fn match_full(&self, conn: &dyn InboundConnection, bytes: &[u8]) -> MatchOutcome {
        if !handshake::header_matches(bytes) {
            return MatchOutcome::NoMatch;
        }
        let hash = match handshake::extract_info_hash(bytes) {
            Some(hash) => hash,
            None => return MatchOutcome::Partial,
        };
        let registration = match self.registry.resolve(hash) {
            Some(registration) => registration,
            None => return MatchOutcome::NoMatch,
        };
        let remote = conn.remote_addr();
        match registration.admission(&remote) {
            AdmitDecision::Admitted => MatchOutcome::Matched(registration),
            AdmitDecision::KnownSeed => {
                conn.close("denied as known seed");
                MatchOutcome::NoMatch
            }
            AdmitDecision::Refused => {
                conn.close("denied by rules");
                MatchOutcome::NoMatch
            }
        }
    }
}
