//! Where a peer connection came from.

use std::fmt;

/// Origin of a peer. Adapters enable or disable sources per swarm; the
/// routing engine itself only ever produces `Incoming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerSource {
    /// Unsolicited connection on the listening surface.
    Incoming,
    Tracker,
    Dht,
    PeerExchange,
    HolePunch,
    Plugin,
}

impl PeerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerSource::Incoming => "incoming",
            PeerSource::Tracker => "tracker",
            PeerSource::Dht => "dht",
            PeerSource::PeerExchange => "pex",
            PeerSource::HolePunch => "holepunch",
            PeerSource::Plugin => "plugin",
        }
    }
}

impl fmt::Display for PeerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
