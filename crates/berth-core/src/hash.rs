//! Swarm identity — the 20-byte content hash carried in the handshake.

use std::fmt;

/// The hash identifying one swarm. Primary key throughout the engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash([u8; InfoHash::LEN]);

impl InfoHash {
    pub const LEN: usize = 20;

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Build from a slice. Returns `None` unless it is exactly 20 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; Self::LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

impl From<[u8; InfoHash::LEN]> for InfoHash {
    fn from(bytes: [u8; InfoHash::LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self)
    }
}
