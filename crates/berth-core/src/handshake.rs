//! Read-only view of the BitTorrent handshake prefix.
//!
//! berth consumes this format, it does not define it: the first 48 bytes of
//! an inbound peer stream are a 20-byte protocol header (length-prefixed
//! protocol name), 8 reserved/extension bytes, and the 20-byte info hash.
//! The engine needs the first 20 bytes to recognize the protocol and all 48
//! to identify the swarm; the remainder of the handshake message is the
//! transport layer's business.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::hash::InfoHash;

/// Length-prefixed protocol name: 0x13 followed by "BitTorrent protocol".
pub const PROTOCOL_HEADER: [u8; HEADER_LEN] = *b"\x13BitTorrent protocol";

/// Bytes needed to recognize the protocol.
pub const HEADER_LEN: usize = 20;

/// Bytes needed to identify the swarm.
pub const PREFIX_LEN: usize = 48;

/// Offset of the info hash within the prefix.
pub const HASH_OFFSET: usize = 28;

/// The leading 48 bytes of a peer handshake.
///
/// Wire size: 48 bytes. The reserved block carries extension flags that the
/// routing engine ignores.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct HandshakePrefix {
    /// Must equal `PROTOCOL_HEADER` for the stream to be ours.
    pub header: [u8; 20],
    /// Extension flag bits. Not interpreted here.
    pub reserved: [u8; 8],
    /// The swarm's info hash, at offset 28.
    pub info_hash: [u8; 20],
}

// Compile-time layout guard.
assert_eq_size!(HandshakePrefix, [u8; PREFIX_LEN]);

/// Do the leading bytes carry the BitTorrent protocol header?
/// False when fewer than 20 bytes are available.
pub fn header_matches(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && bytes[..HEADER_LEN] == PROTOCOL_HEADER
}

/// Pull the info hash out of a handshake prefix.
/// Returns `None` if the header does not match or fewer than 48 bytes are
/// available.
pub fn extract_info_hash(bytes: &[u8]) -> Option<InfoHash> {
    if !header_matches(bytes) {
        return None;
    }
    let prefix = HandshakePrefix::read_from_prefix(bytes)?;
    Some(InfoHash::from(prefix.info_hash))
}
