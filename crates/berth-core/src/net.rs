//! Peer addressing and network classification.
//!
//! A peer's notional address is not always an IP: overlay peers announce
//! hostnames like `xyz.onion` or `abc.i2p` that are never resolved locally.
//! `HostAddr` keeps both forms, and `NetworkClass` is derived from the host
//! suffix the same way throughout the engine.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

// ── Addresses ─────────────────────────────────────────────────────────────────

/// A remote host: a resolved IP or an overlay hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostAddr {
    Ip(IpAddr),
    Name(String),
}

/// The notional remote address of a peer connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    pub host: HostAddr,
    pub port: u16,
}

impl PeerAddr {
    pub fn new(host: HostAddr, port: u16) -> Self {
        Self { host, port }
    }

    pub fn from_ip(ip: IpAddr, port: u16) -> Self {
        Self::new(HostAddr::Ip(ip), port)
    }

    pub fn from_name(name: impl Into<String>, port: u16) -> Self {
        Self::new(HostAddr::Name(name.into()), port)
    }

    /// The host rendered without the port. Duplicate-peer checks key on this.
    pub fn host_string(&self) -> String {
        match &self.host {
            HostAddr::Ip(ip) => ip.to_string(),
            HostAddr::Name(name) => name.clone(),
        }
    }

    /// The host as bytes, port excluded. Known-seed sets key on this: remote
    /// ports are ephemeral, so two sightings of one host must collide.
    pub fn host_bytes(&self) -> Vec<u8> {
        self.host_string().into_bytes()
    }

    pub fn is_loopback(&self) -> bool {
        match &self.host {
            HostAddr::Ip(ip) => ip.is_loopback(),
            HostAddr::Name(name) => name == "localhost",
        }
    }

    /// Which network this peer belongs to, from the host suffix.
    pub fn network_class(&self) -> NetworkClass {
        match &self.host {
            HostAddr::Ip(_) => NetworkClass::Public,
            HostAddr::Name(name) => {
                let name = name.to_ascii_lowercase();
                if name.ends_with(".i2p") {
                    NetworkClass::I2p
                } else if name.ends_with(".onion") {
                    NetworkClass::Tor
                } else {
                    NetworkClass::Public
                }
            }
        }
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::from_ip(addr.ip(), addr.port())
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            HostAddr::Ip(IpAddr::V6(ip)) => write!(f, "[{}]:{}", ip, self.port),
            HostAddr::Ip(IpAddr::V4(ip)) => write!(f, "{}:{}", ip, self.port),
            HostAddr::Name(name) => write!(f, "{}:{}", name, self.port),
        }
    }
}

// ── Network classes ───────────────────────────────────────────────────────────

/// Network category of a peer address. Controllers enable these per swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkClass {
    Public,
    I2p,
    Tor,
}

impl fmt::Display for NetworkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NetworkClass::Public => "Public",
            NetworkClass::I2p => "I2P",
            NetworkClass::Tor => "Tor",
        })
    }
}

/// Underlying transport of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Udp,
}
