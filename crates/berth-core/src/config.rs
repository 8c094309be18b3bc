//! Routing engine configuration.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $BERTH_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/berth/config.toml
//!   3. ~/.config/berth/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Knobs consulted on the routing path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Admit a second connection from a host that already has a peer on the
    /// same swarm. Off by default; loopback peers are always admitted.
    pub allow_same_ip_peers: bool,

    /// Restricted network mode: refuse non-LAN TCP connections.
    pub udp_only: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            allow_same_ip_peers: false,
            udp_only: false,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RoutingConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            RoutingConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("BERTH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply BERTH_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BERTH_ALLOW_SAME_IP_PEERS") {
            self.allow_same_ip_peers = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("BERTH_UDP_ONLY") {
            self.udp_only = v == "true" || v == "1";
        }
    }
}

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp"))
                .join(".config")
        })
        .join("berth")
}
