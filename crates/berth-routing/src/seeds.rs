//! Per-swarm record of addresses that completed as seeds.
//!
//! Reconnecting seeds would otherwise keep re-activating a finished
//! session. Keyed on the host without the port, since remote ports are
//! ephemeral and two sightings of one host must collide. The backing filter
//! is created on first use and only ever grows.

use berth_core::bloom::BloomFilter;
use berth_core::PeerAddr;

const EXPECTED_SEEDS: usize = 1024;

#[derive(Default)]
pub(crate) struct KnownSeeds {
    filter: Option<BloomFilter>,
}

impl KnownSeeds {
    pub fn record(&mut self, addr: &PeerAddr) {
        self.filter
            .get_or_insert_with(|| BloomFilter::with_capacity(EXPECTED_SEEDS))
            .insert(&addr.host_bytes());
    }

    pub fn contains(&self, addr: &PeerAddr) -> bool {
        match &self.filter {
            Some(filter) => filter.contains(&addr.host_bytes()),
            None => false,
        }
    }
}
