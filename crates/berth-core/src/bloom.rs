//! Add-only Bloom filter.
//!
//! Backs the per-swarm known-seed set: entries are only ever added, the
//! filter never resizes, and false positives are acceptable (a wrongly
//! suppressed reconnect costs one peer slot, nothing more).

const BITS_PER_ENTRY: usize = 10;
const HASH_COUNT: usize = 4;

/// Fixed-size probabilistic membership set.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    bit_count: usize,
    entries: usize,
}

impl BloomFilter {
    /// Size the filter for roughly `expected` entries at ~10 bits each.
    pub fn with_capacity(expected: usize) -> Self {
        let bit_count = (expected.max(1) * BITS_PER_ENTRY).next_multiple_of(64);
        Self {
            bits: vec![0u64; bit_count / 64],
            bit_count,
            entries: 0,
        }
    }

    pub fn insert(&mut self, key: &[u8]) {
        for index in self.bit_indexes(key) {
            self.bits[index / 64] |= 1u64 << (index % 64);
        }
        self.entries += 1;
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.bit_indexes(key)
            .iter()
            .all(|&index| self.bits[index / 64] & (1u64 << (index % 64)) != 0)
    }

    /// Number of `insert` calls, double-adds included.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    fn bit_indexes(&self, key: &[u8]) -> [usize; HASH_COUNT] {
        let digest = blake3::hash(key);
        let bytes = digest.as_bytes();
        let mut indexes = [0usize; HASH_COUNT];
        for (i, index) in indexes.iter_mut().enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            *index = (u64::from_le_bytes(word) % self.bit_count as u64) as usize;
        }
        indexes
    }
}
