//! Deterministic RNG hierarchy.
//!
//! A master seed generates a deterministic sub-seed for each instrument.
//! Sub-seeds are derived via BLAKE3 hashing, independently of thread
//! scheduling order, so Bernoulli fill draws are identical regardless of how
//! many instruments run concurrently or in which order they are processed.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for one instrument.
    pub fn sub_seed(&self, instrument: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(instrument.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Create a seeded StdRng for one instrument.
    pub fn rng_for(&self, instrument: &str) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(instrument))
    }
}
