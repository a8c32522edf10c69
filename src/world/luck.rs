//! Deterministic luck function
//!
//! Maps an arbitrary seed string to a float in [0, 1). Same string, same
//! float, on every platform and across restarts. Seed strings are built by
//! the callers (see `CellId::seed_key`) and their exact text matters.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use sha2::{Digest, Sha256};

/// Source of seed-stable randomness
pub trait Luck {
    /// Returns a value in [0, 1) that depends only on `key`
    fn luck(&self, key: &str) -> f64;
}

/// Default luck: SHA-256 of the key seeds a PCG32 stream, first sample wins
#[derive(Debug, Clone, Copy, Default)]
pub struct HashLuck;

impl HashLuck {
    /// Fold the key into a 64-bit RNG seed
    fn seed_for(key: &str) -> u64 {
        let digest = Sha256::digest(key.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl Luck for HashLuck {
    fn luck(&self, key: &str) -> f64 {
        let mut rng = Pcg32::seed_from_u64(Self::seed_for(key));
        rng.random::<f64>()
    }
}

/// Luck with hand-picked answers, for scripting scenarios
#[derive(Debug, Clone)]
pub struct TableLuck {
    table: HashMap<String, f64>,
    fallback: f64,
}

impl TableLuck {
    /// Every unlisted key answers `fallback`
    pub fn new(fallback: f64) -> Self {
        Self {
            table: HashMap::new(),
            fallback,
        }
    }

    /// Pin the answer for one key
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.table.insert(key.into(), value);
        self
    }
}

impl Luck for TableLuck {
    fn luck(&self, key: &str) -> f64 {
        self.table.get(key).copied().unwrap_or(self.fallback)
    }
}
