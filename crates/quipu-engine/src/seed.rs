use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Derives stable per-purpose random streams from the master seed.
///
/// A stream is keyed by `(domain, table, purpose, logical_index)` where the
/// index is always a GLOBAL row or day index. Because the derivation is a
/// pure function of that tuple, output is independent of call order, batch
/// boundaries, and thread of execution. Distinct purpose tags never share a
/// stream, even at the same index.
#[derive(Debug, Clone, Copy)]
pub struct SeedDerivation {
    master: u64,
}

impl SeedDerivation {
    pub fn new(master: u64) -> Self {
        Self { master }
    }

    pub fn master(&self) -> u64 {
        self.master
    }

    /// Deterministic stream for one purpose at one global index.
    pub fn stream(&self, domain: &str, table: &str, purpose: &str, index: u64) -> ChaCha8Rng {
        let scope = hash_seed(self.master, &format!("{domain}.{table}:{purpose}"));
        ChaCha8Rng::seed_from_u64(mix_index(scope, index))
    }
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn mix_index(scope: u64, index: u64) -> u64 {
    let mut hash = scope ^ index.wrapping_mul(0x9e3779b97f4a7c15);
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^ (hash >> 29)
}
