//! Explicit, seedable randomness for ids, seeds and version nonces.
//!
//! Every operation that needs fresh randomness takes a `&mut Random` so that
//! a whole restore or editing session can be replayed from a single seed.

use uuid::{Builder, Uuid};

/// Multiplier of the Park–Miller minimal standard generator.
const MULTIPLIER: u32 = 48271;

/// Mask keeping the low 31 bits.
const MASK_31: u32 = (1 << 31) - 1;

/// Park–Miller style generator.
#[derive(Debug, Clone)]
pub struct Random {
    seed: u32,
}

impl Random {
    /// Create a generator from a seed. A zero seed would get stuck at zero,
    /// so it is replaced with a mixed counter value.
    pub fn new(seed: u32) -> Self {
        let seed = if seed == 0 { fallback_seed() } else { seed };
        Self { seed }
    }

    /// Create a generator seeded from a process-wide counter.
    pub fn from_entropy() -> Self {
        Self::new(fallback_seed())
    }

    /// Reset the generator to a new seed.
    pub fn reseed(&mut self, seed: u32) {
        *self = Self::new(seed);
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        // Odd multiplier: a non-zero seed never wraps to zero.
        self.seed = self.seed.wrapping_mul(MULTIPLIER);
        (self.seed & MASK_31) as f64 / (1u64 << 31) as f64
    }

    /// Random integer in `[0, 2^31)`, used for seeds and version nonces.
    pub fn random_integer(&mut self) -> i64 {
        (self.next_f64() * (1u64 << 31) as f64).floor() as i64
    }

    /// Random element id. Ids follow the UUID v4 layout but are derived from
    /// this generator, so they are reproducible for a fixed seed.
    pub fn random_id(&mut self) -> String {
        let mut bytes = [0u8; 16];
        for chunk in bytes.chunks_mut(4) {
            let value = (self.next_f64() * u32::MAX as f64) as u32;
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        let uuid: Uuid = Builder::from_random_bytes(bytes).into_uuid();
        uuid.simple().to_string()
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Counter + hash mixing, so that unseeded generators still differ.
fn fallback_seed() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};

    static SEED_COUNTER: AtomicU32 = AtomicU32::new(1);

    let counter = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut x = counter.wrapping_mul(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    if x == 0 { 1 } else { x }
}
