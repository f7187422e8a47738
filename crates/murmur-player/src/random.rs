//! Uniform random choices used by the scheduler.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Source of the scheduler's randomness.
pub trait RandomSource {
    /// Uniform index in `0..len`. `len` is never zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform offset strictly inside `(0, range)` at millisecond
    /// resolution. Ranges of 1 ms or less give zero.
    fn offset(&mut self, range: Duration) -> Duration;
}

/// `StdRng`-backed source, seeded once.
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Seed from the wall clock. Runs are not meant to be reproducible.
    pub fn from_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos() as u64);
        debug!("Random seed: {seed}");
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len.max(1))
    }

    fn offset(&mut self, range: Duration) -> Duration {
        let range_ms = range.as_millis() as u64;
        if range_ms < 2 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.gen_range(1..range_ms))
    }
}
