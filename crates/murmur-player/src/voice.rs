//! When the next voice interjection fires.

use std::time::{Duration, Instant};

use crate::random::RandomSource;

/// Absolute time of the next voice interjection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceSchedule {
    next: Instant,
}

impl VoiceSchedule {
    /// First interjection at `now + base + random(jitter)`.
    pub fn new<R: RandomSource + ?Sized>(
        now: Instant,
        base: Duration,
        jitter: Duration,
        rng: &mut R,
    ) -> Self {
        Self {
            next: now + base + rng.offset(jitter),
        }
    }

    pub const fn next(&self) -> Instant {
        self.next
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    /// Push the next interjection to `now + base + random(jitter)`.
    pub fn reschedule<R: RandomSource + ?Sized>(
        &mut self,
        now: Instant,
        base: Duration,
        jitter: Duration,
        rng: &mut R,
    ) {
        self.next = now + base + rng.offset(jitter);
    }
}
