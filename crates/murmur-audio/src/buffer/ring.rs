//! Single-producer, single-consumer sample queue.
//!
//! The mixer (on the scheduler thread) pushes interleaved samples and the
//! cpal callback pops them. Samples are stored as `f32` bit patterns in
//! atomics so neither side ever blocks or needs `unsafe`.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Lock-free SPSC queue of `f32` samples.
pub struct SampleQueue {
    slots: Box<[AtomicU32]>,
    /// Total samples ever popped.
    head: AtomicUsize,
    /// Total samples ever pushed.
    tail: AtomicUsize,
    /// Power of two.
    capacity: usize,
}

impl SampleQueue {
    /// Create a queue holding at least `capacity` samples.
    ///
    /// The capacity is rounded up to the next power of two.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        let slots = (0..capacity).map(|_| AtomicU32::new(0)).collect();

        Self {
            slots,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            capacity,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples waiting to be popped.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Room left for pushing.
    pub fn free(&self) -> usize {
        self.capacity - self.len()
    }

    /// Push as many samples as fit. Producer side only.
    pub fn push(&self, samples: &[f32]) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        let count = samples.len().min(self.capacity - tail.wrapping_sub(head));

        for (offset, sample) in samples[..count].iter().enumerate() {
            let slot = tail.wrapping_add(offset) & (self.capacity - 1);
            self.slots[slot].store(sample.to_bits(), Ordering::Relaxed);
        }

        self.tail.store(tail.wrapping_add(count), Ordering::Release);
        count
    }

    /// Pop up to `out.len()` samples. Consumer side only.
    pub fn pop(&self, out: &mut [f32]) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let count = out.len().min(tail.wrapping_sub(head));

        for (offset, sample) in out[..count].iter_mut().enumerate() {
            let slot = head.wrapping_add(offset) & (self.capacity - 1);
            *sample = f32::from_bits(self.slots[slot].load(Ordering::Relaxed));
        }

        self.head.store(head.wrapping_add(count), Ordering::Release);
        count
    }

    /// Drop everything queued. Consumer side only.
    pub fn clear(&self) {
        let tail = self.tail.load(Ordering::Acquire);
        self.head.store(tail, Ordering::Release);
    }
}

/// Queue shared between the mixer and the output stream.
pub type SharedSampleQueue = Arc<SampleQueue>;

/// Create a new shared sample queue.
pub fn sample_queue(capacity: usize) -> SharedSampleQueue {
    Arc::new(SampleQueue::new(capacity))
}
