//! Lock-free buffers shared with the output callback.

pub mod ring;

pub use ring::{sample_queue, SampleQueue, SharedSampleQueue};
