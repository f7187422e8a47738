//! # murmur-audio
//!
//! Audio engine for Murmur.
//!
//! Features:
//! - [`AudioBackend`]: the engine surface the scheduler is written against
//! - Whole-file symphonia decoding, resampled to the device rate
//! - Software mixer with a fixed channel table and channel stealing
//! - Lock-free sample queue feeding a cpal output stream

pub mod backend;
pub mod buffer;
pub mod decode;
pub mod engine;
pub mod mixer;
pub mod output;
pub mod resample;

pub use backend::{AudioBackend, ChannelError, ChannelResult, ChannelResultExt};
pub use engine::MixerEngine;
pub use output::OutputConfig;
