//! # murmur-core
//!
//! Core types, configuration, and error handling for the Murmur ambient
//! soundscape player.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::{ChannelId, PoolKind, SoundId};
