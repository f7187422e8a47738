//! The audio engine surface the scheduler is written against.

use std::path::Path;

use murmur_core::{ChannelId, Error, Result, SoundId};
use thiserror::Error;

/// Why a channel call did not go through.
///
/// `InvalidHandle` and `Stolen` both mean the channel is gone. Callers are
/// expected to treat them like a channel that stopped playing; only
/// `Engine` is an actual failure.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("channel handle is no longer valid")]
    InvalidHandle,

    #[error("channel was stolen by another sound")]
    Stolen,

    #[error(transparent)]
    Engine(#[from] Error),
}

impl ChannelError {
    /// The channel no longer exists; not an engine failure.
    pub const fn is_lost(&self) -> bool {
        matches!(self, Self::InvalidHandle | Self::Stolen)
    }
}

/// Where a lost channel is not expected, it is an engine failure like any
/// other.
impl From<ChannelError> for Error {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Engine(e) => e,
            lost => Self::Engine(lost.to_string()),
        }
    }
}

/// Result of a call addressed to a channel.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

/// Collapse the "channel is gone" outcomes into `None`.
pub trait ChannelResultExt<T> {
    /// `Ok(Some(v))` on success, `Ok(None)` for a lost channel, `Err` for
    /// any other engine failure.
    fn tolerate_lost(self) -> Result<Option<T>>;
}

impl<T> ChannelResultExt<T> for ChannelResult<T> {
    fn tolerate_lost(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_lost() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Operations the player needs from an audio engine.
///
/// Every call is synchronous and cheap enough to run several times per
/// 10 ms tick.
pub trait AudioBackend {
    /// Decode a file into a playable sound.
    fn create_sound(&mut self, path: &Path) -> Result<SoundId>;

    /// Start `sound` on a fresh channel, optionally paused.
    fn play_sound(&mut self, sound: SoundId, paused: bool) -> Result<ChannelId>;

    fn is_playing(&self, channel: ChannelId) -> ChannelResult<bool>;

    /// Playback position in milliseconds.
    fn position_ms(&self, channel: ChannelId) -> ChannelResult<u32>;

    fn set_position_ms(&mut self, channel: ChannelId, position_ms: u32) -> ChannelResult<()>;

    /// Length of a sound in milliseconds.
    fn sound_length_ms(&self, sound: SoundId) -> Result<u32>;

    /// Set channel volume, clamped to `0.0..=1.0`.
    fn set_volume(&mut self, channel: ChannelId, volume: f32) -> ChannelResult<()>;

    fn set_paused(&mut self, channel: ChannelId, paused: bool) -> ChannelResult<()>;

    /// Advance the engine's mixing state. Call once per loop iteration.
    fn update(&mut self) -> Result<()>;

    fn release_sound(&mut self, sound: SoundId) -> Result<()>;

    /// Shut the engine down. Further calls may fail.
    fn close(&mut self) -> Result<()>;
}
