//! Handle types shared between the engine and the scheduler.

use std::fmt;

/// Opaque reference to a sound decoded by the audio engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub u32);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

/// Engine-assigned playback channel.
///
/// The engine may hand the same `index` to a new sound at any time; the
/// `generation` tells a stale handle apart from the current occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    pub index: u32,
    pub generation: u32,
}

impl ChannelId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}.{}", self.index, self.generation)
    }
}

/// Which pool a sound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Background tracks that crossfade into each other.
    Ambient,
    /// Short clips interjected on their own channels.
    Voice,
}

impl PoolKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
