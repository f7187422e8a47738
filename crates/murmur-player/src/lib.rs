//! # murmur-player
//!
//! Everything between the audio engine and the process: loading the sound
//! pools and the polling scheduler that crossfades ambient tracks and
//! interjects voice clips.
//!
//! The scheduler only talks to [`murmur_audio::AudioBackend`], so any
//! engine (including a scripted one in tests) can drive it.

pub mod fade;
pub mod fs;
pub mod pool;
pub mod random;
pub mod scheduler;
pub mod session;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

pub use fade::{fade_volume, in_tail};
pub use fs::{AssetSource, DirEntryInfo, LocalFs};
pub use pool::{Pools, SoundAsset, SoundPool};
pub use random::{RandomSource, SeededRandom};
pub use scheduler::{
    AmbientStep, ChannelProbe, CrossfadeState, Scheduler, SchedulerConfig, Slot, TickOutcome,
};
pub use session::Session;
pub use voice::VoiceSchedule;
