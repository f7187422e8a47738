//! The crossfade and interjection state machine.
//!
//! One `Scheduler` owns all mutable playback state. The caller invokes
//! [`Scheduler::tick`] on a fixed cadence; a tick never sleeps. Within a
//! tick the engine is updated first, then the ambient pair is evaluated,
//! then the voice schedule.

use std::time::{Duration, Instant};

use murmur_audio::{AudioBackend, ChannelResultExt};
use murmur_core::{ChannelId, Config, Result, SoundId};
use tracing::{debug, info, trace, warn};

use crate::fade::{fade_volume, in_tail};
use crate::pool::{Pools, SoundAsset, SoundPool};
use crate::random::RandomSource;
use crate::voice::VoiceSchedule;

/// Timing parameters of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub fade_window_ms: u32,
    pub first_voice_base: Duration,
    pub first_voice_jitter: Duration,
    pub voice_base: Duration,
    pub voice_jitter: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SchedulerConfig {
    fn from(config: &Config) -> Self {
        let (first_voice_base, first_voice_jitter) = config.first_voice_delay();
        let (voice_base, voice_jitter) = config.voice_delay();
        Self {
            fade_window_ms: config.fade_window_ms,
            first_voice_base,
            first_voice_jitter,
            voice_base,
            voice_jitter,
        }
    }
}

/// A playback role bound to one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub channel: ChannelId,
    pub sound: SoundId,
    pub length_ms: u32,
}

impl Slot {
    fn new(channel: ChannelId, asset: &SoundAsset) -> Self {
        Self {
            channel,
            sound: asset.id,
            length_ms: asset.length_ms,
        }
    }
}

/// How many ambient tracks are in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossfadeState {
    Idle,
    SinglePlaying,
    Crossfading,
}

/// Liveness of a channel, checked afresh every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelProbe {
    Live { position_ms: u32 },
    Gone,
}

/// What happened to the ambient pair during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmbientStep {
    /// Primary playing outside its tail.
    Steady { volume: f32 },
    /// Primary entered its tail and a secondary was started.
    CrossfadeStarted { volume: f32 },
    /// Primary in its tail; the existing secondary was adjusted.
    Crossfading { volume: f32 },
    /// Primary stopped; the secondary took over.
    Promoted,
    /// Primary stopped with no secondary; a fresh track was started.
    Recovered,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub ambient: AmbientStep,
    /// Channel of the voice clip started this tick, if one fired.
    pub voice: Option<ChannelId>,
}

/// Crossfade/interjection scheduler.
pub struct Scheduler<R> {
    config: SchedulerConfig,
    rng: R,
    primary: Option<Slot>,
    secondary: Option<Slot>,
    voice: Option<VoiceSchedule>,
}

impl<R: RandomSource> Scheduler<R> {
    pub const fn new(config: SchedulerConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            primary: None,
            secondary: None,
            voice: None,
        }
    }

    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub const fn primary(&self) -> Option<Slot> {
        self.primary
    }

    pub const fn secondary(&self) -> Option<Slot> {
        self.secondary
    }

    pub fn next_voice(&self) -> Option<Instant> {
        self.voice.as_ref().map(VoiceSchedule::next)
    }

    pub const fn state(&self) -> CrossfadeState {
        match (self.primary, self.secondary) {
            (None, _) => CrossfadeState::Idle,
            (Some(_), None) => CrossfadeState::SinglePlaying,
            (Some(_), Some(_)) => CrossfadeState::Crossfading,
        }
    }

    /// Start the first ambient track and seed the voice schedule.
    ///
    /// The track starts paused and muted and is then unpaused, so the
    /// fade-in begins from silence without a click.
    pub fn start<E: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut E,
        pools: Pools<'_>,
        now: Instant,
    ) -> Result<()> {
        let asset = pools.ambient.pick(&mut self.rng);
        let channel = engine.play_sound(asset.id, true)?;
        engine.set_volume(channel, 0.0)?;
        engine.set_paused(channel, false)?;

        info!("Starting with {}", asset.path.display());
        self.primary = Some(Slot::new(channel, asset));
        self.secondary = None;
        self.seed_voice(now);
        Ok(())
    }

    fn seed_voice(&mut self, now: Instant) {
        let schedule = VoiceSchedule::new(
            now,
            self.config.first_voice_base,
            self.config.first_voice_jitter,
            &mut self.rng,
        );
        debug!("First voice in {:?}", schedule.next() - now);
        self.voice = Some(schedule);
    }

    /// Run one polling step.
    pub fn tick<E: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut E,
        pools: Pools<'_>,
        now: Instant,
    ) -> Result<TickOutcome> {
        engine.update()?;

        let ambient = match self.probe_primary(engine)? {
            ChannelProbe::Live { position_ms } => self.fade(engine, pools.ambient, position_ms)?,
            ChannelProbe::Gone => self.replace_primary(engine, pools.ambient)?,
        };

        let voice = self.interject(engine, pools.voice, now)?;

        Ok(TickOutcome { ambient, voice })
    }

    /// A channel that finished, was stolen, or whose handle went stale
    /// mid-tick is `Gone`. Only other engine failures are errors.
    fn probe_primary<E: AudioBackend + ?Sized>(&self, engine: &E) -> Result<ChannelProbe> {
        let Some(primary) = self.primary else {
            return Ok(ChannelProbe::Gone);
        };

        if engine.is_playing(primary.channel).tolerate_lost()? != Some(true) {
            return Ok(ChannelProbe::Gone);
        }

        Ok(match engine.position_ms(primary.channel).tolerate_lost()? {
            Some(position_ms) => ChannelProbe::Live { position_ms },
            None => ChannelProbe::Gone,
        })
    }

    fn fade<E: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut E,
        ambient: &SoundPool,
        position_ms: u32,
    ) -> Result<AmbientStep> {
        let Some(primary) = self.primary else {
            return self.replace_primary(engine, ambient);
        };
        let window = self.config.fade_window_ms;

        let volume = fade_volume(position_ms, primary.length_ms, window);
        trace!(
            "Primary at {position_ms}/{} ms, volume {volume:.3}",
            primary.length_ms
        );
        engine.set_volume(primary.channel, volume).tolerate_lost()?;

        if !in_tail(position_ms, primary.length_ms, window) {
            return Ok(AmbientStep::Steady { volume });
        }

        let partner = 1.0 - volume;
        if let Some(secondary) = self.secondary {
            engine.set_volume(secondary.channel, partner).tolerate_lost()?;
            return Ok(AmbientStep::Crossfading { volume });
        }

        let asset = ambient.pick(&mut self.rng);
        let channel = engine.play_sound(asset.id, true)?;
        engine.set_volume(channel, partner)?;
        engine.set_paused(channel, false)?;

        info!("Crossfading into {}", asset.path.display());
        self.secondary = Some(Slot::new(channel, asset));
        Ok(AmbientStep::CrossfadeStarted { volume })
    }

    fn replace_primary<E: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut E,
        ambient: &SoundPool,
    ) -> Result<AmbientStep> {
        if let Some(secondary) = self.secondary.take() {
            debug!("Promoting {} on {}", secondary.sound, secondary.channel);
            self.primary = Some(secondary);
            return Ok(AmbientStep::Promoted);
        }

        // Both ambient channels are gone. Voices are left alone.
        let asset = ambient.pick(&mut self.rng);
        let channel = engine.play_sound(asset.id, false)?;
        warn!(
            "All ambient channels stopped, restarting with {}",
            asset.path.display()
        );
        self.primary = Some(Slot::new(channel, asset));
        Ok(AmbientStep::Recovered)
    }

    fn interject<E: AudioBackend + ?Sized>(
        &mut self,
        engine: &mut E,
        voices: &SoundPool,
        now: Instant,
    ) -> Result<Option<ChannelId>> {
        if self.voice.is_none() {
            self.seed_voice(now);
        }
        let Some(schedule) = self.voice.as_mut() else {
            return Ok(None);
        };
        if !schedule.is_due(now) {
            return Ok(None);
        }

        schedule.reschedule(
            now,
            self.config.voice_base,
            self.config.voice_jitter,
            &mut self.rng,
        );

        let asset = voices.pick(&mut self.rng);
        let channel = engine.play_sound(asset.id, false)?;
        info!("Voice {} on {channel}", asset.path.display());
        Ok(Some(channel))
    }
}
