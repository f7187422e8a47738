//! The production audio engine: decode, mix, and feed the output device.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use murmur_core::{ChannelId, Error, Result, SoundId};
use tracing::{debug, info, trace, warn};

use crate::backend::{AudioBackend, ChannelResult};
use crate::buffer::{sample_queue, SharedSampleQueue};
use crate::decode::decode_file;
use crate::mixer::{Mixer, Sound};
use crate::output::{AudioOutput, OutputConfig};
use crate::resample::conform;

/// How far ahead of the device the mixer keeps the queue filled.
const TARGET_LATENCY_MS: u32 = 60;

/// Queue capacity, comfortably above the target fill.
const QUEUE_LATENCY_MS: u32 = 250;

/// Mixing engine implementing [`AudioBackend`].
///
/// All mixing happens inside [`AudioBackend::update`] on the caller's
/// thread; the cpal callback only drains the sample queue.
pub struct MixerEngine {
    mixer: Mixer,
    sounds: HashMap<SoundId, Sound>,
    next_sound: u32,
    queue: SharedSampleQueue,
    /// Samples the queue is topped up to on every update.
    target_fill: usize,
    scratch: Vec<f32>,
    output: Option<AudioOutput>,
    stream_errors: Option<Receiver<String>>,
    closed: bool,
}

impl MixerEngine {
    /// Open the default output device and build a mixer matching it.
    pub fn new(max_channels: u32) -> Result<Self> {
        let (error_tx, error_rx) = bounded(16);

        // The queue is sized before the device is known; assume a generous
        // layout and let the target fill follow the real one.
        let queue = sample_queue(samples_for(QUEUE_LATENCY_MS, 192_000, 8));
        let output = AudioOutput::new(Arc::clone(&queue), error_tx)?;

        info!(
            "Audio output initialized: {} Hz, {} channels, device: {}",
            output.sample_rate(),
            output.channels(),
            output.device_name()
        );

        let config = output.config().clone();
        let mut engine = Self::build(config, max_channels, queue);
        engine.output = Some(output);
        engine.stream_errors = Some(error_rx);
        Ok(engine)
    }

    /// An engine without a device. `update` mixes and throws the result
    /// away, which is enough to drive positions forward.
    pub fn headless(config: OutputConfig, max_channels: u32) -> Self {
        let capacity = samples_for(QUEUE_LATENCY_MS, config.sample_rate, config.channels);
        let queue = sample_queue(capacity);
        Self::build(config, max_channels, queue)
    }

    fn build(config: OutputConfig, max_channels: u32, queue: SharedSampleQueue) -> Self {
        let target_fill = samples_for(TARGET_LATENCY_MS, config.sample_rate, config.channels)
            .min(queue.capacity());

        Self {
            mixer: Mixer::new(config.sample_rate, config.channels, max_channels),
            sounds: HashMap::new(),
            next_sound: 0,
            queue,
            target_fill,
            scratch: Vec::new(),
            output: None,
            stream_errors: None,
            closed: false,
        }
    }

    pub const fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    pub const fn channels(&self) -> u16 {
        self.mixer.channels()
    }

    pub fn loaded_sounds(&self) -> usize {
        self.sounds.len()
    }

    pub fn volume(&self, channel: ChannelId) -> ChannelResult<f32> {
        self.mixer.volume(channel)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Engine("engine is closed".into()))
        } else {
            Ok(())
        }
    }

    fn check_stream(&self) -> Result<()> {
        let Some(errors) = &self.stream_errors else {
            return Ok(());
        };
        match errors.try_recv() {
            Ok(message) => Err(Error::AudioOutput(message)),
            Err(TryRecvError::Empty) => Ok(()),
            Err(TryRecvError::Disconnected) => {
                Err(Error::AudioOutput("output stream went away".into()))
            }
        }
    }
}

/// Interleaved sample count covering `ms` of audio.
const fn samples_for(ms: u32, sample_rate: u32, channels: u16) -> usize {
    (ms as usize * sample_rate as usize / 1000) * channels as usize
}

impl AudioBackend for MixerEngine {
    fn create_sound(&mut self, path: &Path) -> Result<SoundId> {
        self.ensure_open()?;

        let decoded = decode_file(path)?;
        let samples = conform(decoded, self.sample_rate(), self.channels())?;
        let frames = samples.len() / usize::from(self.channels());
        let length_ms = (frames as u64 * 1000 / u64::from(self.sample_rate())) as u32;

        let id = SoundId(self.next_sound);
        self.next_sound += 1;
        self.sounds.insert(
            id,
            Sound {
                samples: samples.into(),
                frames,
                length_ms,
            },
        );

        debug!("Created {id} from {} ({length_ms} ms)", path.display());
        Ok(id)
    }

    fn play_sound(&mut self, sound: SoundId, paused: bool) -> Result<ChannelId> {
        self.ensure_open()?;
        let data = self
            .sounds
            .get(&sound)
            .ok_or_else(|| Error::Engine(format!("unknown {sound}")))?;
        Ok(self.mixer.start(sound, data, paused))
    }

    fn is_playing(&self, channel: ChannelId) -> ChannelResult<bool> {
        self.ensure_open()?;
        self.mixer.is_playing(channel)
    }

    fn position_ms(&self, channel: ChannelId) -> ChannelResult<u32> {
        self.ensure_open()?;
        self.mixer.position_ms(channel)
    }

    fn set_position_ms(&mut self, channel: ChannelId, position_ms: u32) -> ChannelResult<()> {
        self.ensure_open()?;
        self.mixer.set_position_ms(channel, position_ms)
    }

    fn sound_length_ms(&self, sound: SoundId) -> Result<u32> {
        self.sounds
            .get(&sound)
            .map(|s| s.length_ms)
            .ok_or_else(|| Error::Engine(format!("unknown {sound}")))
    }

    fn set_volume(&mut self, channel: ChannelId, volume: f32) -> ChannelResult<()> {
        self.ensure_open()?;
        self.mixer.set_volume(channel, volume)
    }

    fn set_paused(&mut self, channel: ChannelId, paused: bool) -> ChannelResult<()> {
        self.ensure_open()?;
        self.mixer.set_paused(channel, paused)
    }

    fn update(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.check_stream()?;

        let channels = usize::from(self.channels());
        let wanted = self.target_fill.saturating_sub(self.queue.len());
        let wanted = wanted - wanted % channels;
        if wanted == 0 {
            return Ok(());
        }

        self.scratch.resize(wanted, 0.0);
        self.mixer.mix(&mut self.scratch);
        let pushed = self.queue.push(&self.scratch);
        trace!("Mixed {} samples, queued {pushed}", wanted);

        if self.output.is_none() {
            self.queue.clear();
        }
        Ok(())
    }

    fn release_sound(&mut self, sound: SoundId) -> Result<()> {
        self.mixer.stop_sound(sound);
        self.sounds
            .remove(&sound)
            .map(|_| ())
            .ok_or_else(|| Error::Engine(format!("release of unknown {sound}")))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        debug!("Stopping {} active channels", self.mixer.active_channels());
        self.mixer.stop_all();
        if !self.sounds.is_empty() {
            warn!("Closing engine with {} sounds still loaded", self.sounds.len());
            self.sounds.clear();
        }
        self.output = None;
        self.stream_errors = None;

        info!("Audio engine closed");
        Ok(())
    }
}
