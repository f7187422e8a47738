//! Software mixer with a fixed table of playback channels.
//!
//! The mixer runs on the caller's thread: `MixerEngine::update` asks it for
//! a block of frames and pushes the result into the output queue. Channel
//! handles carry a generation so a caller holding a handle to a slot that
//! has since been reused gets told so instead of steering someone else's
//! sound.

use std::sync::Arc;

use murmur_core::{ChannelId, SoundId};
use tracing::{debug, trace};

use crate::backend::{ChannelError, ChannelResult};

/// Samples above this magnitude go through `tanh` soft clipping.
const SOFT_CLIP_THRESHOLD: f32 = 0.9;

/// A decoded sound in the mixer's output format.
#[derive(Debug, Clone)]
pub struct Sound {
    /// Interleaved samples at the mixer's rate and channel count.
    pub samples: Arc<[f32]>,
    pub frames: usize,
    pub length_ms: u32,
}

#[derive(Debug)]
struct Voice {
    sound: SoundId,
    samples: Arc<[f32]>,
    frames: usize,
    /// Next frame to mix.
    cursor: usize,
    volume: f32,
    paused: bool,
    /// Start order, for picking a steal victim.
    serial: u64,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    /// Generation whose occupant was evicted to make room.
    last_stolen: Option<u32>,
    voice: Option<Voice>,
}

/// Fixed-size channel table and mixing loop.
pub struct Mixer {
    sample_rate: u32,
    channels: u16,
    slots: Vec<Slot>,
    next_serial: u64,
}

impl Mixer {
    pub fn new(sample_rate: u32, channels: u16, max_channels: u32) -> Self {
        let slots = (0..max_channels.max(1)).map(|_| Slot::default()).collect();
        Self {
            sample_rate,
            channels: channels.max(1),
            slots,
            next_serial: 0,
        }
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Channels currently bound to a sound, paused or not.
    pub fn active_channels(&self) -> usize {
        self.slots.iter().filter(|s| s.voice.is_some()).count()
    }

    /// Bind `sound` to a channel.
    ///
    /// Takes a free slot if there is one. Otherwise the quietest channel is
    /// stolen, the oldest one winning ties.
    pub fn start(&mut self, id: SoundId, sound: &Sound, paused: bool) -> ChannelId {
        let index = match self.slots.iter().position(|s| s.voice.is_none()) {
            Some(index) => index,
            None => {
                let victim = self.steal_victim();
                let slot = &mut self.slots[victim];
                if let Some(voice) = &slot.voice {
                    debug!(
                        "Stealing channel {} from {} (volume {:.2})",
                        victim, voice.sound, voice.volume
                    );
                }
                slot.last_stolen = Some(slot.generation);
                victim
            }
        };

        let serial = self.next_serial;
        self.next_serial += 1;

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.voice = Some(Voice {
            sound: id,
            samples: Arc::clone(&sound.samples),
            frames: sound.frames,
            cursor: 0,
            volume: 1.0,
            paused,
            serial,
        });

        let channel = ChannelId::new(index as u32, slot.generation);
        trace!("Started {id} on {channel} (paused: {paused})");
        channel
    }

    fn steal_victim(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.voice.as_ref().map(|v| (i, v)))
            .min_by(|(_, a), (_, b)| {
                a.volume
                    .total_cmp(&b.volume)
                    .then_with(|| a.serial.cmp(&b.serial))
            })
            .map_or(0, |(i, _)| i)
    }

    /// Resolve a handle to its slot, or say why it no longer applies.
    fn slot(&self, channel: ChannelId) -> ChannelResult<&Slot> {
        let slot = self
            .slots
            .get(channel.index as usize)
            .ok_or(ChannelError::InvalidHandle)?;

        if slot.generation == channel.generation {
            Ok(slot)
        } else if slot.last_stolen == Some(channel.generation) {
            Err(ChannelError::Stolen)
        } else {
            Err(ChannelError::InvalidHandle)
        }
    }

    fn voice_mut(&mut self, channel: ChannelId) -> ChannelResult<&mut Voice> {
        self.slot(channel)?;
        self.slots[channel.index as usize]
            .voice
            .as_mut()
            .ok_or(ChannelError::InvalidHandle)
    }

    /// A finished channel whose slot has not been reused reports `false`.
    pub fn is_playing(&self, channel: ChannelId) -> ChannelResult<bool> {
        Ok(self.slot(channel)?.voice.is_some())
    }

    pub fn position_ms(&self, channel: ChannelId) -> ChannelResult<u32> {
        let voice = self
            .slot(channel)?
            .voice
            .as_ref()
            .ok_or(ChannelError::InvalidHandle)?;
        Ok(self.frames_to_ms(voice.cursor))
    }

    pub fn set_position_ms(&mut self, channel: ChannelId, position_ms: u32) -> ChannelResult<()> {
        let frame = u64::from(position_ms) * u64::from(self.sample_rate) / 1000;
        let voice = self.voice_mut(channel)?;
        voice.cursor = (frame as usize).min(voice.frames);
        Ok(())
    }

    pub fn set_volume(&mut self, channel: ChannelId, volume: f32) -> ChannelResult<()> {
        self.voice_mut(channel)?.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn volume(&self, channel: ChannelId) -> ChannelResult<f32> {
        self.slot(channel)?
            .voice
            .as_ref()
            .map(|v| v.volume)
            .ok_or(ChannelError::InvalidHandle)
    }

    pub fn set_paused(&mut self, channel: ChannelId, paused: bool) -> ChannelResult<()> {
        self.voice_mut(channel)?.paused = paused;
        Ok(())
    }

    /// Stop every channel still bound to `sound`.
    pub fn stop_sound(&mut self, sound: SoundId) {
        for slot in &mut self.slots {
            if slot.voice.as_ref().is_some_and(|v| v.sound == sound) {
                slot.voice = None;
            }
        }
    }

    pub fn stop_all(&mut self) {
        for slot in &mut self.slots {
            slot.voice = None;
        }
    }

    /// Mix into `out` (interleaved, length a multiple of the channel
    /// count), replacing its contents.
    pub fn mix(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let channels = usize::from(self.channels);
        let out_frames = out.len() / channels;

        for slot in &mut self.slots {
            let Some(voice) = &mut slot.voice else {
                continue;
            };
            if voice.paused {
                continue;
            }

            let frames = out_frames.min(voice.frames - voice.cursor);
            let src = &voice.samples[voice.cursor * channels..(voice.cursor + frames) * channels];
            for (dst, sample) in out.iter_mut().zip(src) {
                *dst += sample * voice.volume;
            }

            voice.cursor += frames;
            if voice.cursor >= voice.frames {
                trace!("{} finished on slot generation {}", voice.sound, slot.generation);
                slot.voice = None;
            }
        }

        for sample in out.iter_mut() {
            if sample.abs() > SOFT_CLIP_THRESHOLD {
                *sample = sample.tanh();
            }
        }
    }

    fn frames_to_ms(&self, frames: usize) -> u32 {
        (frames as u64 * 1000 / u64::from(self.sample_rate.max(1))) as u32
    }
}
