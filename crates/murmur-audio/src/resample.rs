//! Converting decoded sounds to the output stream format.

use murmur_core::{Error, Result};
use rubato::{FftFixedIn, Resampler as RubatoResampler};
use tracing::debug;

use crate::decode::DecodedAudio;

/// Input frames per resampler call.
const CHUNK_FRAMES: usize = 1024;

/// Whole-buffer sample rate converter.
pub struct Resampler {
    inner: FftFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
}

impl Resampler {
    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> Result<Self> {
        let inner = FftFixedIn::new(
            input_rate as usize,
            output_rate as usize,
            CHUNK_FRAMES,
            2,
            channels,
        )
        .map_err(|e| Error::Engine(format!("Failed to create resampler: {e}")))?;

        debug!(
            "Resampler created: {}Hz -> {}Hz, {} channels",
            input_rate, output_rate, channels
        );

        Ok(Self {
            inner,
            input_rate,
            output_rate,
            channels,
        })
    }

    /// Resample a complete interleaved buffer.
    ///
    /// The output is aligned with the input: the resampler's own delay is
    /// cut from the front and its buffered tail is flushed out, so the
    /// result holds exactly `frames * output_rate / input_rate` frames.
    pub fn process_all(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let planes = deinterleave(input, self.channels);
        let in_frames = planes.first().map_or(0, Vec::len);
        let expected = (in_frames as u64 * u64::from(self.output_rate)
            / u64::from(self.input_rate)) as usize;
        let delay = self.inner.output_delay();

        let mut out_planes: Vec<Vec<f32>> =
            vec![Vec::with_capacity(expected + delay); self.channels];
        let mut start = 0;

        while start < in_frames {
            let end = (start + CHUNK_FRAMES).min(in_frames);
            let chunk: Vec<&[f32]> = planes.iter().map(|plane| &plane[start..end]).collect();

            let resampled = if end - start == CHUNK_FRAMES {
                self.inner.process(&chunk, None)
            } else {
                self.inner.process_partial(Some(chunk.as_slice()), None)
            }
            .map_err(|e| Error::Engine(format!("Resample failed: {e}")))?;

            append(&mut out_planes, resampled);
            start = end;
        }

        // Whatever is still inside the filter comes out on empty input.
        while out_planes.first().map_or(0, Vec::len) < expected + delay {
            let flushed = self
                .inner
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| Error::Engine(format!("Resample flush failed: {e}")))?;
            if flushed.first().map_or(true, Vec::is_empty) {
                break;
            }
            append(&mut out_planes, flushed);
        }

        for plane in &mut out_planes {
            plane.drain(..delay.min(plane.len()));
            plane.resize(expected, 0.0);
        }

        Ok(interleave(&out_planes))
    }
}

/// Bring a decoded sound to `rate` and `channels`, returning interleaved
/// samples.
pub fn conform(audio: DecodedAudio, rate: u32, channels: u16) -> Result<Vec<f32>> {
    let remixed = remix(audio.samples, audio.channels, channels);

    if audio.sample_rate == rate {
        return Ok(remixed);
    }

    Resampler::new(audio.sample_rate, rate, usize::from(channels))?.process_all(&remixed)
}

/// Change the channel count of an interleaved buffer.
///
/// Mono is copied to every output channel; folding down to mono averages;
/// anything else maps output channel `n` to input channel `n % from`.
pub fn remix(samples: Vec<f32>, from: u16, to: u16) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples;
    }

    let from = usize::from(from);
    let to = usize::from(to);

    samples
        .chunks_exact(from)
        .flat_map(|frame| {
            let mixed: Vec<f32> = if to == 1 {
                vec![frame.iter().sum::<f32>() / from as f32]
            } else {
                (0..to).map(|ch| frame[ch % from]).collect()
            };
            mixed
        })
        .collect()
}

fn append(out: &mut [Vec<f32>], planes: Vec<Vec<f32>>) {
    for (out, plane) in out.iter_mut().zip(planes) {
        out.extend(plane);
    }
}

fn deinterleave(input: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let mut planes = vec![Vec::with_capacity(input.len() / channels.max(1)); channels];
    for frame in input.chunks_exact(channels) {
        for (plane, sample) in planes.iter_mut().zip(frame) {
            plane.push(*sample);
        }
    }
    planes
}

fn interleave(planes: &[Vec<f32>]) -> Vec<f32> {
    let frames = planes.first().map_or(0, Vec::len);
    let mut output = Vec::with_capacity(frames * planes.len());
    for frame in 0..frames {
        for plane in planes {
            output.push(plane[frame]);
        }
    }
    output
}
