//! Audio output using cpal.
//!
//! The device callback does no mixing. It drains whatever the engine has
//! queued and pads with silence when the queue runs dry.

use crate::buffer::{SampleQueue, SharedSampleQueue};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig,
};
use crossbeam_channel::Sender;
use murmur_core::{Error, Result};
use tracing::{debug, error, info, trace};

/// Layout the mixer renders in, taken from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

impl From<&StreamConfig> for OutputConfig {
    fn from(config: &StreamConfig) -> Self {
        Self {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        }
    }
}

/// Running output stream. Playback stops when this is dropped.
pub struct AudioOutput {
    _stream: Stream,
    config: OutputConfig,
    device_name: String,
}

impl AudioOutput {
    /// Open the default output device and start pulling from `queue`.
    ///
    /// Stream errors reported by cpal are forwarded on `errors`.
    pub fn new(queue: SharedSampleQueue, errors: Sender<String>) -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("no output device available".into()))?;

        Self::with_device(&device, queue, errors)
    }

    /// Open a specific device in its default configuration.
    pub fn with_device(
        device: &Device,
        queue: SharedSampleQueue,
        errors: Sender<String>,
    ) -> Result<Self> {
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".into());

        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("{device_name}: no default config: {e}")))?;
        debug!("{device_name} default config: {supported:?}");

        let format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();

        let stream = match format {
            SampleFormat::F32 => open_stream::<f32>(device, &stream_config, queue, errors),
            SampleFormat::I16 => open_stream::<i16>(device, &stream_config, queue, errors),
            SampleFormat::U16 => open_stream::<u16>(device, &stream_config, queue, errors),
            other => Err(Error::AudioOutput(format!(
                "{device_name}: sample format {other:?} is not supported"
            ))),
        }?;

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("{device_name}: stream did not start: {e}")))?;

        info!("Opened output device {device_name}");
        Ok(Self {
            _stream: stream,
            config: OutputConfig::from(&stream_config),
            device_name,
        })
    }

    pub const fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub const fn channels(&self) -> u16 {
        self.config.channels
    }
}

fn open_stream<T>(
    device: &Device,
    config: &StreamConfig,
    queue: SharedSampleQueue,
    errors: Sender<String>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch = Vec::new();

    let on_data = move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        let popped = render(&queue, &mut scratch, data);
        if popped < data.len() {
            trace!("Output underrun: {popped} of {} samples", data.len());
        }
    };

    let on_error = move |err: cpal::StreamError| {
        error!("Output stream error: {err}");
        // A full channel already holds an unreported failure.
        let _ = errors.try_send(err.to_string());
    };

    device
        .build_output_stream(config, on_data, on_error, None)
        .map_err(|e| Error::AudioOutput(format!("could not build output stream: {e}")))
}

/// Fill `data` from the queue, converting to the device format. Whatever
/// the queue cannot supply is silence. Returns the samples taken.
fn render<T>(queue: &SampleQueue, scratch: &mut Vec<f32>, data: &mut [T]) -> usize
where
    T: cpal::Sample + FromSample<f32>,
{
    scratch.resize(data.len(), 0.0);
    let popped = queue.pop(scratch);
    scratch[popped..].fill(0.0);

    for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
        *out = T::from_sample(sample);
    }
    popped
}
