//! Audio decoding using symphonia.
//!
//! Sounds are short enough to decode fully up front, so there is no
//! streaming decoder: a file becomes one interleaved `f32` buffer.

use std::fs::File;
use std::path::Path;

use murmur_core::{Error, Result};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, warn};

/// A fully decoded file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Duration in whole milliseconds.
    pub fn length_ms(&self) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64 * 1000 / u64::from(self.sample_rate)) as u32
    }
}

/// Decode the first audio track of `path`.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .map_err(|e| Error::Decode(format!("Failed to open {}: {e}", path.display())))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let format_opts = FormatOptions {
        enable_gapless: true,
        ..Default::default()
    };

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("{}: failed to probe format: {e}", path.display())))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode(format!("{}: no audio tracks found", path.display())))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track.codec_params.channels.map_or(0, |c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("{}: failed to create decoder: {e}", path.display())))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(Error::Decode(format!(
                    "{}: failed to read packet: {e}",
                    path.display()
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("{}: skipping corrupt frame: {e}", path.display());
            }
            Err(e) => {
                return Err(Error::Decode(format!("{}: decode failed: {e}", path.display())));
            }
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(Error::Decode(format!(
            "{}: unknown sample rate or channel layout",
            path.display()
        )));
    }

    let audio = DecodedAudio {
        samples,
        sample_rate,
        channels,
    };

    debug!(
        "Decoded {}: {} Hz, {} channels, {} ms",
        path.display(),
        audio.sample_rate,
        audio.channels,
        audio.length_ms()
    );

    Ok(audio)
}
