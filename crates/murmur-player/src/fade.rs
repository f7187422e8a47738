//! Fade volume as a function of playback position.
//!
//! All arithmetic is signed: for a track shorter than the fade window,
//! `length - window` is negative and the track is in its tail from the
//! start.

/// Volume for a channel at `position_ms` into a track of `length_ms`.
///
/// Ramps up over the first `window_ms`, down over the last `window_ms`,
/// and is 1 in between. The result is always within `0.0..=1.0`.
pub fn fade_volume(position_ms: u32, length_ms: u32, window_ms: u32) -> f32 {
    let window = f64::from(window_ms.max(1));
    let position = f64::from(position_ms);
    let length = f64::from(length_ms);

    let volume = if position < window {
        position / window
    } else if in_tail(position_ms, length_ms, window_ms) {
        (length - position) / window
    } else {
        1.0
    };

    volume.clamp(0.0, 1.0) as f32
}

/// True once the track has entered its last `window_ms`; this is where the
/// next track starts fading in.
pub fn in_tail(position_ms: u32, length_ms: u32, window_ms: u32) -> bool {
    i64::from(position_ms) > i64::from(length_ms) - i64::from(window_ms)
}
