//! Error types for Murmur.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using Murmur's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Murmur.
///
/// Every variant is fatal to the process. Recoverable channel conditions
/// (a channel that finished or was stolen by the engine) are not errors and
/// live in `murmur_audio::ChannelError` instead.
#[derive(Error, Debug)]
pub enum Error {
    // Asset loading
    #[error("Sound directory does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Sound directory has no sound files: {}", .0.display())]
    EmptyPool(PathBuf),

    #[error("Audio decode error: {0}")]
    Decode(String),

    // Engine
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Audio engine error: {0}")]
    Engine(String),

    // Configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if this error can only come out of startup (asset
    /// loading or configuration).
    pub const fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::PathNotFound(_) | Self::EmptyPool(_) | Self::Decode(_) | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_startup() {
        assert!(Error::PathNotFound(PathBuf::from("./data/sound/")).is_startup());
        assert!(Error::EmptyPool(PathBuf::from("./data/voice/")).is_startup());
        assert!(Error::Decode("bad header".into()).is_startup());
        assert!(!Error::Engine("mixer gone".into()).is_startup());
    }

    #[test]
    fn test_error_display() {
        let err = Error::EmptyPool(PathBuf::from("data/voice"));
        assert_eq!(err.to_string(), "Sound directory has no sound files: data/voice");

        let err = Error::AudioOutput("No output device found".into());
        assert_eq!(err.to_string(), "Audio output error: No output device found");
    }
}
