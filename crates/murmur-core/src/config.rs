//! Process configuration.
//!
//! Nothing here is exposed as a command-line flag. Values come from an
//! optional JSON file and fall back to built-in defaults field by field.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{Error, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "MURMUR_CONFIG";

/// Runtime configuration for the player.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the ambient tracks.
    pub ambient_dir: PathBuf,
    /// Directory holding the voice clips.
    pub voice_dir: PathBuf,
    /// Length of the fade-in and fade-out ramps (and so of the crossfade).
    pub fade_window_ms: u32,
    /// Scheduler polling cadence.
    pub tick_interval_ms: u64,
    /// Fixed part of the delay before the first voice interjection.
    pub first_voice_base_ms: u64,
    /// Random part of the delay before the first voice interjection.
    pub first_voice_jitter_ms: u64,
    /// Fixed part of the delay between later interjections.
    pub voice_base_ms: u64,
    /// Random part of the delay between later interjections.
    pub voice_jitter_ms: u64,
    /// Number of simultaneous channels the engine mixes.
    pub max_channels: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ambient_dir: PathBuf::from("./data/sound/"),
            voice_dir: PathBuf::from("./data/voice/"),
            fade_window_ms: 2500,
            tick_interval_ms: 10,
            first_voice_base_ms: 10_000,
            first_voice_jitter_ms: 20_000,
            voice_base_ms: 15_000,
            voice_jitter_ms: 25_000,
            max_channels: 32,
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// Looks at `$MURMUR_CONFIG` first, then `config.json` in the platform
    /// config directory. Missing files mean defaults; a file that exists but
    /// does not parse is an error.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Platform config file location, if one can be determined.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "murmur").map(|d| d.config_dir().join("config.json"))
    }

    /// Load and validate a specific config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_json(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fade_window_ms == 0 {
            return Err(Error::Config("fade_window_ms must be positive".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be positive".into()));
        }
        if self.max_channels == 0 {
            return Err(Error::Config("max_channels must be positive".into()));
        }
        Ok(())
    }

    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub const fn first_voice_delay(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.first_voice_base_ms),
            Duration::from_millis(self.first_voice_jitter_ms),
        )
    }

    pub const fn voice_delay(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.voice_base_ms),
            Duration::from_millis(self.voice_jitter_ms),
        )
    }
}
