//! loopr-ap configuration
//!
//! Loaded from TOML (see `loopr_common::config` for file resolution). Every
//! field has a compiled default, so an empty or missing file is valid.
//!
//! ```toml
//! [engine]
//! poll_interval_ms = 30
//! cache_capacity = 8
//! export_tempo = "stretched"
//!
//! [audio]
//! device = "USB Audio"
//!
//! [stretch]
//! program = "/usr/bin/soundstretch"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Worker poll interval while a section plays
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30;
/// How long `stop()` waits for the worker before giving up on it
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 1000;
/// How long a paused worker waits for resume/stop before exiting
pub const DEFAULT_PAUSE_WAIT_TIMEOUT_SECS: u64 = 600;
/// Added to a section's duration to detect a sink that never goes idle
pub const DEFAULT_SECTION_SAFETY_MARGIN_MS: u64 = 2000;
pub const DEFAULT_CACHE_CAPACITY: usize = 8;
pub const MIN_TEMPO_PERCENT: u16 = 50;
pub const MAX_TEMPO_PERCENT: u16 = 200;
pub const DEFAULT_OUTPUT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_STRETCH_TIMEOUT_SECS: u64 = 30;

/// Whether exported loop regions carry the current tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTempo {
    /// Export the region exactly as recorded
    Raw,
    /// Time-stretch the region to the current tempo before writing
    Stretched,
}

/// Playback engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub poll_interval_ms: u64,
    pub join_timeout_ms: u64,
    pub pause_wait_timeout_secs: u64,
    pub section_safety_margin_ms: u64,
    pub tempo_min: u16,
    pub tempo_max: u16,
    pub cache_capacity: usize,
    pub export_tempo: ExportTempo,
    /// Directory for exported loop regions
    pub output_dir: PathBuf,
    /// Tracks are resampled to this rate on load
    pub output_sample_rate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            pause_wait_timeout_secs: DEFAULT_PAUSE_WAIT_TIMEOUT_SECS,
            section_safety_margin_ms: DEFAULT_SECTION_SAFETY_MARGIN_MS,
            tempo_min: MIN_TEMPO_PERCENT,
            tempo_max: MAX_TEMPO_PERCENT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            export_tempo: ExportTempo::Stretched,
            output_dir: PathBuf::from("audio_files"),
            output_sample_rate: DEFAULT_OUTPUT_SAMPLE_RATE,
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn pause_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.pause_wait_timeout_secs)
    }

    pub fn section_safety_margin(&self) -> Duration {
        Duration::from_millis(self.section_safety_margin_ms)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be > 0".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config("cache_capacity must be > 0".to_string()));
        }
        if self.tempo_min < MIN_TEMPO_PERCENT
            || self.tempo_max > MAX_TEMPO_PERCENT
            || self.tempo_min > 100
            || self.tempo_max < 100
        {
            return Err(Error::Config(format!(
                "tempo range {}..={} must contain 100 and stay within {}..={}",
                self.tempo_min, self.tempo_max, MIN_TEMPO_PERCENT, MAX_TEMPO_PERCENT
            )));
        }
        if self.output_sample_rate == 0 {
            return Err(Error::Config("output_sample_rate must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Output device selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Device name (None = system default)
    pub device: Option<String>,
    /// Buffer size in frames (None = device default)
    pub buffer_size: Option<u32>,
    /// Use the silent sink instead of a device
    pub null_output: bool,
}

/// External time-stretch program
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StretchConfig {
    pub enabled: bool,
    pub program: PathBuf,
    pub timeout_secs: u64,
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: PathBuf::from("soundstretch"),
            timeout_secs: DEFAULT_STRETCH_TIMEOUT_SECS,
        }
    }
}

impl StretchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Complete player configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub engine: EngineConfig,
    pub audio: AudioConfig,
    pub stretch: StretchConfig,
}

impl PlayerConfig {
    /// Load from `path`, or compiled defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: PlayerConfig = loopr_common::config::load_toml_or_default(path)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlayerConfig = loopr_common::config::parse_toml(content)?;
        config.engine.validate()?;
        Ok(config)
    }
}
