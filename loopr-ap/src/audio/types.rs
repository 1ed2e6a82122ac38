//! Core audio data types
//!
//! Samples are f32 in [-1.0, 1.0], interleaved by frame
//! (`[L, R, L, R, ...]` for stereo).

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A fully decoded track held in RAM.
///
/// The sample data is shared (`Arc`) so the playback worker, the tempo
/// cache and the audio sink can all hold it without copying.
#[derive(Debug, Clone)]
pub struct Track {
    name: String,
    path: Option<PathBuf>,
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
}

impl Track {
    /// Create a track from decoded interleaved samples
    pub fn new(name: impl Into<String>, samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            name: name.into(),
            path: None,
            samples: Arc::new(samples),
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Remember where the track was loaded from
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }

    /// Display name (file stem for loaded tracks)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn samples(&self) -> &Arc<Vec<f32>> {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Length in seconds (0.0 for an empty track)
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Frame index for a time offset, floored and clamped to the track.
    pub fn frame_at(&self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        let frame = (seconds * self.sample_rate as f64).floor() as usize;
        frame.min(self.frame_count())
    }

    /// Copy the interleaved samples between `start` and `end` seconds.
    ///
    /// Bounds are clamped; an inverted range yields an empty vector.
    pub fn extract(&self, start: f64, end: f64) -> Vec<f32> {
        let from = self.frame_at(start);
        let to = self.frame_at(end);
        if to <= from {
            return Vec::new();
        }
        let ch = self.channels as usize;
        self.samples[from * ch..to * ch].to_vec()
    }
}

/// One section handed to an audio sink: frames `[start_frame, end_frame)`
/// of a shared sample buffer.
#[derive(Debug, Clone)]
pub struct SinkBuffer {
    pub samples: Arc<Vec<f32>>,
    pub start_frame: usize,
    pub end_frame: usize,
    pub sample_rate: u32,
    pub channels: u16,
}

impl SinkBuffer {
    pub fn frame_count(&self) -> usize {
        self.end_frame.saturating_sub(self.start_frame)
    }

    /// Wall-clock length of the section
    pub fn duration(&self) -> std::time::Duration {
        if self.sample_rate == 0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }
}
