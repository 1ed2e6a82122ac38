//! Playback state, loop region and the session aggregate

use crate::audio::types::Track;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
        }
    }
}

/// What fine-adjust mode is moving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustTarget {
    A,
    B,
    Position,
}

impl AdjustTarget {
    /// Short label used in status messages
    pub fn label(&self) -> &'static str {
        match self {
            AdjustTarget::A => "A",
            AdjustTarget::B => "B",
            AdjustTarget::Position => "posición",
        }
    }
}

/// Optional A and B loop points, in seconds on the original timeline.
///
/// When both are set, `a <= b` always holds. Setting one point past the
/// other clears the *other* point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopRegion {
    a: Option<f64>,
    b: Option<f64>,
}

impl LoopRegion {
    pub fn a(&self) -> Option<f64> {
        self.a
    }

    pub fn b(&self) -> Option<f64> {
        self.b
    }

    /// Both points, if the loop is armed.
    pub fn both(&self) -> Option<(f64, f64)> {
        self.a.zip(self.b)
    }

    /// Set A. Returns true if B had to be cleared.
    pub fn set_a(&mut self, seconds: f64) -> bool {
        self.a = Some(seconds);
        if self.b.is_some_and(|b| b < seconds) {
            self.b = None;
            return true;
        }
        false
    }

    /// Set B. Returns true if A had to be cleared.
    pub fn set_b(&mut self, seconds: f64) -> bool {
        self.b = Some(seconds);
        if self.a.is_some_and(|a| a > seconds) {
            self.a = None;
            return true;
        }
        false
    }

    pub fn clear_a(&mut self) {
        self.a = None;
    }

    pub fn clear_b(&mut self) {
        self.b = None;
    }

    /// Move A by `delta`, keeping it within `[0, min(B, duration)]`.
    pub fn nudge_a(&mut self, delta: f64, duration: f64) -> Option<f64> {
        let upper = self.b.map_or(duration, |b| b.min(duration));
        let a = self.a?;
        let moved = (a + delta).clamp(0.0, upper.max(0.0));
        self.a = Some(moved);
        Some(moved)
    }

    /// Move B by `delta`, keeping it within `[A, duration]`.
    pub fn nudge_b(&mut self, delta: f64, duration: f64) -> Option<f64> {
        let lower = self.a.unwrap_or(0.0).min(duration);
        let b = self.b?;
        let moved = (b + delta).clamp(lower, duration.max(lower));
        self.b = Some(moved);
        Some(moved)
    }
}

/// Stretched copy of the track used for the current tempo
#[derive(Debug, Clone)]
pub(crate) struct ActiveStretch {
    pub percent: u16,
    pub samples: Arc<Vec<f32>>,
}

/// Identity of a running playback worker.
///
/// `id` is unique per spawned thread; `epoch` is the cancellation epoch it
/// was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LiveWorker {
    pub id: u64,
    pub epoch: u64,
}

/// Everything the caller and the playback worker share.
///
/// Only ever accessed under the engine's session mutex.
#[derive(Debug)]
pub(crate) struct Session {
    pub track: Option<Track>,
    pub region: LoopRegion,
    pub state: PlaybackState,
    /// Seconds on the original track's timeline
    pub position: f64,
    pub tempo_percent: u16,
    pub adjust: Option<AdjustTarget>,
    pub stretched: Option<ActiveStretch>,
    pub processing: bool,
    pub pause_requested: bool,
    /// Cancellation epoch; advanced by every stop
    pub epoch: u64,
    /// The worker currently alive, if any
    pub live_worker: Option<LiveWorker>,
    /// Id handed to the next spawned worker
    pub next_worker_id: u64,
    /// Advanced whenever the active stretch changes during playback
    pub tempo_generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            track: None,
            region: LoopRegion::default(),
            state: PlaybackState::Stopped,
            position: 0.0,
            tempo_percent: 100,
            adjust: None,
            stretched: None,
            processing: false,
            pause_requested: false,
            epoch: 0,
            live_worker: None,
            next_worker_id: 0,
            tempo_generation: 0,
        }
    }

    /// Reset everything tied to the previous track. Worker bookkeeping is
    /// kept so a lingering worker still sees its epoch advanced.
    pub fn reset_for(&mut self, track: Track) {
        self.track = Some(track);
        self.region = LoopRegion::default();
        self.state = PlaybackState::Stopped;
        self.position = 0.0;
        self.tempo_percent = 100;
        self.adjust = None;
        self.stretched = None;
        self.processing = false;
        self.pause_requested = false;
        self.tempo_generation = self.tempo_generation.wrapping_add(1);
    }

    pub fn duration(&self) -> f64 {
        self.track.as_ref().map_or(0.0, Track::duration_seconds)
    }

    /// Set the position, clamped to the track.
    pub fn set_position(&mut self, seconds: f64) {
        let duration = self.duration();
        self.position = if seconds.is_finite() {
            seconds.clamp(0.0, duration)
        } else {
            0.0
        };
    }

    /// Stretched samples when they match the current tempo.
    pub fn active_stretch(&self) -> Option<&ActiveStretch> {
        self.stretched
            .as_ref()
            .filter(|s| self.tempo_percent != 100 && s.percent == self.tempo_percent)
    }

    /// Length of the buffer playback would use right now.
    pub fn active_duration(&self) -> f64 {
        let Some(track) = self.track.as_ref() else {
            return 0.0;
        };
        match self.active_stretch() {
            Some(stretch) => {
                let frames = stretch.samples.len() / track.channels() as usize;
                frames as f64 / track.sample_rate() as f64
            }
            None => track.duration_seconds(),
        }
    }
}
