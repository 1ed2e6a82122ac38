//! Monotonic playback clock
//!
//! Position comes from wall-clock time since a section was submitted, not
//! from the sink. With a stretched buffer one wall second covers
//! `1 / ratio` seconds of the original track.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    started: Instant,
    origin: f64,
    ratio: f64,
}

impl PlaybackClock {
    /// Start counting from `origin` seconds on the original timeline.
    pub fn start(origin: f64, ratio: f64) -> Self {
        Self {
            started: Instant::now(),
            origin,
            ratio: if ratio > 0.0 { ratio } else { 1.0 },
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Current position on the original timeline
    pub fn position(&self) -> f64 {
        self.position_after(self.elapsed())
    }

    pub fn position_after(&self, elapsed: Duration) -> f64 {
        self.origin + elapsed.as_secs_f64() / self.ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstretched_position_tracks_wall_time() {
        let clock = PlaybackClock::start(2.0, 1.0);
        assert!((clock.position_after(Duration::from_millis(1500)) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_slow_tempo_advances_slower() {
        // 80% tempo: buffer is 1.25x longer
        let clock = PlaybackClock::start(0.0, 1.25);
        assert!((clock.position_after(Duration::from_secs(5)) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_ratio_falls_back_to_unity() {
        let clock = PlaybackClock::start(1.0, 0.0);
        assert!((clock.position_after(Duration::from_secs(1)) - 2.0).abs() < 1e-9);
    }
}
