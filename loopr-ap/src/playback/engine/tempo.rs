//! Tempo control for PlaybackEngine
//!
//! Stretching is synchronous: `play`, `resume` and a tempo change while
//! playing all compute (or fetch from cache) the stretched buffer on the
//! calling thread before playback continues. A change while paused or
//! stopped only records the new tempo; the next play/resume gates on it.

use super::core::PlaybackEngine;
use crate::error::{Error, Result};
use crate::playback::state::{ActiveStretch, PlaybackState};
use tracing::{debug, info, warn};

impl PlaybackEngine {
    /// Change tempo by `delta` percent, clamped to the configured range.
    pub fn change_tempo(&self, delta: i32) -> Result<()> {
        let result = {
            let _control = self.control();
            self.change_tempo_locked(delta)
        };
        self.report(result)
    }

    fn change_tempo_locked(&self, delta: i32) -> Result<()> {
        let (min, max) = (
            self.shared.config.tempo_min as i32,
            self.shared.config.tempo_max as i32,
        );
        let (percent, playing) = {
            let mut s = self.shared.session();
            Self::require_track(&s)?;
            let target = (s.tempo_percent as i32 + delta).clamp(min, max) as u16;
            if target == s.tempo_percent {
                return Ok(());
            }
            s.tempo_percent = target;
            (target, s.state == PlaybackState::Playing)
        };

        info!("Tempo set to {}%", percent);
        self.shared.info(format!("Tempo: {}%", percent));

        if playing {
            self.gate_tempo()?;
        }
        Ok(())
    }

    /// Make the active stretch match the current tempo.
    ///
    /// Unavailable backend: play the original with a warning. Failed
    /// stretch: keep the last good buffer and revert the tempo to it.
    /// Either way playback can continue, so only a missing track is an
    /// error.
    pub(super) fn gate_tempo(&self) -> Result<()> {
        let (track, percent) = {
            let mut s = self.shared.session();
            let track = s.track.clone().ok_or(Error::NoTrackLoaded)?;
            let percent = s.tempo_percent;

            if percent == 100 {
                if s.stretched.take().is_some() {
                    s.tempo_generation = s.tempo_generation.wrapping_add(1);
                    drop(s);
                    self.shared.signal.notify_all();
                }
                return Ok(());
            }
            if s.stretched.as_ref().is_some_and(|st| st.percent == percent) {
                return Ok(());
            }
            (track, percent)
        };

        let mut cache = self.lock_cache();
        let cached = cache.contains(&track, percent);
        let announce = !cached && self.backend.is_available();
        if announce {
            self.shared.session().processing = true;
            self.shared.info(format!("Processing {}%...", percent));
        }
        let result = cache.get_or_compute(&track, percent, self.backend.as_ref());
        drop(cache);

        let mut s = self.shared.session();
        s.processing = false;
        match result {
            Ok(samples) => {
                debug!("Tempo {}% ready ({} samples)", percent, samples.len());
                s.stretched = Some(ActiveStretch { percent, samples });
                s.tempo_generation = s.tempo_generation.wrapping_add(1);
                drop(s);
                self.shared.signal.notify_all();
                if announce {
                    self.shared.info(format!("Ready at {}%", percent));
                }
            }
            Err(Error::StretchUnavailable(reason)) => {
                let had_stretch = s.stretched.take().is_some();
                if had_stretch {
                    s.tempo_generation = s.tempo_generation.wrapping_add(1);
                }
                drop(s);
                if had_stretch {
                    self.shared.signal.notify_all();
                }
                warn!("Tempo {}% unavailable: {}", percent, reason);
                self.shared.warning(format!(
                    "Tempo no disponible ({}), reproduciendo al 100%",
                    reason
                ));
            }
            Err(e) => {
                let fallback = s.stretched.as_ref().map_or(100, |st| st.percent);
                s.tempo_percent = fallback;
                drop(s);
                warn!("Stretch to {}% failed, staying at {}%: {}", percent, fallback, e);
                self.shared.warning(format!("{}; tempo {}%", e, fallback));
            }
        }
        Ok(())
    }
}
