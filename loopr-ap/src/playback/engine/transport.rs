//! Transport control for PlaybackEngine
//!
//! **Responsibilities:**
//! - State transitions (play, pause, resume, stop, toggle)
//! - Idempotent worker start shared by play and resume
//! - Cancellation with a bounded wait for the worker
//!
//! The `*_locked` variants expect the caller to hold the control lock so
//! compound commands (toggle, fine-adjust) can reuse them.

use super::core::PlaybackEngine;
use super::worker;
use crate::error::{Error, Result};
use crate::playback::state::{LiveWorker, PlaybackState};
use std::sync::{Arc, PoisonError};
use tracing::{debug, info, warn};

impl PlaybackEngine {
    /// Start playback from the beginning, or resume when paused.
    ///
    /// Blocks while a pending tempo stretch is computed.
    pub fn play(&self) -> Result<()> {
        let result = {
            let _control = self.control();
            self.play_locked()
        };
        self.report(result)
    }

    /// Pause playback. No-op unless playing.
    pub fn pause(&self) -> Result<()> {
        let result = {
            let _control = self.control();
            self.pause_locked().map(|_| ())
        };
        self.report(result)
    }

    /// Resume from pause. No-op unless paused.
    pub fn resume(&self) -> Result<()> {
        let result = {
            let _control = self.control();
            self.resume_locked()
        };
        self.report(result)
    }

    /// Stop playback and rewind to 0. No-op when already stopped.
    pub fn stop(&self) -> Result<()> {
        let result = {
            let _control = self.control();
            let loaded = Self::require_track(&self.shared.session());
            loaded.map(|_| self.halt())
        };
        if matches!(result, Ok(true)) {
            info!("Playback stopped");
            self.shared.info("Detenido");
        }
        self.report(result).map(|_| ())
    }

    /// Playing -> pause, Paused -> resume, Stopped -> play.
    pub fn toggle_play_pause(&self) -> Result<()> {
        let result = {
            let _control = self.control();
            let state = {
                let s = self.shared.session();
                Self::require_track(&s).map(|_| s.state)
            };
            match state {
                Ok(PlaybackState::Playing) => self.pause_locked().map(|_| ()),
                Ok(PlaybackState::Paused) => self.resume_locked(),
                Ok(PlaybackState::Stopped) => self.play_locked(),
                Err(e) => Err(e),
            }
        };
        self.report(result)
    }

    pub(super) fn play_locked(&self) -> Result<()> {
        let state = {
            let s = self.shared.session();
            Self::require_track(&s)?;
            s.state
        };
        match state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused => self.resume_locked(),
            PlaybackState::Stopped => {
                self.gate_tempo()?;
                {
                    let mut s = self.shared.session();
                    s.position = 0.0;
                    s.pause_requested = false;
                    s.state = PlaybackState::Playing;
                }
                self.start_worker()?;
                info!("Playback started");
                self.shared.info("Reproduciendo");
                Ok(())
            }
        }
    }

    /// Returns true if playback was actually paused.
    pub(super) fn pause_locked(&self) -> Result<bool> {
        {
            let mut s = self.shared.session();
            Self::require_track(&s)?;
            if s.state != PlaybackState::Playing {
                return Ok(false);
            }
            s.pause_requested = true;
            s.state = PlaybackState::Paused;
        }
        self.shared.signal.notify_all();
        if let Err(e) = self.shared.sink().stop() {
            warn!("Failed to stop sink on pause: {}", e);
        }
        info!("Playback paused");
        self.shared.info("Pausado");
        Ok(true)
    }

    pub(super) fn resume_locked(&self) -> Result<()> {
        {
            let s = self.shared.session();
            Self::require_track(&s)?;
            if s.state != PlaybackState::Paused {
                return Ok(());
            }
        }
        self.gate_tempo()?;
        {
            let mut s = self.shared.session();
            s.pause_requested = false;
            s.state = PlaybackState::Playing;
        }
        self.shared.signal.notify_all();
        self.start_worker()?;
        info!("Playback resumed");
        self.shared.info("Reproduciendo");
        Ok(())
    }

    /// Ensure a worker for the current epoch is running.
    ///
    /// A paused worker that is still waiting is reused; one that gave up
    /// waiting or already finished is replaced by a worker with a fresh id.
    pub(super) fn start_worker(&self) -> Result<()> {
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let me = {
            let mut s = self.shared.session();
            if let Some(live) = s.live_worker.filter(|w| w.epoch == s.epoch) {
                debug!("Playback worker {} already running", live.id);
                return Ok(());
            }
            let me = LiveWorker {
                id: s.next_worker_id,
                epoch: s.epoch,
            };
            s.next_worker_id = s.next_worker_id.wrapping_add(1);
            s.live_worker = Some(me);
            me
        };

        if let Some(previous) = slot.take() {
            if previous.is_finished() {
                let _ = previous.join();
            } else {
                debug!("Detaching previous playback worker");
            }
        }

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name(format!("loopr-playback-{}", me.id))
            .spawn(move || worker::run(shared, me));

        match spawned {
            Ok(handle) => {
                debug!("Playback worker {} started (epoch {})", me.id, me.epoch);
                *slot = Some(handle);
                Ok(())
            }
            Err(e) => {
                let mut s = self.shared.session();
                if s.live_worker == Some(me) {
                    s.live_worker = None;
                }
                s.state = PlaybackState::Stopped;
                s.pause_requested = false;
                Err(Error::Io(e))
            }
        }
    }

    /// Cancel the worker, stop the sink and rewind, without a status event.
    ///
    /// Returns false if there was nothing to stop. A worker that does not
    /// exit within the join timeout is detached and logged, never waited on
    /// again.
    pub(super) fn halt(&self) -> bool {
        {
            let mut s = self.shared.session();
            if s.state == PlaybackState::Stopped && s.live_worker.is_none() {
                return false;
            }
            s.epoch = s.epoch.wrapping_add(1);
            s.pause_requested = false;
        }
        self.shared.signal.notify_all();
        if let Err(e) = self.shared.sink().stop() {
            warn!("Failed to stop sink: {}", e);
        }

        let timeout = self.shared.config.join_timeout();
        let (mut s, _) = self
            .shared
            .signal
            .wait_timeout_while(self.shared.session(), timeout, |s| s.live_worker.is_some())
            .unwrap_or_else(PoisonError::into_inner);

        let timed_out = s.live_worker.is_some();
        if timed_out {
            s.live_worker = None;
        }
        s.state = PlaybackState::Stopped;
        s.position = 0.0;
        s.adjust = None;
        drop(s);

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if timed_out {
            warn!("{}; detaching it", Error::WorkerJoinTimeout(timeout));
        } else if let Some(handle) = handle {
            // a retired worker may still be delivering its last status events
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                debug!("Playback worker retired but still running; detaching it");
            }
        }
        true
    }
}
