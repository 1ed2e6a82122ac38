//! Core playback engine - construction, loading and read access
//!
//! **Responsibilities:**
//! - PlaybackEngine struct definition and initialization
//! - Track loading (decode outside any lock, then swap in)
//! - Error reporting through the status observer
//! - Snapshot and accessor methods
//! - Shutdown

use crate::audio::{self, AudioSink, Track};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::playback::events::StatusObserver;
use crate::playback::state::{AdjustTarget, LoopRegion, PlaybackState, Session};
use crate::tempo::{StretchBackend, TempoCache};
use loopr_common::events::StatusEvent;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// State shared between the engine handle and the playback worker
pub(super) struct Shared {
    pub(super) session: Mutex<Session>,
    /// Signalled on pause release, cancellation, tempo change and worker exit
    pub(super) signal: Condvar,
    pub(super) sink: Mutex<Box<dyn AudioSink>>,
    pub(super) observer: Arc<dyn StatusObserver>,
    pub(super) config: EngineConfig,
}

impl Shared {
    pub(super) fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn sink(&self) -> MutexGuard<'_, Box<dyn AudioSink>> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a status event. Must not be called with the session or
    /// sink lock held.
    pub(super) fn notify(&self, event: StatusEvent) {
        self.observer.on_status(&event);
    }

    pub(super) fn info(&self, message: impl Into<String>) {
        self.notify(StatusEvent::info(message));
    }

    pub(super) fn warning(&self, message: impl Into<String>) {
        self.notify(StatusEvent::warning(message));
    }
}

/// Read-only copy of the session for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub state: PlaybackState,
    /// Seconds on the original track's timeline
    pub position: f64,
    /// Length of the loaded track
    pub duration: f64,
    /// Length of the buffer playback uses at the current tempo
    pub active_duration: f64,
    pub point_a: Option<f64>,
    pub point_b: Option<f64>,
    pub tempo_percent: u16,
    pub adjust: Option<AdjustTarget>,
    pub processing: bool,
    pub track_name: Option<String>,
}

/// A-B loop playback engine
///
/// Owns the loaded track and all session state, runs at most one playback
/// worker thread, and gates tempo changes on a synchronous time-stretch.
pub struct PlaybackEngine {
    pub(super) shared: Arc<Shared>,

    /// Serializes commands
    pub(super) control: Mutex<()>,

    pub(super) cache: Mutex<TempoCache>,

    pub(super) backend: Arc<dyn StretchBackend>,

    /// Handle of the most recently started worker
    pub(super) worker: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackEngine {
    pub fn new(
        config: EngineConfig,
        sink: Box<dyn AudioSink>,
        backend: Arc<dyn StretchBackend>,
        observer: Arc<dyn StatusObserver>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "Playback engine ready (sink: {}, stretch: {}{})",
            sink.name(),
            backend.name(),
            if backend.is_available() { "" } else { ", unavailable" }
        );

        let cache = TempoCache::new(config.cache_capacity);
        Ok(Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session::new()),
                signal: Condvar::new(),
                sink: Mutex::new(sink),
                observer,
                config,
            }),
            control: Mutex::new(()),
            cache: Mutex::new(cache),
            backend,
            worker: Mutex::new(None),
        })
    }

    pub(super) fn control(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn lock_cache(&self) -> MutexGuard<'_, TempoCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Surface an error as a status event and hand it back.
    pub(super) fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_user_error() {
                warn!("{}", e);
                self.shared.notify(StatusEvent::warning(e.to_string()));
            } else {
                error!("{}", e);
                self.shared.notify(StatusEvent::error(e.to_string()));
            }
        }
        result
    }

    pub(super) fn require_track(session: &Session) -> Result<()> {
        if session.track.is_none() {
            return Err(Error::NoTrackLoaded);
        }
        Ok(())
    }

    /// Decode `path` and make it the current track.
    ///
    /// On failure nothing changes: the previous track keeps playing.
    pub fn load(&self, path: &Path) -> Result<()> {
        debug!("Load requested: {}", path.display());
        let result = audio::load_track(path, self.shared.config.output_sample_rate)
            .and_then(|track| self.install(track));
        self.report(result)
    }

    /// Make an already decoded track the current track.
    pub fn load_track(&self, track: Track) -> Result<()> {
        let result = self.install(track);
        self.report(result)
    }

    fn install(&self, track: Track) -> Result<()> {
        let _control = self.control();
        self.halt();
        self.lock_cache().clear();

        let name = track.name().to_string();
        let duration = track.duration_seconds();
        self.shared.session().reset_for(track);

        info!("Track installed: {} ({:.2}s)", name, duration);
        self.shared.info("Archivo cargado");
        Ok(())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let s = self.shared.session();
        EngineSnapshot {
            state: s.state,
            position: s.position,
            duration: s.duration(),
            active_duration: s.active_duration(),
            point_a: s.region.a(),
            point_b: s.region.b(),
            tempo_percent: s.tempo_percent,
            adjust: s.adjust,
            processing: s.processing,
            track_name: s.track.as_ref().map(|t| t.name().to_string()),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.session().state
    }

    pub fn position(&self) -> f64 {
        self.shared.session().position
    }

    pub fn duration(&self) -> f64 {
        self.shared.session().duration()
    }

    pub fn tempo_percent(&self) -> u16 {
        self.shared.session().tempo_percent
    }

    pub fn loop_region(&self) -> LoopRegion {
        self.shared.session().region
    }

    pub fn is_tempo_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Tempo percentages cached for the current track, oldest first
    pub fn cached_tempos(&self) -> Vec<u16> {
        self.lock_cache().cached_percents()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Stop playback and release the worker.
    pub fn shutdown(&self) {
        let _control = self.control();
        if self.halt() {
            info!("Playback stopped for shutdown");
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
