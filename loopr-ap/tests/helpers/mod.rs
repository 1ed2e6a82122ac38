//! Test helper modules for loopr-ap integration tests
//!
//! Provides reusable test infrastructure components:
//! - Tone fixtures (in-memory tracks and WAV files)
//! - RecordingObserver: captures every status event in order
//! - Scripted stretch backends and a failing sink
//! - Engine construction with fast timing

#![allow(dead_code)]

pub mod audio_generator;

pub use audio_generator::{generate_sine_wav, sine_track, TEST_SAMPLE_RATE};

use loopr_ap::audio::{AudioSink, NullSink, SinkBuffer};
use loopr_ap::playback::StatusObserver;
use loopr_ap::tempo::StretchBackend;
use loopr_ap::{EngineConfig, Error, PlaybackEngine, Result};
use loopr_common::{StatusEvent, StatusLevel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

/// Engine timing tightened for tests
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        poll_interval_ms: 5,
        join_timeout_ms: 500,
        pause_wait_timeout_secs: 5,
        section_safety_margin_ms: 300,
        ..EngineConfig::default()
    }
}

/// Records status events in arrival order
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingObserver {
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn count(&self, message: &str) -> usize {
        self.messages().iter().filter(|m| *m == message).count()
    }

    /// Index of the first event whose message starts with `prefix`
    pub fn position_of(&self, prefix: &str) -> Option<usize> {
        self.messages().iter().position(|m| m.starts_with(prefix))
    }

    pub fn has_level(&self, level: StatusLevel) -> bool {
        self.events.lock().unwrap().iter().any(|e| e.level == level)
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl StatusObserver for RecordingObserver {
    fn on_status(&self, event: &StatusEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Nearest-neighbour "stretch": changes length, not content. Counts calls.
#[derive(Default)]
pub struct ResampleStretch {
    calls: AtomicUsize,
}

impl ResampleStretch {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StretchBackend for ResampleStretch {
    fn name(&self) -> &str {
        "test-resample"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn stretch(
        &self,
        samples: &[f32],
        _sample_rate: u32,
        channels: u16,
        ratio: f64,
    ) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ch = channels as usize;
        let frames = samples.len() / ch;
        if frames == 0 {
            return Ok(Vec::new());
        }
        let out_frames = (frames as f64 * ratio).round() as usize;
        let mut out = Vec::with_capacity(out_frames * ch);
        for i in 0..out_frames {
            let src = ((i as f64 / ratio) as usize).min(frames - 1);
            out.extend_from_slice(&samples[src * ch..src * ch + ch]);
        }
        Ok(out)
    }
}

/// Backend that is installed but fails every stretch
pub struct FailingStretch;

impl StretchBackend for FailingStretch {
    fn name(&self) -> &str {
        "test-failing"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn stretch(&self, _: &[f32], _: u32, _: u16, _: f64) -> Result<Vec<f32>> {
        Err(Error::StretchFailure("exit status 1".to_string()))
    }
}

/// Sink that accepts a section, then reports a device error
#[derive(Default)]
pub struct BrokenSink {
    started: bool,
}

impl AudioSink for BrokenSink {
    fn start(&mut self, _buffer: SinkBuffer) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.started
    }

    fn has_error(&self) -> bool {
        self.started
    }

    fn name(&self) -> String {
        "broken".to_string()
    }
}

/// Silent sink that notes which thread submitted each section
#[derive(Default)]
pub struct ThreadRecordingSink {
    starts: Arc<Mutex<Vec<ThreadId>>>,
    playing_until: Option<Instant>,
}

impl ThreadRecordingSink {
    /// Shared view of the submitting threads, in order
    pub fn starts(&self) -> Arc<Mutex<Vec<ThreadId>>> {
        Arc::clone(&self.starts)
    }
}

impl AudioSink for ThreadRecordingSink {
    fn start(&mut self, buffer: SinkBuffer) -> Result<()> {
        self.starts.lock().unwrap().push(std::thread::current().id());
        self.playing_until = Some(Instant::now() + buffer.duration());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.playing_until = None;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.playing_until.is_some_and(|until| Instant::now() < until)
    }

    fn name(&self) -> String {
        "thread-recording".to_string()
    }
}

pub fn engine_with(
    config: EngineConfig,
    sink: Box<dyn AudioSink>,
    backend: Arc<dyn StretchBackend>,
) -> (PlaybackEngine, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let engine = PlaybackEngine::new(
        config,
        sink,
        backend,
        Arc::clone(&observer) as Arc<dyn StatusObserver>,
    )
    .unwrap();
    (engine, observer)
}

/// Fast-timing engine on a silent sink with the resampling backend
pub fn test_engine() -> (PlaybackEngine, Arc<RecordingObserver>, Arc<ResampleStretch>) {
    let backend = Arc::new(ResampleStretch::default());
    let (engine, observer) = engine_with(
        fast_config(),
        Box::new(NullSink::new()),
        Arc::clone(&backend) as Arc<dyn StretchBackend>,
    );
    (engine, observer, backend)
}

/// Mark A and B at exact offsets through the fine-adjust path.
///
/// Expects a stopped engine at position 0.
pub fn mark_region(engine: &PlaybackEngine, a: f64, b: f64) {
    engine.set_loop_a().unwrap();
    engine.set_loop_b().unwrap();
    engine.start_adjust(loopr_ap::AdjustTarget::B).unwrap();
    engine.adjust_by(b).unwrap();
    engine.finish_adjust().unwrap();
    engine.start_adjust(loopr_ap::AdjustTarget::A).unwrap();
    engine.adjust_by(a).unwrap();
    engine.finish_adjust().unwrap();
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
