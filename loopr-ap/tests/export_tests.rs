//! Loop region export tests

mod helpers;

use helpers::*;
use loopr_ap::audio::writer::read_wav;
use loopr_ap::audio::NullSink;
use loopr_ap::tempo::StretchBackend;
use loopr_ap::{EngineConfig, Error, ExportTempo, PlaybackEngine};
use std::sync::Arc;

fn export_engine(export_tempo: ExportTempo) -> (PlaybackEngine, Arc<RecordingObserver>) {
    let config = EngineConfig {
        export_tempo,
        ..fast_config()
    };
    let backend: Arc<dyn StretchBackend> = Arc::new(ResampleStretch::default());
    engine_with(config, Box::new(NullSink::new()), backend)
}

#[test]
fn test_second_save_gets_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, observer) = export_engine(ExportTempo::Stretched);
    engine.load_track(sine_track("tone", 2.0)).unwrap();
    mark_region(&engine, 0.2, 0.5);

    let first = engine.save_loop_region(dir.path()).unwrap();
    let second = engine.save_loop_region(dir.path()).unwrap();

    assert_eq!(first, "tone_0000.wav");
    assert_eq!(second, "tone_0000_1.wav");
    assert!(dir.path().join(&first).exists());
    assert!(dir.path().join(&second).exists());
    assert_eq!(observer.count("Guardado: tone_0000.wav"), 1);
    assert_eq!(observer.count("Guardado: tone_0000_1.wav"), 1);
}

#[test]
fn test_save_writes_region_samples() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _observer) = export_engine(ExportTempo::Stretched);
    engine.load_track(sine_track("tone", 2.0)).unwrap();
    mark_region(&engine, 0.2, 0.5);

    let name = engine.save_loop_region(dir.path()).unwrap();
    let (samples, rate, channels) = read_wav(&dir.path().join(name)).unwrap();

    assert_eq!(rate, TEST_SAMPLE_RATE);
    assert_eq!(channels, 1);
    // 0.2s..0.5s at 8 kHz
    assert_eq!(samples.len(), 2400);
}

#[test]
fn test_save_requires_both_points() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _observer) = export_engine(ExportTempo::Stretched);
    engine.load_track(sine_track("tone", 2.0)).unwrap();
    engine.set_loop_a().unwrap();

    let result = engine.save_loop_region(dir.path());
    assert!(matches!(result, Err(Error::InvalidLoopRegion(_))));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_save_rejects_empty_region() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _observer) = export_engine(ExportTempo::Stretched);
    engine.load_track(sine_track("tone", 2.0)).unwrap();
    // A == B == 0
    engine.set_loop_a().unwrap();
    engine.set_loop_b().unwrap();

    let result = engine.save_loop_region(dir.path());
    assert!(matches!(result, Err(Error::InvalidLoopRegion(_))));
}

#[test]
fn test_stretched_export_applies_tempo() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _observer) = export_engine(ExportTempo::Stretched);
    engine.load_track(sine_track("tone", 2.0)).unwrap();
    mark_region(&engine, 0.2, 0.5);
    engine.change_tempo(-20).unwrap();

    let name = engine.save_loop_region(dir.path()).unwrap();
    let (samples, _, _) = read_wav(&dir.path().join(name)).unwrap();
    assert_eq!(samples.len(), 3000);
}

#[test]
fn test_raw_export_ignores_tempo() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _observer) = export_engine(ExportTempo::Raw);
    engine.load_track(sine_track("tone", 2.0)).unwrap();
    mark_region(&engine, 0.2, 0.5);
    engine.change_tempo(-20).unwrap();

    let name = engine.save_loop_region(dir.path()).unwrap();
    let (samples, _, _) = read_wav(&dir.path().join(name)).unwrap();
    assert_eq!(samples.len(), 2400);
}

#[test]
fn test_failed_stretch_exports_unstretched() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, observer) = engine_with(
        fast_config(),
        Box::new(NullSink::new()),
        Arc::new(FailingStretch),
    );
    engine.load_track(sine_track("tone", 2.0)).unwrap();
    mark_region(&engine, 0.2, 0.5);
    engine.change_tempo(-20).unwrap();

    let name = engine.save_loop_region(dir.path()).unwrap();
    let (samples, _, _) = read_wav(&dir.path().join(name)).unwrap();
    assert_eq!(samples.len(), 2400);
    assert!(observer.position_of("Guardando sin tempo").is_some());
}

#[test]
fn test_export_stamp_uses_minutes_and_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _observer) = export_engine(ExportTempo::Raw);
    engine.load_track(sine_track("long take", 70.0)).unwrap();
    mark_region(&engine, 65.0, 66.0);

    let name = engine.save_loop_region(dir.path()).unwrap();
    assert_eq!(name, "long take_0105.wav");
}
