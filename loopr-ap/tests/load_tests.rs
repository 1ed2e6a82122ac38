//! Track loading through the decode path

mod helpers;

use helpers::*;
use loopr_ap::audio::load_track;
use loopr_ap::playback::PlaybackState;
use loopr_ap::Error;
use serial_test::serial;
use std::time::Duration;

#[test]
fn test_load_wav_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scale practice.wav");
    generate_sine_wav(&path, 0.5, 44100, 2).unwrap();

    let (engine, observer, _) = test_engine();
    engine.load(&path).unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.track_name.as_deref(), Some("scale practice"));
    assert!((snapshot.duration - 0.5).abs() < 0.01, "{}", snapshot.duration);
    assert_eq!(snapshot.state, PlaybackState::Stopped);
    assert_eq!(observer.count("Archivo cargado"), 1);
}

#[test]
fn test_load_resamples_to_output_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("low.wav");
    generate_sine_wav(&path, 1.0, 22050, 1).unwrap();

    let track = load_track(&path, 44100).unwrap();
    assert_eq!(track.sample_rate(), 44100);
    assert_eq!(track.channels(), 1);
    assert!((track.duration_seconds() - 1.0).abs() < 0.02, "{}", track.duration_seconds());
}

#[test]
fn test_missing_file_is_load_error() {
    let (engine, _observer, _) = test_engine();
    let result = engine.load(std::path::Path::new("/nonexistent/take.wav"));
    assert!(matches!(result, Err(Error::Load(_))));
    assert_eq!(engine.snapshot().track_name, None);
}

#[test]
#[serial]
fn test_corrupt_file_keeps_current_track_playing() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("broken.wav");
    std::fs::write(&bad, b"RIFF\x00\x00\x00\x00not really a wave file").unwrap();

    let (engine, observer, _) = test_engine();
    engine.load_track(sine_track("good", 2.0)).unwrap();
    engine.play().unwrap();

    let result = engine.load(&bad);
    assert!(matches!(result, Err(Error::Load(_))));
    assert!(observer
        .messages()
        .iter()
        .any(|m| m.starts_with("Load error")));

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.track_name.as_deref(), Some("good"));
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert!(wait_until(Duration::from_secs(1), || engine.position() > 0.05));
    engine.stop().unwrap();
}
