//! Tempo gating and tempo cache tests for PlaybackEngine

mod helpers;

use helpers::*;
use loopr_ap::audio::NullSink;
use loopr_ap::playback::PlaybackState;
use loopr_ap::tempo::PassthroughBackend;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

#[test]
#[serial]
fn test_play_gates_on_stretch() {
    let (engine, observer, backend) = test_engine();
    engine.load_track(sine_track("tone", 4.0)).unwrap();

    engine.change_tempo(-20).unwrap();
    assert_eq!(engine.tempo_percent(), 80);
    // recorded only, nothing computed until play
    assert_eq!(backend.calls(), 0);

    engine.play().unwrap();

    let processing = observer.position_of("Processing 80%").expect("no processing status");
    let ready = observer.position_of("Ready at 80%").expect("no ready status");
    let playing = observer.position_of("Reproduciendo").expect("no playing status");
    assert!(processing < ready && ready < playing);

    let snapshot = engine.snapshot();
    assert!(!snapshot.processing);
    assert!((snapshot.duration - 4.0).abs() < 1e-9);
    assert!(
        (snapshot.active_duration - 5.0).abs() < 0.01,
        "active duration {}",
        snapshot.active_duration
    );
    engine.stop().unwrap();
}

#[test]
fn test_tempo_clamped_to_range() {
    let (engine, observer, _) = test_engine();
    engine.load_track(sine_track("tone", 1.0)).unwrap();

    engine.change_tempo(-90).unwrap();
    assert_eq!(engine.tempo_percent(), 50);
    engine.change_tempo(-5).unwrap();
    assert_eq!(engine.tempo_percent(), 50);
    engine.change_tempo(500).unwrap();
    assert_eq!(engine.tempo_percent(), 200);

    // no event for a change that clamps to the current value
    assert_eq!(observer.count("Tempo: 50%"), 1);
    assert_eq!(observer.count("Tempo: 200%"), 1);
}

#[test]
#[serial]
fn test_cached_tempo_is_not_recomputed() {
    let (engine, observer, backend) = test_engine();
    engine.load_track(sine_track("tone", 1.0)).unwrap();

    engine.change_tempo(-20).unwrap();
    engine.play().unwrap();
    engine.stop().unwrap();

    engine.change_tempo(10).unwrap();
    engine.play().unwrap();
    engine.stop().unwrap();

    engine.change_tempo(-10).unwrap();
    engine.play().unwrap();
    engine.stop().unwrap();

    assert_eq!(backend.calls(), 2);
    assert_eq!(engine.cached_tempos(), vec![80, 90]);
    assert_eq!(observer.count("Processing 80%..."), 1);
    assert_eq!(observer.count("Processing 90%..."), 1);
}

#[test]
#[serial]
fn test_back_to_normal_tempo_needs_no_stretch() {
    let (engine, observer, backend) = test_engine();
    engine.load_track(sine_track("tone", 2.0)).unwrap();

    engine.change_tempo(-20).unwrap();
    engine.change_tempo(20).unwrap();
    engine.play().unwrap();

    assert_eq!(backend.calls(), 0);
    assert_eq!(observer.position_of("Processing"), None);
    assert!((engine.snapshot().active_duration - 2.0).abs() < 1e-9);
    engine.stop().unwrap();
}

#[test]
#[serial]
fn test_tempo_change_while_playing_applies_immediately() {
    let (engine, observer, backend) = test_engine();
    engine.load_track(sine_track("tone", 2.0)).unwrap();
    mark_region(&engine, 0.5, 1.5);

    engine.play().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    engine.change_tempo(-20).unwrap();

    assert_eq!(backend.calls(), 1);
    assert_eq!(engine.state(), PlaybackState::Playing);
    assert!((engine.snapshot().active_duration - 2.5).abs() < 0.01);
    assert!(observer.position_of("Ready at 80%").is_some());

    // playback keeps to the loop on the original timeline
    std::thread::sleep(Duration::from_millis(300));
    let position = engine.position();
    assert!((0.5..=1.5).contains(&position), "position {}", position);
    engine.stop().unwrap();
}

#[test]
#[serial]
fn test_unavailable_backend_plays_at_normal_speed() {
    let (engine, observer) = engine_with(
        fast_config(),
        Box::new(NullSink::new()),
        Arc::new(PassthroughBackend),
    );
    engine.load_track(sine_track("tone", 2.0)).unwrap();
    assert!(!engine.is_tempo_available());

    engine.change_tempo(-20).unwrap();
    engine.play().unwrap();

    assert_eq!(engine.state(), PlaybackState::Playing);
    assert_eq!(engine.tempo_percent(), 80);
    assert_eq!(observer.position_of("Processing"), None);
    assert!(observer.position_of("Tempo no disponible").is_some());
    assert!((engine.snapshot().active_duration - 2.0).abs() < 1e-9);
    engine.stop().unwrap();
}

#[test]
#[serial]
fn test_failed_stretch_reverts_tempo() {
    let (engine, observer) = engine_with(
        fast_config(),
        Box::new(NullSink::new()),
        Arc::new(FailingStretch),
    );
    engine.load_track(sine_track("tone", 2.0)).unwrap();

    engine.change_tempo(-20).unwrap();
    engine.play().unwrap();

    assert_eq!(engine.state(), PlaybackState::Playing);
    assert_eq!(engine.tempo_percent(), 100);
    assert!(observer
        .messages()
        .iter()
        .any(|m| m.contains("Time-stretch failed")));
    assert!(engine.cached_tempos().is_empty());
    engine.stop().unwrap();
}
