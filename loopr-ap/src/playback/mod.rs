//! Playback engine, session state and status notification

pub mod clock;
pub mod engine;
pub mod events;
pub mod state;

pub use clock::PlaybackClock;
pub use engine::{EngineSnapshot, PlaybackEngine};
pub use events::{LogObserver, StatusBus, StatusObserver};
pub use state::{AdjustTarget, LoopRegion, PlaybackState};
