//! # Loopr Audio Player Library (loopr-ap)
//!
//! A-B loop practice player with pitch-preserving tempo control.
//!
//! **Purpose:** Load a recorded track, loop a marked section, play it back at
//! 50-200% tempo, and export the marked section as a new file.
//!
//! **Architecture:** symphonia + rubato decode path into an in-memory track,
//! a dedicated playback worker thread driving a cpal output stream, and a
//! bounded cache of time-stretched buffers produced by an external stretch
//! program.

pub mod audio;
pub mod commands;
pub mod config;
pub mod error;
pub mod playback;
pub mod tempo;

pub use config::{EngineConfig, ExportTempo, PlayerConfig};
pub use error::{Error, Result};
pub use playback::{AdjustTarget, EngineSnapshot, PlaybackEngine, PlaybackState};
