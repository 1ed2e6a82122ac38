//! Error types for loopr-ap
//!
//! Every failure the engine can report maps onto one variant here. The engine
//! converts all of them into status events as well, so a caller may ignore a
//! returned error without losing the user-facing message.

use std::time::Duration;
use thiserror::Error;

/// Main error type for loopr-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Track could not be read or decoded
    #[error("Load error: {0}")]
    Load(String),

    /// Command issued before any track was loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Export attempted without a usable A-B region
    #[error("Invalid loop region: {0}")]
    InvalidLoopRegion(String),

    /// Time-stretch backend is disabled or missing
    #[error("Time-stretch unavailable: {0}")]
    StretchUnavailable(String),

    /// Time-stretch backend ran but failed
    #[error("Time-stretch failed: {0}")]
    StretchFailure(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    Sink(String),

    /// Playback worker did not confirm exit in time
    #[error("Playback worker did not exit within {0:?}")]
    WorkerJoinTimeout(Duration),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Loop region export errors
    #[error("Export error: {0}")]
    Export(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from shared utilities (config file loading)
    #[error(transparent)]
    Common(#[from] loopr_common::Error),
}

impl Error {
    /// True for errors that describe a user mistake rather than a fault
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::NoTrackLoaded
                | Error::InvalidLoopRegion(_)
                | Error::InvalidState(_)
                | Error::StretchUnavailable(_)
        )
    }
}

/// Convenience Result type using loopr-ap Error
pub type Result<T> = std::result::Result<T, Error>;
