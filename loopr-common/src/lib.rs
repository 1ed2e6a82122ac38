//! # Loopr Common Library
//!
//! Shared code for the Loopr practice player crates:
//! - Status event type and broadcast EventBus
//! - Configuration file resolution and TOML loading
//! - Human-readable time formatting for status lines and export names

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{EventBus, StatusEvent, StatusLevel};
