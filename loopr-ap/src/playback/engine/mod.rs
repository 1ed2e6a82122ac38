//! Playback engine module
//!
//! **Module Structure:**
//! - `core.rs`: Engine struct, construction, track loading, snapshot and shutdown
//! - `transport.rs`: play / pause / resume / stop and worker lifecycle
//! - `worker.rs`: The playback thread and its section loop
//! - `markers.rs`: Loop points and fine-adjust mode
//! - `tempo.rs`: Tempo changes and synchronous stretch gating
//! - `export.rs`: Writing the A-B region to disk
//!
//! **Locking:** commands are serialized by the `control` mutex. Inside a
//! command or the worker, the sink lock is always taken before the session
//! lock, never the reverse. Status observers are notified with neither held.

mod core;
mod export;
mod markers;
mod tempo;
mod transport;
mod worker;

pub use core::{EngineSnapshot, PlaybackEngine};
