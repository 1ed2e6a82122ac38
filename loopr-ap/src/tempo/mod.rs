//! Tempo subsystem: time-stretch backends and the per-track tempo cache

pub mod backend;
pub mod cache;

pub use backend::{ratio_for_percent, PassthroughBackend, SoundStretchBackend, StretchBackend};
pub use cache::TempoCache;
