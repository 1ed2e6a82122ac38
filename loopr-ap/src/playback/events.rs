//! Status notification
//!
//! The engine reports every state change as a [`StatusEvent`] through one
//! injected [`StatusObserver`]. Observers are called with no session or
//! sink lock held, so they may read engine state (e.g. `snapshot()`).

use loopr_common::events::{EventBus, StatusEvent, StatusLevel};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Receives status events from the engine
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, event: &StatusEvent);
}

impl<F> StatusObserver for F
where
    F: Fn(&StatusEvent) + Send + Sync,
{
    fn on_status(&self, event: &StatusEvent) {
        self(event)
    }
}

/// Forwards status events onto a broadcast [`EventBus`]
#[derive(Clone)]
pub struct StatusBus(pub Arc<EventBus>);

impl StatusObserver for StatusBus {
    fn on_status(&self, event: &StatusEvent) {
        self.0.emit_lossy(event.clone());
    }
}

/// Writes status events to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StatusObserver for LogObserver {
    fn on_status(&self, event: &StatusEvent) {
        match event.level {
            StatusLevel::Info => info!(target: "loopr_ap::status", "{}", event.message),
            StatusLevel::Warning => warn!(target: "loopr_ap::status", "{}", event.message),
            StatusLevel::Error => error!(target: "loopr_ap::status", "{}", event.message),
        }
    }
}
