//! Status events and the broadcast EventBus
//!
//! The player reports every meaningful state change as a short human-readable
//! status line. Events fan out to any number of subscribers (display, log,
//! command-line printer) through a tokio broadcast channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity of a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// A single status notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Display text, e.g. "Reproduciendo" or "Tempo: 85%"
    pub message: String,
    pub level: StatusLevel,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, message)
    }
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            StatusLevel::Info => write!(f, "{}", self.message),
            StatusLevel::Warning => write!(f, "⚠ {}", self.message),
            StatusLevel::Error => write!(f, "✗ {}", self.message),
        }
    }
}

/// Broadcast bus for status events
///
/// `emit` is synchronous and never blocks, so it is safe to call from the
/// playback worker thread as well as from async code.
pub struct EventBus {
    tx: broadcast::Sender<StatusEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per
    /// subscriber before the slowest subscriber starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: StatusEvent,
    ) -> Result<usize, broadcast::error::SendError<StatusEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: StatusEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
