//! Where orchestration and pipeline events go.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::Level;

/// Destination for `environment.*`, `service.*`, `phase.*` and `pipeline.*` events.
///
/// Emitters call [`EventSink::try_emit`] from inside running stages, so it
/// must return quickly and never fail the caller.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn try_emit(&self, event_type: &str, data: Option<Value>);

    /// Records one event from async code. Defaults to [`EventSink::try_emit`].
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.try_emit(event_type, data);
    }
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Turns events into `tracing` records at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self::info()
    }
}

impl LoggingEventSink {
    /// Logs at `level`. `TRACE` and `DEBUG` map to debug, anything else to info.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// For per-service events, which get noisy on large environments.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// For pipeline and phase events.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl EventSink for LoggingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        let data = data.map(|d| d.to_string()).unwrap_or_default();
        if self.level >= Level::DEBUG {
            tracing::debug!(event = event_type, %data, "pipewright event");
        } else {
            tracing::info!(event = event_type, %data, "pipewright event");
        }
    }
}

/// One event kept by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Dotted event type, e.g. `phase.deploy.completed`.
    pub event_type: String,
    /// Payload, if any.
    pub data: Option<Value>,
    /// When the event arrived.
    pub received_at: DateTime<Utc>,
}

/// Keeps events in arrival order so tests can assert on them.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Events whose type starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.events.lock().push(RecordedEvent {
            event_type: event_type.to_string(),
            data,
            received_at: Utc::now(),
        });
    }
}
