//! Event sinks for observability.
//!
//! The orchestrator emits `environment.*` and `service.*` events and the
//! composer emits `pipeline.*` and `phase.*` events into whatever
//! [`EventSink`] they were constructed with.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};
