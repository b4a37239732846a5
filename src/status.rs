//! Status notices emitted by capture components.
//!
//! Capture components report connection trouble and recovery as structured
//! events (severity, origin, message) through an injectable sink instead of
//! printing. The default sink routes through the `log` facade; embedders that
//! want the raw events (dashboards, tests) install their own sink.
//!
//! Status events are pure side-effect emissions. They are not part of the
//! frame data contract and no component ever blocks on a sink.

use std::sync::{Mutex, PoisonError};

/// Severity of a status event.
///
/// `Notice` is distinct from `Info`: it marks a successful recovery after
/// trouble, the counterpart of a prior `Warning`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Notice,
}

/// One status notice, tagged with the component that produced it.
#[derive(Clone, Debug)]
pub struct StatusEvent {
    pub severity: Severity,
    pub origin: &'static str,
    pub message: String,
}

impl StatusEvent {
    pub fn new(severity: Severity, origin: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            origin,
            message: message.into(),
        }
    }
}

/// Receiver for status events.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// reader thread between fetches.
pub trait StatusSink: Send + Sync {
    fn emit(&self, event: StatusEvent);
}

/// Default sink: forwards events to the `log` facade, using the event origin
/// as the log target so components can be filtered individually.
pub struct LogSink;

impl StatusSink for LogSink {
    fn emit(&self, event: StatusEvent) {
        let level = match event.severity {
            Severity::Info | Severity::Notice => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        };
        log::log!(target: event.origin, level, "{}", event.message);
    }
}

/// Sink that retains events in memory, in emission order.
///
/// Used by tests and by embedders that poll recent status instead of logging.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<StatusEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StatusSink for MemorySink {
    fn emit(&self, event: StatusEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
