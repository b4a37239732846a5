//! One-shot still capture.
//!
//! `StillFetcher` opens a session, takes a single frame, and releases the
//! session again whatever the outcome. Failures accumulate in a counter
//! that successful fetches repay, giving callers a cheap health signal
//! across repeated polls.

use anyhow::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::connect::{Connect, LinkConnector};
use crate::frame::Frame;
use crate::status::{LogSink, Severity, StatusEvent, StatusSink};

const ORIGIN: &str = "still";

/// Fetches single frames on demand.
///
/// Unlike [`StreamSource`](crate::stream::StreamSource) there is no
/// background work and no termination: every call stands alone, and a
/// broken link simply keeps returning errors.
pub struct StillFetcher {
    connector: Arc<dyn Connect>,
    sink: Arc<dyn StatusSink>,
    failure_count: AtomicU32,
}

impl StillFetcher {
    /// Fetcher over the bundled connectors, logging through [`LogSink`].
    pub fn new() -> Self {
        Self::with_parts(Arc::new(LinkConnector::new()), Arc::new(LogSink))
    }

    pub fn with_parts(connector: Arc<dyn Connect>, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            connector,
            sink,
            failure_count: AtomicU32::new(0),
        }
    }

    /// Fetch one frame from `link`.
    ///
    /// The session is released on both outcomes. A failure bumps
    /// [`failure_count`](Self::failure_count); a success repays one unit,
    /// never going below zero.
    pub fn read(&self, link: &str) -> Result<Frame> {
        let mut session = self.connector.open(link);
        let outcome = session.read_one();
        session.release();
        match outcome {
            Ok(frame) => {
                let _ = self
                    .failure_count
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                        count.checked_sub(1)
                    });
                Ok(frame)
            }
            Err(err) => {
                let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
                self.sink.emit(StatusEvent::new(
                    Severity::Warning,
                    ORIGIN,
                    format!("still fetch from {} failed ({} so far): {:#}", link, failures, err),
                ));
                Err(err)
            }
        }
    }

    /// Net failures seen so far.
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }
}

impl Default for StillFetcher {
    fn default() -> Self {
        Self::new()
    }
}
