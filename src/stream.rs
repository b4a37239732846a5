//! Continuous stream capture.
//!
//! `StreamSource` spawns a reader thread that pulls frames from a session
//! into a single-slot buffer, so consumers always pick up the most recent
//! frame and never queue stale ones.
//!
//! The reader is responsible for:
//! - Publishing every fetched frame into the shared [`FrameBuffer`]
//! - Absorbing transient faults by releasing the session, waiting out a
//!   cooldown, and reopening a fresh session
//! - Keeping a failure budget: each failed read adds one, each successful
//!   read repays one, and spending the whole budget terminates the source
//! - Closing the buffer on exit so blocked consumers observe the end
//!
//! The reader MUST NOT:
//! - Hold more than one frame at a time
//! - Reconnect before the cooldown has elapsed
//! - Keep running after `stop` beyond the read currently in flight

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::config::StreamConfig;
use crate::connect::{classify_link, Connect, LinkConnector};
use crate::frame::{Frame, FrameBuffer, TakeResult};
use crate::status::{LogSink, Severity, StatusEvent, StatusSink};

const ORIGIN: &str = "stream";

/// Granularity of cancellable waits. Bounds how long `stop` can lag behind
/// a reader parked in a cooldown or pacing sleep.
const WAIT_STEP: Duration = Duration::from_millis(50);

/// Lifecycle of a stream source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceState {
    /// The reader is delivering frames.
    Fetching,
    /// Reads are failing; the reader is cycling release / cooldown / reopen.
    Failing,
    /// The failure budget is spent; the reader has exited for good.
    Terminated,
    /// `stop` was requested; the reader exited cleanly.
    Stopped,
}

/// Counters and state snapshot for one stream source.
#[derive(Clone, Debug)]
pub struct StreamStats {
    pub frames_captured: u64,
    pub failure_count: u32,
    pub state: SourceState,
    pub link: String,
}

/// Background frame fetcher for a continuous stream.
///
/// Dropping the source stops the reader and waits for it to exit.
pub struct StreamSource {
    shared: Arc<Shared>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

struct Shared {
    link: String,
    config: StreamConfig,
    buffer: FrameBuffer,
    sink: Arc<dyn StatusSink>,
    cancel: AtomicBool,
    state: Mutex<SourceState>,
    frames_captured: AtomicU64,
    failure_count: AtomicU32,
}

impl StreamSource {
    /// Open `link` with default policy, logging status through [`LogSink`].
    pub fn open(link: &str) -> Result<Self> {
        Self::with_config(link, StreamConfig::default())
    }

    /// Open `link` with an explicit reader policy.
    pub fn with_config(link: &str, config: StreamConfig) -> Result<Self> {
        classify_link(link)?;
        Ok(Self::with_parts(
            link,
            Arc::new(LinkConnector::new()),
            config,
            Arc::new(LogSink),
        ))
    }

    /// Assemble a source from injected collaborators. The link is handed to
    /// `connector` as-is, with no scheme check.
    pub fn with_parts(
        link: &str,
        connector: Arc<dyn Connect>,
        config: StreamConfig,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        let shared = Arc::new(Shared {
            link: link.to_string(),
            config,
            buffer: FrameBuffer::new(),
            sink,
            cancel: AtomicBool::new(false),
            state: Mutex::new(SourceState::Fetching),
            frames_captured: AtomicU64::new(0),
            failure_count: AtomicU32::new(0),
        });
        let reader_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || pump(&reader_shared, connector.as_ref()));
        Self {
            shared,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Take the latest frame, blocking until one arrives.
    ///
    /// Once the source has terminated or stopped and the slot is drained,
    /// every call fails with an error naming the condition; consumers are
    /// never left blocking on a reader that will not come back.
    pub fn read(&self) -> Result<Frame> {
        match self.shared.buffer.take() {
            Some(frame) => Ok(frame),
            None => Err(self.shared.closed_error()),
        }
    }

    /// Like [`read`](Self::read), but gives up after `timeout`, returning
    /// `Ok(None)` when no frame arrived in time.
    pub fn read_timeout(&self, timeout: Duration) -> Result<Option<Frame>> {
        match self.shared.buffer.take_timeout(timeout) {
            TakeResult::Frame(frame) => Ok(Some(frame)),
            TakeResult::TimedOut => Ok(None),
            TakeResult::Closed => Err(self.shared.closed_error()),
        }
    }

    pub fn state(&self) -> SourceState {
        *self.shared.state_slot()
    }

    /// True while the reader is connected and delivering frames.
    pub fn is_healthy(&self) -> bool {
        self.state() == SourceState::Fetching
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            frames_captured: self.shared.frames_captured.load(Ordering::Relaxed),
            failure_count: self.shared.failure_count.load(Ordering::Relaxed),
            state: self.state(),
            link: self.shared.link.clone(),
        }
    }

    pub fn link(&self) -> &str {
        &self.shared.link
    }

    /// Ask the reader to exit and wait for it. Idempotent; a read already
    /// in flight finishes first, bounded by the session's own timeouts.
    pub fn stop(&self) {
        self.shared.cancel.store(true, Ordering::SeqCst);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("stream reader thread for {} panicked", self.shared.link);
                // A panicked reader never ran its exit path; close the
                // buffer here so blocked consumers still wake.
                self.shared.buffer.close();
            }
        }
    }
}

impl Drop for StreamSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn state_slot(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SourceState) {
        *self.state_slot() = state;
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn emit(&self, severity: Severity, message: String) {
        self.sink.emit(StatusEvent::new(severity, ORIGIN, message));
    }

    /// Repay one unit of the failure budget, never going below zero.
    fn repay_failure(&self) {
        let _ = self
            .failure_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            });
    }

    /// Sleep for `total`, waking early once cancellation is requested.
    fn wait(&self, total: Duration) {
        let mut remaining = total;
        while !self.cancelled() && !remaining.is_zero() {
            let step = remaining.min(WAIT_STEP);
            thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }

    /// Error handed to readers once the buffer is closed. The loop sets the
    /// exit state before closing the buffer, so the state read here is final.
    fn closed_error(&self) -> anyhow::Error {
        match *self.state_slot() {
            SourceState::Stopped => anyhow!("stream source for {} is stopped", self.link),
            _ => anyhow!(
                "stream source for {} terminated after {} failures",
                self.link,
                self.failure_count.load(Ordering::Relaxed)
            ),
        }
    }
}

/// Reader loop. Runs on the spawned thread until the source terminates or
/// is stopped; the single exit path below releases the live session and
/// closes the buffer.
fn pump(shared: &Shared, connector: &dyn Connect) {
    let threshold = shared.config.failure_threshold;
    shared.emit(
        Severity::Info,
        format!("started reading {}", shared.link),
    );

    let mut session = connector.open(&shared.link);
    let exit_state = loop {
        if shared.cancelled() {
            break SourceState::Stopped;
        }
        match session.read_one() {
            Ok(frame) => {
                shared.frames_captured.fetch_add(1, Ordering::Relaxed);
                shared.repay_failure();
                shared.set_state(SourceState::Fetching);
                shared.buffer.publish(frame);
                shared.wait(shared.config.pacing);
            }
            Err(err) => {
                let failures = shared.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
                shared.set_state(SourceState::Failing);
                if failures >= threshold {
                    shared.emit(
                        Severity::Error,
                        format!(
                            "read from {} failed ({:#}); giving up after {} failures",
                            shared.link, err, failures
                        ),
                    );
                    break SourceState::Terminated;
                }
                shared.emit(
                    Severity::Warning,
                    format!(
                        "read from {} failed ({} of {} tolerated): {:#}",
                        shared.link, failures, threshold, err
                    ),
                );
                session.release();
                shared.wait(shared.config.cooldown);
                if shared.cancelled() {
                    break SourceState::Stopped;
                }
                session = connector.open(&shared.link);
                shared.emit(Severity::Notice, format!("reopened {}", shared.link));
            }
        }
    };

    session.release();
    shared.set_state(exit_state);
    shared.buffer.close();
    if exit_state == SourceState::Stopped {
        shared.emit(Severity::Info, format!("stopped reading {}", shared.link));
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::Session;
    use crate::status::MemorySink;
    use anyhow::anyhow;

    struct FailingConnector;
    struct FailingSession;

    impl Connect for FailingConnector {
        fn open(&self, _link: &str) -> Box<dyn Session> {
            Box::new(FailingSession)
        }
    }

    impl Session for FailingSession {
        fn read_one(&mut self) -> Result<Frame> {
            Err(anyhow!("no feed"))
        }

        fn release(&mut self) {}
    }

    fn fast_config(threshold: u32) -> StreamConfig {
        StreamConfig {
            failure_threshold: threshold,
            cooldown: Duration::from_millis(1),
            pacing: Duration::ZERO,
        }
    }

    #[test]
    fn synthetic_stream_delivers_frames() {
        let source = StreamSource::with_config("stub://unit", fast_config(5)).unwrap();
        let frame = source.read().expect("first frame");
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        source.stop();
        assert_eq!(source.state(), SourceState::Stopped);
    }

    #[test]
    fn persistent_failure_terminates_the_source() {
        let sink = Arc::new(MemorySink::default());
        let source = StreamSource::with_parts(
            "stub://down",
            Arc::new(FailingConnector),
            fast_config(3),
            Arc::clone(&sink) as Arc<dyn StatusSink>,
        );

        // The buffer closes when the reader gives up, so a blocking read
        // observes termination as an error instead of hanging.
        let err = source.read().expect_err("terminated source");
        assert!(err.to_string().contains("terminated after 3 failures"));
        assert_eq!(source.state(), SourceState::Terminated);
        assert!(!source.is_healthy());

        let stats = source.stats();
        assert_eq!(stats.failure_count, 3);
        assert_eq!(stats.frames_captured, 0);

        // Two tolerated failures warn; the third is fatal and reported once.
        let severities: Vec<Severity> =
            sink.events().iter().map(|event| event.severity).collect();
        assert_eq!(
            severities.iter().filter(|s| **s == Severity::Warning).count(),
            2
        );
        assert_eq!(
            severities.iter().filter(|s| **s == Severity::Error).count(),
            1
        );
    }

    #[test]
    fn reads_after_termination_keep_failing() {
        let source = StreamSource::with_parts(
            "stub://down",
            Arc::new(FailingConnector),
            fast_config(1),
            Arc::new(MemorySink::default()),
        );
        assert!(source.read().is_err());
        assert!(source.read().is_err());
        assert!(source.read_timeout(Duration::from_millis(5)).is_err());
    }

    #[test]
    fn stop_is_idempotent_and_observable() {
        let source = StreamSource::open("stub://unit").unwrap();
        let _ = source.read();
        source.stop();
        source.stop();
        assert_eq!(source.state(), SourceState::Stopped);
        assert!(!source.is_healthy());
        assert_eq!(source.link(), "stub://unit");

        // A frame published just before the stop may still be pending; once
        // drained, reads name the stop instead of blocking.
        let err = loop {
            match source.read() {
                Ok(_) => continue,
                Err(err) => break err,
            }
        };
        assert!(err.to_string().contains("stopped"));
    }

    #[test]
    fn unsupported_scheme_is_rejected_up_front() {
        assert!(StreamSource::open("ftp://nowhere/feed").is_err());
    }
}
