//! Frame payload and the latest-wins handoff buffer.
//!
//! - `Frame`: one decoded image payload, produced per successful fetch.
//! - `FrameBuffer`: single-slot holder of the most recent frame.
//!
//! The buffer is the only point where a reader thread and the consumer meet.
//! It never holds more than one frame and keeps no backlog: a publish always
//! replaces any unconsumed value, so a consumer that polls slower than the
//! stream produces simply skips frames.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One decoded frame. Pixels are tightly packed RGB8, row major.
///
/// Frames are immutable: a session produces them, the buffer hands them over,
/// the consumer owns them. `seq` is assigned by the producing session and
/// increases per successful read on that session.
pub struct Frame {
    /// Packed RGB8 pixel data, `width * height * 3` bytes.
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    seq: u64,
    captured_at: Instant,
}

impl Frame {
    /// Build a frame from packed RGB8 pixels. Called by sessions.
    pub fn new(data: Vec<u8>, width: u32, height: u32, seq: u64) -> Self {
        Self {
            data,
            width,
            height,
            seq,
            captured_at: Instant::now(),
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.data
    }

    /// Sequence number assigned by the producing session (1-based).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Monotonic instant the frame was produced.
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Pixel bytes are deliberately left out.
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("seq", &self.seq)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// FrameBuffer
// ----------------------------------------------------------------------------

/// Single-slot, latest-wins frame buffer.
///
/// `publish` never blocks and replaces any unconsumed frame. `take` blocks
/// until a frame is available or the buffer is closed. Closing wakes all
/// waiters; a frame published before the close is still delivered once.
pub struct FrameBuffer {
    slot: Mutex<Slot>,
    ready: Condvar,
}

#[derive(Default)]
struct Slot {
    frame: Option<Frame>,
    closed: bool,
}

/// Outcome of a bounded wait on the buffer.
#[derive(Debug)]
pub enum TakeResult {
    /// A frame arrived within the wait window.
    Frame(Frame),
    /// No frame arrived before the timeout.
    TimedOut,
    /// The buffer is closed and drained; no frame will ever arrive.
    Closed,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            ready: Condvar::new(),
        }
    }

    /// Publish a frame, replacing any unconsumed one.
    pub fn publish(&self, frame: Frame) {
        let mut slot = self.lock();
        slot.frame = Some(frame);
        self.ready.notify_all();
    }

    /// Take the buffered frame, blocking until one is published.
    ///
    /// Returns `None` once the buffer is closed and drained.
    pub fn take(&self) -> Option<Frame> {
        let mut slot = self.lock();
        loop {
            if let Some(frame) = slot.frame.take() {
                return Some(frame);
            }
            if slot.closed {
                return None;
            }
            slot = self
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Bounded-wait variant of `take`.
    pub fn take_timeout(&self, timeout: Duration) -> TakeResult {
        let deadline = Instant::now() + timeout;
        let mut slot = self.lock();
        loop {
            if let Some(frame) = slot.frame.take() {
                return TakeResult::Frame(frame);
            }
            if slot.closed {
                return TakeResult::Closed;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return TakeResult::TimedOut;
            }
            slot = self
                .ready
                .wait_timeout(slot, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Non-blocking take.
    pub fn try_take(&self) -> Option<Frame> {
        self.lock().frame.take()
    }

    /// Close the buffer and wake every blocked taker. Idempotent.
    pub fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        self.ready.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // The slot is a plain Option; its contents stay valid even if a
        // panicking holder poisoned the mutex.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
