//! framepump
//!
//! Latest-frame capture for live network video feeds.
//!
//! # Architecture
//!
//! Two fetchers sit on top of a shared connection contract:
//!
//! - [`StreamSource`] runs a background reader that keeps exactly the most
//!   recent frame available, rides out transient faults with a cooldown and
//!   reconnect cycle, and terminates observably once its failure budget is
//!   spent.
//! - [`StillFetcher`] grabs a single frame per call, with the same counted
//!   failure bookkeeping and no background work.
//!
//! Consumers that poll slower than the feed produces always pick up the
//! newest frame; frames never queue. Status flows through an injectable
//! [`StatusSink`], so embedders can route notices wherever they like.
//!
//! # Module Structure
//!
//! - `frame`: frame payloads and the single-slot handoff buffer
//! - `connect`: the `Session`/`Connect` contract plus bundled HTTP and
//!   synthetic connectors
//! - `stream`: continuous capture with the failure budget
//! - `still`: one-shot capture
//! - `status`: severity-tagged status events and sinks
//! - `config`: reader policy, HTTP knobs, and daemon config loading

pub mod config;
pub mod connect;
pub mod frame;
pub mod status;
pub mod still;
pub mod stream;

pub use config::{CaptureConfig, HttpConfig, StreamConfig};
#[cfg(feature = "http")]
pub use connect::HttpSession;
pub use connect::{classify_link, Connect, LinkConnector, LinkKind, Session, SyntheticSession};
pub use frame::{Frame, FrameBuffer, TakeResult};
pub use status::{LogSink, MemorySink, Severity, StatusEvent, StatusSink};
pub use still::StillFetcher;
pub use stream::{SourceState, StreamSource, StreamStats};
