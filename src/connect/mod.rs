//! Connection primitives.
//!
//! Responsibilities:
//! - Define the [`Session`] contract a live frame producer satisfies and the
//!   [`Connect`] factory that opens sessions from a link.
//! - Classify links so callers can reject unsupported schemes up front.
//! - Bundle connectors for `stub://` synthetic feeds and, with the `http`
//!   feature, JPEG snapshot / MJPEG endpoints.
//!
//! Opening is lazy by contract: a connector returns a session without doing
//! network I/O, and the first `read_one` pays for connection setup. That
//! keeps `open` infallible and folds connect errors into the same counted
//! failure path as read errors.

use anyhow::{anyhow, Result};

use crate::frame::Frame;

#[cfg(feature = "http")]
pub mod http;
pub mod synthetic;

#[cfg(feature = "http")]
pub use http::HttpSession;
pub use synthetic::SyntheticSession;

/// One live connection to a frame producer.
///
/// Sessions are driven by a single owner and are not shared across threads,
/// but they move into the reader thread, hence `Send`.
pub trait Session: Send {
    /// Fetch the next frame, blocking until one arrives or the attempt fails.
    fn read_one(&mut self) -> Result<Frame>;

    /// Drop transport resources held by the session. Called on every exit
    /// path, including after a failed read; must be idempotent.
    fn release(&mut self);
}

/// Factory that turns a link into a fresh [`Session`].
pub trait Connect: Send + Sync {
    fn open(&self, link: &str) -> Box<dyn Session>;
}

// ----------------------------------------------------------------------------
// Link classification
// ----------------------------------------------------------------------------

/// Transport family a link resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    /// Deterministic synthetic feed (`stub://...`).
    Stub,
    /// HTTP(S) snapshot or MJPEG endpoint.
    #[cfg(feature = "http")]
    Http,
}

/// Work out which bundled session type serves `link`, or error for schemes
/// nothing bundled here can speak.
pub fn classify_link(link: &str) -> Result<LinkKind> {
    if link.starts_with(synthetic::STUB_SCHEME) {
        return Ok(LinkKind::Stub);
    }
    #[cfg(feature = "http")]
    {
        let parsed = url::Url::parse(link)
            .map_err(|e| anyhow!("unparseable link {:?}: {}", link, e))?;
        match parsed.scheme() {
            "http" | "https" => Ok(LinkKind::Http),
            other => Err(anyhow!("unsupported link scheme {:?} in {:?}", other, link)),
        }
    }
    #[cfg(not(feature = "http"))]
    Err(anyhow!(
        "unsupported link {:?} (http/https links need the `http` feature)",
        link
    ))
}

// ----------------------------------------------------------------------------
// Default connector
// ----------------------------------------------------------------------------

/// Default connector: picks a bundled session type from the link scheme.
#[derive(Clone, Debug, Default)]
pub struct LinkConnector {
    #[cfg(feature = "http")]
    http: crate::config::HttpConfig,
}

impl LinkConnector {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "http")]
    pub fn with_http_config(http: crate::config::HttpConfig) -> Self {
        Self { http }
    }
}

impl Connect for LinkConnector {
    fn open(&self, link: &str) -> Box<dyn Session> {
        match classify_link(link) {
            Ok(LinkKind::Stub) => Box::new(SyntheticSession::open(link)),
            #[cfg(feature = "http")]
            Ok(LinkKind::Http) => Box::new(HttpSession::open(link, self.http.clone())),
            // Unsupported links still open; every read then fails with the
            // classification error, which the callers count like any other.
            Err(err) => Box::new(UnsupportedSession {
                message: err.to_string(),
            }),
        }
    }
}

struct UnsupportedSession {
    message: String,
}

impl Session for UnsupportedSession {
    fn read_one(&mut self) -> Result<Frame> {
        Err(anyhow!("{}", self.message))
    }

    fn release(&mut self) {}
}
