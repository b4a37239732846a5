//! HTTP frame sessions.
//!
//! `HttpSession` serves http(s) links in one of two modes, sniffed from the
//! Content-Type of the first response:
//! - multipart responses are treated as an MJPEG stream, and frames are
//!   scanned out of the body as it arrives;
//! - anything else is treated as a JPEG snapshot endpoint, and every read
//!   issues a fresh GET.
//!
//! Connection setup happens on the first `read_one`, so connect errors flow
//! through the same counted failure path as read errors.

use anyhow::{anyhow, Context, Result};
use std::io::Read;

use image::GenericImageView;

use crate::config::HttpConfig;
use crate::connect::Session;
use crate::frame::Frame;

/// Session for a JPEG snapshot or MJPEG endpoint.
pub struct HttpSession {
    link: String,
    config: HttpConfig,
    agent: ureq::Agent,
    mode: Option<Mode>,
    frame_count: u64,
}

enum Mode {
    Mjpeg(MjpegReader),
    Snapshot,
}

impl HttpSession {
    pub fn open(link: &str, config: HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.read_timeout)
            .build();
        Self {
            link: link.to_string(),
            config,
            agent,
            mode: None,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        let response = self
            .agent
            .get(&self.link)
            .call()
            .with_context(|| format!("connect to {}", self.link))?;
        let content_type = response.header("Content-Type").unwrap_or("");
        if content_type.to_lowercase().contains("multipart") {
            log::info!("HttpSession: {} is an mjpeg stream", self.link);
            self.mode = Some(Mode::Mjpeg(MjpegReader::new(
                response.into_reader(),
                self.config.max_frame_bytes,
            )));
        } else {
            log::info!("HttpSession: {} serves jpeg snapshots", self.link);
            self.mode = Some(Mode::Snapshot);
        }
        Ok(())
    }
}

impl Session for HttpSession {
    fn read_one(&mut self) -> Result<Frame> {
        if self.mode.is_none() {
            self.connect()?;
        }
        let mode = self
            .mode
            .as_mut()
            .ok_or_else(|| anyhow!("http session not connected"))?;
        let jpeg_bytes = match mode {
            Mode::Mjpeg(reader) => reader.read_next_jpeg(),
            Mode::Snapshot => {
                fetch_snapshot(&self.agent, &self.link, self.config.max_frame_bytes)
            }
        }?;

        let (pixels, width, height) = decode_jpeg(&jpeg_bytes)?;
        self.frame_count += 1;
        Ok(Frame::new(pixels, width, height, self.frame_count))
    }

    fn release(&mut self) {
        if self.mode.take().is_some() {
            log::debug!("HttpSession: released {}", self.link);
        }
    }
}

// ----------------------------------------------------------------------------
// MJPEG scanning
// ----------------------------------------------------------------------------

struct MjpegReader {
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
    max_frame_bytes: usize,
}

impl MjpegReader {
    fn new(reader: Box<dyn Read + Send>, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
            max_frame_bytes,
        }
    }

    /// Pull bytes until the buffer holds one complete JPEG, then cut it out.
    /// Multipart boundary lines between frames are skipped by the SOI scan.
    fn read_next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            if self.buffer.len() > self.max_frame_bytes {
                self.buffer.clear();
                return Err(anyhow!(
                    "no complete frame within {} bytes of mjpeg data",
                    self.max_frame_bytes
                ));
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Err(anyhow!("mjpeg stream ended"));
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }
}

/// Locate one complete JPEG (SOI through EOI) in `buffer`.
fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let start = buffer.windows(2).position(|w| w == [0xFF, 0xD8])?;
    let body = &buffer[start + 2..];
    let rel_end = body.windows(2).position(|w| w == [0xFF, 0xD9])?;
    Some((start, start + 2 + rel_end + 2))
}

// ----------------------------------------------------------------------------
// Snapshot fetch and decode
// ----------------------------------------------------------------------------

fn fetch_snapshot(agent: &ureq::Agent, link: &str, max_bytes: usize) -> Result<Vec<u8>> {
    let response = agent
        .get(link)
        .call()
        .with_context(|| format!("fetch jpeg snapshot from {}", link))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut bytes)
        .context("read jpeg snapshot")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty jpeg snapshot"));
    }
    if bytes.len() > max_bytes {
        return Err(anyhow!("jpeg snapshot exceeded {} bytes", max_bytes));
    }
    Ok(bytes)
}

fn decode_jpeg(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let image = image::load_from_memory(bytes).context("decode jpeg")?;
    let (width, height) = image.dimensions();
    let rgb = image.into_rgb8();
    Ok((rgb.into_raw(), width, height))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
