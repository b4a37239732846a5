//! Synthetic frame sessions for `stub://` links.
//!
//! Useful for demos and tests that need a feed which never touches the
//! network and never fails. Pixels follow a deterministic pattern that
//! changes every frame, so consumers can tell frames apart.

use anyhow::Result;

use crate::connect::Session;
use crate::frame::Frame;

pub const STUB_SCHEME: &str = "stub://";

const STUB_WIDTH: u32 = 640;
const STUB_HEIGHT: u32 = 480;

/// Session that generates frames instead of fetching them.
pub struct SyntheticSession {
    link: String,
    connected: bool,
    frame_count: u64,
}

impl SyntheticSession {
    pub fn open(link: &str) -> Self {
        Self {
            link: link.to_string(),
            connected: false,
            frame_count: 0,
        }
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let pixel_count = (STUB_WIDTH * STUB_HEIGHT * 3) as usize; // RGB
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            // Mix position and frame count so consecutive frames differ.
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        pixels
    }
}

impl Session for SyntheticSession {
    fn read_one(&mut self) -> Result<Frame> {
        if !self.connected {
            log::info!("SyntheticSession: serving {}", self.link);
            self.connected = true;
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Ok(Frame::new(pixels, STUB_WIDTH, STUB_HEIGHT, self.frame_count))
    }

    fn release(&mut self) {
        self.connected = false;
    }
}
