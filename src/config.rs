//! Capture configuration.
//!
//! `StreamConfig` and `HttpConfig` are plain data consumed by the library;
//! their defaults are the production values. `CaptureConfig` layers an
//! optional JSON file (named by `FRAMEPUMP_CONFIG`) under `FRAMEPUMP_*`
//! environment overrides for the daemon binary.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(20);
pub const DEFAULT_PACING: Duration = Duration::from_millis(15);

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_FRAME_BYTES: usize = 5 * 1024 * 1024;

/// Reader-loop policy for a continuous stream source.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Net failures tolerated before the reader gives up permanently.
    pub failure_threshold: u32,
    /// Pause between releasing a failed session and opening a fresh one,
    /// so a struggling or rate-limiting server is not hammered.
    pub cooldown: Duration,
    /// Delay between successful fetches, bounding pressure on a fast stream.
    pub pacing: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
            pacing: DEFAULT_PACING,
        }
    }
}

/// Knobs for the bundled HTTP sessions.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// TCP connect timeout for session establishment.
    pub connect_timeout: Duration,
    /// Per-read timeout, so a stalled server becomes a counted failure
    /// instead of a hung reader.
    pub read_timeout: Duration,
    /// Upper bound on bytes buffered for a single frame.
    pub max_frame_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

// ----------------------------------------------------------------------------
// Daemon configuration (file + environment)
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    link: Option<String>,
    stream: Option<StreamConfigFile>,
    http: Option<HttpConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    failure_threshold: Option<u32>,
    cooldown_secs: Option<u64>,
    pacing_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct HttpConfigFile {
    connect_timeout_secs: Option<u64>,
    read_timeout_secs: Option<u64>,
    max_frame_bytes: Option<usize>,
}

/// Configuration for the `pumpd` daemon.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub link: String,
    pub stream: StreamConfig,
    pub http: HttpConfig,
}

impl CaptureConfig {
    /// Load from the optional `FRAMEPUMP_CONFIG` JSON file, then apply
    /// `FRAMEPUMP_*` environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FRAMEPUMP_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CaptureConfigFile) -> Self {
        let defaults = StreamConfig::default();
        let stream = StreamConfig {
            failure_threshold: file
                .stream
                .as_ref()
                .and_then(|stream| stream.failure_threshold)
                .unwrap_or(defaults.failure_threshold),
            cooldown: file
                .stream
                .as_ref()
                .and_then(|stream| stream.cooldown_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cooldown),
            pacing: file
                .stream
                .as_ref()
                .and_then(|stream| stream.pacing_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.pacing),
        };
        let http_defaults = HttpConfig::default();
        let http = HttpConfig {
            connect_timeout: file
                .http
                .as_ref()
                .and_then(|http| http.connect_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(http_defaults.connect_timeout),
            read_timeout: file
                .http
                .as_ref()
                .and_then(|http| http.read_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(http_defaults.read_timeout),
            max_frame_bytes: file
                .http
                .as_ref()
                .and_then(|http| http.max_frame_bytes)
                .unwrap_or(http_defaults.max_frame_bytes),
        };
        Self {
            link: file.link.unwrap_or_default(),
            stream,
            http,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(link) = std::env::var("FRAMEPUMP_LINK") {
            if !link.trim().is_empty() {
                self.link = link;
            }
        }
        if let Ok(value) = std::env::var("FRAMEPUMP_FAILURE_THRESHOLD") {
            let threshold: u32 = value
                .parse()
                .map_err(|_| anyhow!("FRAMEPUMP_FAILURE_THRESHOLD must be an integer"))?;
            self.stream.failure_threshold = threshold;
        }
        if let Ok(value) = std::env::var("FRAMEPUMP_COOLDOWN_SECS") {
            let seconds: u64 = value.parse().map_err(|_| {
                anyhow!("FRAMEPUMP_COOLDOWN_SECS must be an integer number of seconds")
            })?;
            self.stream.cooldown = Duration::from_secs(seconds);
        }
        if let Ok(value) = std::env::var("FRAMEPUMP_PACING_MS") {
            let millis: u64 = value.parse().map_err(|_| {
                anyhow!("FRAMEPUMP_PACING_MS must be an integer number of milliseconds")
            })?;
            self.stream.pacing = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.link.trim().is_empty() {
            return Err(anyhow!(
                "no stream link configured; set FRAMEPUMP_LINK or the config file's \"link\""
            ));
        }
        if self.stream.failure_threshold == 0 {
            return Err(anyhow!("failure threshold must be at least 1"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<CaptureConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_defaults_match_documented_policy() {
        let cfg = StreamConfig::default();
        assert_eq!(cfg.failure_threshold, 5);
        assert_eq!(cfg.cooldown, Duration::from_secs(20));
        assert_eq!(cfg.pacing, Duration::from_millis(15));
    }

    #[test]
    fn empty_file_yields_defaults_without_link() {
        let cfg = CaptureConfig::from_file(CaptureConfigFile::default());
        assert!(cfg.link.is_empty());
        assert_eq!(cfg.stream.failure_threshold, DEFAULT_FAILURE_THRESHOLD);
        assert_eq!(cfg.http.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
        assert!(cfg.validate().is_err());
    }
}
