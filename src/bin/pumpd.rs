//! pumpd - continuous capture daemon
//!
//! This daemon:
//! 1. Loads capture settings from a config file and FRAMEPUMP_* variables
//! 2. Runs a StreamSource against the configured link
//! 3. Drains the latest frame and logs a health line periodically
//! 4. Stops the reader cleanly on Ctrl-C

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use framepump::{classify_link, CaptureConfig, LinkConnector, LogSink, StreamSource};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const HEALTH_INTERVAL: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = CaptureConfig::load()?;
    classify_link(&config.link)?;
    log::info!(
        "pumpd starting: link={} threshold={} cooldown={:?} pacing={:?}",
        config.link,
        config.stream.failure_threshold,
        config.stream.cooldown,
        config.stream.pacing
    );

    let source = StreamSource::with_parts(
        &config.link,
        Arc::new(LinkConnector::with_http_config(config.http.clone())),
        config.stream.clone(),
        Arc::new(LogSink),
    );

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let mut frames_seen = 0u64;
    let mut last_health_log = Instant::now();

    while running.load(Ordering::SeqCst) {
        if let Some(frame) = source.read_timeout(POLL_INTERVAL)? {
            frames_seen += 1;
            log::debug!(
                "frame #{}: {}x{} ({} bytes, {:?} old)",
                frame.seq(),
                frame.width,
                frame.height,
                frame.byte_len(),
                frame.captured_at().elapsed()
            );
        }

        if last_health_log.elapsed() >= HEALTH_INTERVAL {
            let stats = source.stats();
            log::info!(
                "stream health={} state={:?} frames={} failures={} link={}",
                source.is_healthy(),
                stats.state,
                stats.frames_captured,
                stats.failure_count,
                stats.link
            );
            last_health_log = Instant::now();
        }
    }

    log::info!("shutdown signal received, stopping stream...");
    source.stop();
    log::info!("pumpd stopped after {} frames", frames_seen);
    Ok(())
}
