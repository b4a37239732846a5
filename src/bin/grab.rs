//! grab - one-shot still frame fetch
//!
//! Fetches a single frame from a direct image link (or a stub:// feed),
//! prints its dimensions, and optionally re-encodes it to a JPEG file.
//! Exits nonzero when the fetch fails so scripts can branch on the result.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use framepump::{Frame, HttpConfig, LinkConnector, LogSink, StillFetcher};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Direct link to a single image resource (http(s)://... or stub://...).
    #[arg(long, env = "FRAMEPUMP_LINK")]
    link: String,
    /// Write the fetched frame to this path as JPEG.
    #[arg(long)]
    out: Option<PathBuf>,
    /// HTTP connect/read timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.timeout_secs == 0 {
        return Err(anyhow!("timeout-secs must be >= 1"));
    }

    let http = HttpConfig {
        connect_timeout: Duration::from_secs(args.timeout_secs),
        read_timeout: Duration::from_secs(args.timeout_secs),
        ..HttpConfig::default()
    };
    let fetcher = StillFetcher::with_parts(
        Arc::new(LinkConnector::with_http_config(http)),
        Arc::new(LogSink),
    );

    let frame = fetcher.read(&args.link)?;
    println!(
        "fetched {}x{} frame ({} bytes) from {}",
        frame.width,
        frame.height,
        frame.byte_len(),
        args.link
    );

    if let Some(out) = &args.out {
        write_jpeg(&frame, out)?;
        println!("wrote {}", out.display());
    }

    Ok(())
}

fn write_jpeg(frame: &Frame, path: &Path) -> Result<()> {
    let image = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
        .ok_or_else(|| anyhow!("frame pixel buffer does not match its dimensions"))?;
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut encoder = image::codecs::jpeg::JpegEncoder::new(BufWriter::new(file));
    encoder
        .encode_image(&image)
        .with_context(|| format!("encode jpeg to {}", path.display()))?;
    Ok(())
}
