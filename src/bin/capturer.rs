//! Capturer node
//!
//! Run locally with custom parameters:
//!
//! ```text
//! BROKER_HOST=127.0.0.1 \
//! PUB_PORT=5555 \
//! TOPIC=raw \
//! FRAMES_DIR=./frames \
//! PUBLISH_EVERY_MS=100 \
//! JPEG_QUALITY=80 \
//! LOOP=true \
//! framebus-capturer
//! ```
//!
//! With no `FRAMES_DIR` set, a synthetic test pattern is published instead,
//! useful for bringing the pipeline up without any video on disk.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use framebus::capture::{Capturer, CapturerConfig, JpegDirSource, TestPatternSource};
use framebus::Topic;
use tracing_subscriber::EnvFilter;

fn env_str(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u8(name: &str, default: u8) -> u8 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        Err(_) => default,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = env_str("BROKER_HOST", "127.0.0.1");
    let port = env_u64("PUB_PORT", 5555) as u16;
    let topic = Topic::new(env_str("TOPIC", "raw")).context("invalid topic")?;
    let interval = Duration::from_millis(env_u64("PUBLISH_EVERY_MS", 100));
    let quality = env_u8("JPEG_QUALITY", 80);
    let looping = env_bool("LOOP", true);

    let broker_addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid broker address")?;

    let config = CapturerConfig::new(broker_addr, topic)
        .publish_interval(interval)
        .jpeg_quality(quality)
        .loop_source(looping);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    match std::env::var("FRAMES_DIR") {
        Ok(dir) => {
            let source = JpegDirSource::open(&dir)
                .with_context(|| format!("cannot open frame directory {dir}"))?;
            let mut capturer = Capturer::new(config.source_label("video"), source);
            capturer.run_until(shutdown).await.context("capturer failed")?;
        }
        Err(_) => {
            let source = TestPatternSource::new(
                env_u64("PATTERN_WIDTH", 320) as u32,
                env_u64("PATTERN_HEIGHT", 240) as u32,
                env_u64("PATTERN_FRAMES", 250),
            );
            let mut capturer = Capturer::new(config.source_label("test-pattern"), source);
            capturer.run_until(shutdown).await.context("capturer failed")?;
        }
    }

    Ok(())
}
