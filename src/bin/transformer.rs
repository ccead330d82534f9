//! Transformer node
//!
//! Run locally with custom parameters:
//!
//! ```text
//! BROKER_HOST=127.0.0.1 \
//! SUB_PORT=5556 \
//! PUB_PORT=5555 \
//! SUB_TOPIC=raw \
//! PUB_TOPIC=processed \
//! JPEG_QUALITY_OUT=85 \
//! framebus-transformer
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use framebus::transform::{Grayscale, Transformer, TransformerConfig};
use framebus::{Topic, TopicFilter};
use tracing_subscriber::EnvFilter;

fn env_str(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = env_str("BROKER_HOST", "127.0.0.1");
    let sub_port = env_u16("SUB_PORT", 5556);
    let pub_port = env_u16("PUB_PORT", 5555);
    let sub_filter = TopicFilter::new(env_str("SUB_TOPIC", "raw"));
    let pub_topic = Topic::new(env_str("PUB_TOPIC", "processed")).context("invalid topic")?;
    let quality = env_u8("JPEG_QUALITY_OUT", 85);

    let sub_addr: SocketAddr = format!("{host}:{sub_port}")
        .parse()
        .context("invalid subscribe address")?;
    let pub_addr: SocketAddr = format!("{host}:{pub_port}")
        .parse()
        .context("invalid publish address")?;

    let config = TransformerConfig::new(sub_addr, pub_addr, sub_filter, pub_topic)
        .jpeg_quality(quality);
    let transformer = Transformer::new(config, Grayscale);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        result = transformer.run() => {
            result.context("transformer failed")?;
        }
    }

    Ok(())
}
