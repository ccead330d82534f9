//! Streaming gateway node
//!
//! Run locally with custom parameters:
//!
//! ```text
//! BROKER_HOST=127.0.0.1 \
//! SUB_PORT=5556 \
//! SUB_TOPIC=processed \
//! HTTP_HOST=0.0.0.0 \
//! HTTP_PORT=8000 \
//! framebus-gateway
//! ```
//!
//! Open <http://localhost:8000/> for the viewer page, or point anything that
//! speaks MJPEG at `/stream.mjpg`.

use std::net::SocketAddr;

use anyhow::Context;
use framebus::{Gateway, GatewayConfig, TopicFilter};
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let broker_host = env_str("BROKER_HOST", "127.0.0.1");
    let sub_port = env_u16("SUB_PORT", 5556);
    let filter = TopicFilter::new(env_str("SUB_TOPIC", "processed"));
    let http_host = env_str("HTTP_HOST", "0.0.0.0");
    let http_port = env_u16("HTTP_PORT", 8000);

    let broker_addr: SocketAddr = format!("{broker_host}:{sub_port}")
        .parse()
        .context("invalid broker address")?;
    let http_addr: SocketAddr = format!("{http_host}:{http_port}")
        .parse()
        .context("invalid HTTP address")?;

    let gateway = Gateway::new(GatewayConfig::new(broker_addr, filter, http_addr));

    gateway
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("gateway failed")?;

    Ok(())
}
