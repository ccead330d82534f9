//! Broker node
//!
//! Run locally with custom parameters:
//!
//! ```text
//! BROKER_BIND_HOST=127.0.0.1 \
//! PUB_PORT=5555 \
//! SUB_PORT=5556 \
//! QUEUE_CAPACITY=64 \
//! framebus-broker
//! ```
//!
//! `PUB_PORT` is where publishers connect, `SUB_PORT` where subscribers
//! connect.

use std::net::SocketAddr;

use anyhow::Context;
use framebus::{Broker, BrokerConfig};
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

fn env_usize(name: &str, default: usize) -> usize {
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

    let host = env_str("BROKER_BIND_HOST", "0.0.0.0");
    let pub_port = env_u16("PUB_PORT", 5555);
    let sub_port = env_u16("SUB_PORT", 5556);
    let queue_capacity = env_usize("QUEUE_CAPACITY", 64);

    let ingress: SocketAddr = format!("{host}:{pub_port}")
        .parse()
        .context("invalid ingress address")?;
    let egress: SocketAddr = format!("{host}:{sub_port}")
        .parse()
        .context("invalid egress address")?;

    let config = BrokerConfig::new(ingress, egress).subscriber_queue_capacity(queue_capacity);
    let broker = Broker::new(config);

    broker
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("broker failed")?;

    Ok(())
}
