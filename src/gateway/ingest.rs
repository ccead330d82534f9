//! Gateway ingest task
//!
//! The single writer of the latest-frame snapshot. Subscribes on the bus,
//! validates each envelope at the boundary, and swaps the snapshot in.
//! Malformed envelopes are dropped here and never reach an HTTP client.

use std::sync::Arc;

use tokio::time::Instant;

use crate::client::{BusSubscriber, ClientConfig};
use crate::error::Result;
use crate::gateway::config::GatewayConfig;
use crate::gateway::snapshot::{FrameSnapshot, SnapshotCell};

/// Run the ingest loop forever, reconnecting on bus loss.
pub async fn run_ingest(config: GatewayConfig, cell: Arc<SnapshotCell>) -> Result<()> {
    let mut subscriber = BusSubscriber::new(
        ClientConfig::new(config.broker_addr),
        config.filter.clone(),
    );
    subscriber.connect_with_retry().await;

    tracing::info!(filter = %config.filter, "Gateway ingest started");

    let mut frames: u64 = 0;
    let mut last_log = Instant::now();

    loop {
        match subscriber.recv().await {
            Ok(Some(envelope)) => {
                let metadata = match envelope.decode_metadata() {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        tracing::warn!(topic = %envelope.topic, error = %e, "Dropping envelope with bad metadata");
                        continue;
                    }
                };
                if envelope.payload.is_empty() {
                    tracing::warn!(seq = metadata.seq, "Dropping envelope with empty payload");
                    continue;
                }

                let seq = metadata.seq;
                cell.store(FrameSnapshot {
                    metadata,
                    payload: envelope.payload,
                });

                frames += 1;
                let elapsed = last_log.elapsed();
                if elapsed.as_secs() >= 1 {
                    let fps = frames as f64 / elapsed.as_secs_f64();
                    tracing::info!(fps = %format!("{fps:.1}"), last_seq = seq, "Ingest rate");
                    frames = 0;
                    last_log = Instant::now();
                }
            }
            Ok(None) => {
                tracing::warn!("Bus connection closed, reconnecting");
                subscriber.connect_with_retry().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Bus receive failed, reconnecting");
                subscriber.connect_with_retry().await;
            }
        }
    }
}
