//! The streaming gateway node
//!
//! Two roles share one latest-frame snapshot:
//!
//! - the **ingest** task (single writer) subscribes on the bus and swaps the
//!   snapshot on every validated envelope;
//! - the **serving** side (one lightweight stream per HTTP connection) reads
//!   the snapshot and pushes MJPEG parts, each connection at its own pace.
//!
//! HTTP client count never affects bus-side subscriber count: the gateway
//! holds exactly one bus subscription no matter how many browsers attach.

pub mod config;
pub mod ingest;
pub mod server;
pub mod snapshot;

pub use config::GatewayConfig;
pub use server::{spawn_http_server, GatewayServer};
pub use snapshot::{FrameSnapshot, SnapshotCell, SnapshotWatcher};

use std::sync::Arc;

use crate::error::Result;

/// The gateway node: ingest plus HTTP serving.
pub struct Gateway {
    config: GatewayConfig,
    cell: Arc<SnapshotCell>,
}

impl Gateway {
    /// Create a gateway for the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            cell: Arc::new(SnapshotCell::new()),
        }
    }

    /// The shared snapshot cell (exposed for tests and embedding).
    pub fn snapshots(&self) -> Arc<SnapshotCell> {
        Arc::clone(&self.cell)
    }

    /// Run the gateway until `shutdown` completes.
    ///
    /// Binds the HTTP server first (failure to bind is fatal for this node),
    /// then runs the ingest loop.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let server = spawn_http_server(&self.config, Arc::clone(&self.cell))?;

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = ingest::run_ingest(self.config, Arc::clone(&self.cell)) => result,
        };

        server.stop();
        result
    }

    /// Run the gateway forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }
}
