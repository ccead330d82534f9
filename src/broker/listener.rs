//! Broker listeners
//!
//! Handles the two TCP accept loops (producer ingress, subscriber egress)
//! and spawns one task per connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Semaphore};

use crate::broker::config::BrokerConfig;
use crate::broker::registry::SubscriptionRegistry;
use crate::envelope::wire::{read_envelope, read_subscribe, write_envelope};
use crate::error::Result;
use crate::stats::BrokerStats;

/// The message broker: a stateless relay between producers and subscribers.
pub struct Broker {
    config: BrokerConfig,
    registry: Arc<SubscriptionRegistry>,
    stats: Arc<BrokerStats>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

/// The broker's two bound listeners.
///
/// Binding is separated from serving so callers (and tests) can bind port 0
/// and learn the assigned addresses before the accept loops start.
pub struct BrokerListeners {
    ingress: TcpListener,
    egress: TcpListener,
}

impl BrokerListeners {
    /// Local address producers connect to.
    pub fn ingress_addr(&self) -> Result<SocketAddr> {
        Ok(self.ingress.local_addr()?)
    }

    /// Local address subscribers connect to.
    pub fn egress_addr(&self) -> Result<SocketAddr> {
        Ok(self.egress.local_addr()?)
    }
}

impl Broker {
    /// Create a new broker with the given configuration.
    pub fn new(config: BrokerConfig) -> Self {
        let stats = Arc::new(BrokerStats::new());
        let registry = Arc::new(SubscriptionRegistry::new(
            config.subscriber_queue_capacity,
            Arc::clone(&stats),
        ));

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry,
            stats,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the subscription registry.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Get a reference to the relay stats.
    pub fn stats(&self) -> &Arc<BrokerStats> {
        &self.stats
    }

    /// Bind both listeners.
    ///
    /// Failure to bind is the one fatal startup error a broker has.
    pub async fn bind(&self) -> Result<BrokerListeners> {
        let ingress = TcpListener::bind(self.config.ingress_addr).await?;
        let egress = TcpListener::bind(self.config.egress_addr).await?;

        tracing::info!(
            ingress = %ingress.local_addr()?,
            egress = %egress.local_addr()?,
            "Broker listening"
        );

        Ok(BrokerListeners { ingress, egress })
    }

    /// Run the broker.
    ///
    /// This method blocks until the broker is shut down.
    pub async fn run(&self) -> Result<()> {
        let listeners = self.bind().await?;
        self.serve(listeners, std::future::pending()).await
    }

    /// Run the broker with graceful shutdown.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listeners = self.bind().await?;
        self.serve(listeners, shutdown).await
    }

    /// Serve on already-bound listeners until `shutdown` completes.
    pub async fn serve<F>(&self, listeners: BrokerListeners, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let stats_handle = self.spawn_stats_task();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listeners) => result,
        };

        stats_handle.abort();
        result
    }

    async fn accept_loop(&self, listeners: &BrokerListeners) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listeners.ingress.accept() => match accepted {
                    Ok((socket, peer_addr)) => self.handle_ingress(socket, peer_addr),
                    Err(e) => tracing::error!(error = %e, "Failed to accept producer connection"),
                },
                accepted = listeners.egress.accept() => match accepted {
                    Ok((socket, peer_addr)) => self.handle_egress(socket, peer_addr),
                    Err(e) => tracing::error!(error = %e, "Failed to accept subscriber connection"),
                },
            }
        }
    }

    /// Producer connection: read envelopes, relay each to matching
    /// subscribers. Reading sequentially from one connection is what
    /// preserves per-producer order.
    fn handle_ingress(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let Some(permit) = self.acquire_permit(peer_addr) else {
            return;
        };
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.configure_socket(&socket);

        tracing::debug!(session_id, peer = %peer_addr, "Producer connected");

        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let _permit = permit;
            let mut socket = socket;
            stats.producer_connected();

            loop {
                match read_envelope(&mut socket).await {
                    Ok(Some(envelope)) => {
                        stats.record_ingress();
                        let matched = registry.relay(envelope).await;
                        tracing::trace!(session_id, matched, "Envelope relayed");
                    }
                    Ok(None) => {
                        tracing::debug!(session_id, "Producer disconnected");
                        break;
                    }
                    Err(e) => {
                        // Framing can no longer be trusted; drop the connection.
                        tracing::warn!(session_id, error = %e, "Producer connection error");
                        break;
                    }
                }
            }

            stats.producer_disconnected();
        });
    }

    /// Subscriber connection: read the subscribe frame, register, then
    /// forward matching envelopes until the peer goes away.
    fn handle_egress(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let Some(permit) = self.acquire_permit(peer_addr) else {
            return;
        };
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.configure_socket(&socket);

        tracing::debug!(session_id, peer = %peer_addr, "Subscriber connected");

        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let _permit = permit;
            let (mut reader, mut writer) = socket.into_split();

            let filter = match read_subscribe(&mut reader).await {
                Ok(Some(filter)) => filter,
                Ok(None) => {
                    tracing::debug!(session_id, "Subscriber closed before subscribing");
                    return;
                }
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "Bad subscribe frame");
                    return;
                }
            };

            let mut rx = registry.register(session_id, filter).await;

            loop {
                tokio::select! {
                    delivery = rx.recv() => match delivery {
                        Ok(envelope) => {
                            if let Err(e) = write_envelope(&mut writer, &envelope).await {
                                tracing::debug!(session_id, error = %e, "Subscriber write failed");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            stats.record_dropped(n);
                            tracing::warn!(session_id, dropped = n, "Subscriber behind, dropped oldest");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = wait_for_close(&mut reader) => {
                        tracing::debug!(session_id, "Subscriber disconnected");
                        break;
                    }
                }
            }

            registry.deregister(session_id).await;
        });
    }

    fn acquire_permit(
        &self,
        peer_addr: SocketAddr,
    ) -> Option<Option<tokio::sync::OwnedSemaphorePermit>> {
        match self.connection_semaphore {
            Some(ref sem) => match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(Some(permit)),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    None
                }
            },
            None => Some(None),
        }
    }

    fn configure_socket(&self, socket: &TcpStream) {
        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
            }
        }
    }

    fn spawn_stats_task(&self) -> tokio::task::JoinHandle<()> {
        let stats = Arc::clone(&self.stats);
        let interval = self.config.stats_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let snap = stats.snapshot();
                tracing::info!(
                    ingress = snap.envelopes_in,
                    delivered = snap.envelopes_out,
                    dropped = snap.envelopes_dropped,
                    producers = snap.active_producers,
                    subscribers = snap.active_subscribers,
                    "Relay stats"
                );
            }
        })
    }
}

/// Resolves when the subscriber's read half closes (or sends anything,
/// which a well-behaved subscriber never does after its subscribe frame).
async fn wait_for_close(reader: &mut OwnedReadHalf) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}
