//! Broker configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default per-subscriber delivery queue capacity (high-water mark).
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Broker configuration options
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Address producers connect to.
    pub ingress_addr: SocketAddr,

    /// Address subscribers connect to.
    pub egress_addr: SocketAddr,

    /// Per-subscriber delivery queue capacity (high-water mark). When a
    /// subscriber falls this far behind, its oldest queued envelopes are
    /// dropped.
    pub subscriber_queue_capacity: usize,

    /// Maximum concurrent connections across both listeners (0 = unlimited).
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm).
    pub tcp_nodelay: bool,

    /// Interval between periodic stats log lines.
    pub stats_interval: Duration,
}

impl BrokerConfig {
    /// Create a config with the given ingress/egress bind addresses.
    pub fn new(ingress_addr: SocketAddr, egress_addr: SocketAddr) -> Self {
        Self {
            ingress_addr,
            egress_addr,
            subscriber_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_connections: 0, // Unlimited
            tcp_nodelay: true,  // Important for low latency
            stats_interval: Duration::from_secs(5),
        }
    }

    /// Set the per-subscriber queue capacity. Clamped to at least 1.
    pub fn subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity.max(1);
        self
    }

    /// Set maximum connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set TCP_NODELAY.
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the stats logging interval.
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new(
            "0.0.0.0:5555".parse().expect("static addr"),
            "0.0.0.0:5556".parse().expect("static addr"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();

        assert_eq!(config.ingress_addr.port(), 5555);
        assert_eq!(config.egress_addr.port(), 5556);
        assert_eq!(config.subscriber_queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_builder_chaining() {
        let ingress: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let egress: SocketAddr = "127.0.0.1:7001".parse().unwrap();
        let config = BrokerConfig::new(ingress, egress)
            .subscriber_queue_capacity(8)
            .max_connections(100)
            .tcp_nodelay(false)
            .stats_interval(Duration::from_secs(30));

        assert_eq!(config.ingress_addr, ingress);
        assert_eq!(config.egress_addr, egress);
        assert_eq!(config.subscriber_queue_capacity, 8);
        assert_eq!(config.max_connections, 100);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.stats_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_queue_capacity_clamped_to_one() {
        let config = BrokerConfig::default().subscriber_queue_capacity(0);

        assert_eq!(config.subscriber_queue_capacity, 1);
    }
}
