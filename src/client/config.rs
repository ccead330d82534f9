//! Client connection configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for one bus connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Broker address to connect to (ingress for publishers, egress for
    /// subscribers).
    pub addr: SocketAddr,

    /// Timeout for a single connect attempt.
    pub connect_timeout: Duration,

    /// First retry delay after a failed connect.
    pub initial_backoff: Duration,

    /// Ceiling for the doubling retry delay.
    pub max_backoff: Duration,

    /// Enable TCP_NODELAY.
    pub tcp_nodelay: bool,
}

impl ClientConfig {
    /// Create a config for the given broker address.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            tcp_nodelay: true,
        }
    }

    /// Set the per-attempt connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the initial retry backoff.
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the maximum retry backoff.
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Set TCP_NODELAY.
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:5555".parse().unwrap();
        let config = ClientConfig::new(addr)
            .connect_timeout(Duration::from_secs(1))
            .initial_backoff(Duration::from_millis(10))
            .max_backoff(Duration::from_millis(100))
            .tcp_nodelay(false);

        assert_eq!(config.addr, addr);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.initial_backoff, Duration::from_millis(10));
        assert_eq!(config.max_backoff, Duration::from_millis(100));
        assert!(!config.tcp_nodelay);
    }
}
