//! Gateway configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::envelope::TopicFilter;

/// Gateway configuration options
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Broker egress address to subscribe at.
    pub broker_addr: SocketAddr,

    /// Filter for the frames to serve.
    pub filter: TopicFilter,

    /// HTTP bind address.
    pub http_addr: SocketAddr,

    /// How long a streaming connection waits for a new frame before
    /// re-sending the current one. Bounds the wait so dead peers are
    /// discovered promptly.
    pub stream_wait: Duration,
}

impl GatewayConfig {
    /// Create a config subscribing with `filter` and serving on `http_addr`.
    pub fn new(broker_addr: SocketAddr, filter: TopicFilter, http_addr: SocketAddr) -> Self {
        Self {
            broker_addr,
            filter,
            http_addr,
            stream_wait: Duration::from_secs(2),
        }
    }

    /// Set the streaming wait bound.
    pub fn stream_wait(mut self, wait: Duration) -> Self {
        self.stream_wait = wait;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::new(
            "127.0.0.1:5556".parse().unwrap(),
            TopicFilter::new("processed"),
            "0.0.0.0:8000".parse().unwrap(),
        );

        assert_eq!(config.stream_wait, Duration::from_secs(2));
        assert_eq!(config.http_addr.port(), 8000);
    }

    #[test]
    fn test_builder() {
        let config = GatewayConfig::new(
            "127.0.0.1:5556".parse().unwrap(),
            TopicFilter::new("processed"),
            "0.0.0.0:8000".parse().unwrap(),
        )
        .stream_wait(Duration::from_millis(500));

        assert_eq!(config.stream_wait, Duration::from_millis(500));
    }
}
