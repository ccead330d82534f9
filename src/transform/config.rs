//! Transformer configuration

use std::net::SocketAddr;

use crate::envelope::{Topic, TopicFilter};

/// Default intake queue capacity.
pub const DEFAULT_INTAKE_CAPACITY: usize = 8;

/// Transformer configuration options
#[derive(Debug, Clone)]
pub struct TransformerConfig {
    /// Broker egress address to subscribe at.
    pub sub_addr: SocketAddr,

    /// Broker ingress address to publish at.
    pub pub_addr: SocketAddr,

    /// Filter for input envelopes.
    pub sub_filter: TopicFilter,

    /// Topic for transformed envelopes.
    pub pub_topic: Topic,

    /// JPEG quality for re-encoded payloads (1-100).
    pub jpeg_quality: u8,

    /// Intake queue capacity. When processing falls this far behind arrival,
    /// the oldest unprocessed inputs are dropped.
    pub intake_capacity: usize,
}

impl TransformerConfig {
    /// Create a config subscribing with `sub_filter` and publishing under
    /// `pub_topic`.
    pub fn new(
        sub_addr: SocketAddr,
        pub_addr: SocketAddr,
        sub_filter: TopicFilter,
        pub_topic: Topic,
    ) -> Self {
        Self {
            sub_addr,
            pub_addr,
            sub_filter,
            pub_topic,
            jpeg_quality: 85,
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
        }
    }

    /// Set the output JPEG quality. Clamped to 1-100.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set the intake queue capacity. Clamped to at least 1.
    pub fn intake_capacity(mut self, capacity: usize) -> Self {
        self.intake_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransformerConfig::new(
            "127.0.0.1:5556".parse().unwrap(),
            "127.0.0.1:5555".parse().unwrap(),
            TopicFilter::new("raw"),
            Topic::new("processed").unwrap(),
        );

        assert_eq!(config.jpeg_quality, 85);
        assert_eq!(config.intake_capacity, DEFAULT_INTAKE_CAPACITY);
    }

    #[test]
    fn test_builders_clamp() {
        let config = TransformerConfig::new(
            "127.0.0.1:5556".parse().unwrap(),
            "127.0.0.1:5555".parse().unwrap(),
            TopicFilter::new("raw"),
            Topic::new("processed").unwrap(),
        )
        .jpeg_quality(200)
        .intake_capacity(0);

        assert_eq!(config.jpeg_quality, 100);
        assert_eq!(config.intake_capacity, 1);
    }
}
