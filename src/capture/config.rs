//! Capturer configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::envelope::Topic;

/// Capturer configuration options
#[derive(Debug, Clone)]
pub struct CapturerConfig {
    /// Broker ingress address to publish to.
    pub broker_addr: SocketAddr,

    /// Topic to publish under.
    pub topic: Topic,

    /// Wall-clock interval between publishes.
    pub publish_interval: Duration,

    /// JPEG quality for encoded payloads (1-100).
    pub jpeg_quality: u8,

    /// Restart from the first frame when the source ends.
    pub loop_source: bool,

    /// Label recorded as `source` in frame metadata.
    pub source_label: String,
}

impl CapturerConfig {
    /// Create a config publishing to `broker_addr` under `topic`.
    pub fn new(broker_addr: SocketAddr, topic: Topic) -> Self {
        Self {
            broker_addr,
            topic,
            publish_interval: Duration::from_millis(100),
            jpeg_quality: 80,
            loop_source: true,
            source_label: "capturer".to_string(),
        }
    }

    /// Set the publish interval.
    pub fn publish_interval(mut self, interval: Duration) -> Self {
        self.publish_interval = interval;
        self
    }

    /// Set the JPEG quality. Clamped to 1-100.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set whether to loop when the source is exhausted.
    pub fn loop_source(mut self, enabled: bool) -> Self {
        self.loop_source = enabled;
        self
    }

    /// Set the metadata source label.
    pub fn source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CapturerConfig::new(
            "127.0.0.1:5555".parse().unwrap(),
            Topic::new("raw").unwrap(),
        );

        assert_eq!(config.publish_interval, Duration::from_millis(100));
        assert_eq!(config.jpeg_quality, 80);
        assert!(config.loop_source);
        assert_eq!(config.source_label, "capturer");
    }

    #[test]
    fn test_quality_clamped() {
        let config = CapturerConfig::new(
            "127.0.0.1:5555".parse().unwrap(),
            Topic::new("raw").unwrap(),
        )
        .jpeg_quality(0);

        assert_eq!(config.jpeg_quality, 1);
    }
}
