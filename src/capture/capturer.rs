//! The capturer node
//!
//! Reads frames from a [`FrameSource`], encodes each as JPEG, and publishes
//! envelopes under a fixed topic on a wall-clock schedule. Publishing is
//! fire-and-forget: the capturer neither knows nor cares whether anyone is
//! subscribed, and it never waits on a consumer.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use tokio::time::Instant;

use crate::capture::config::CapturerConfig;
use crate::capture::source::{FrameSource, SourceFrame};
use crate::client::{BusPublisher, ClientConfig};
use crate::envelope::{unix_millis, Envelope, FrameMetadata};
use crate::error::Result;

/// Paced frame publisher.
///
/// Runs `READ → ENCODE → PUBLISH → WAIT` until the source ends. With looping
/// enabled the source rewinds and the sequence number keeps counting; with it
/// disabled the capturer stops cleanly after its last publish.
pub struct Capturer<S: FrameSource> {
    config: CapturerConfig,
    source: S,
    publisher: BusPublisher,
    seq: u64,
}

impl<S: FrameSource> Capturer<S> {
    /// Create a capturer for the given source.
    pub fn new(config: CapturerConfig, source: S) -> Self {
        let client = ClientConfig::new(config.broker_addr);
        Self {
            config,
            source,
            publisher: BusPublisher::new(client),
            seq: 0,
        }
    }

    /// Next sequence number to be published.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Run until the source is exhausted (never, when looping).
    pub async fn run(&mut self) -> Result<()> {
        self.publisher.connect_with_retry().await;

        tracing::info!(
            topic = %self.config.topic,
            interval_ms = self.config.publish_interval.as_millis() as u64,
            quality = self.config.jpeg_quality,
            looping = self.config.loop_source,
            "Capturer started"
        );

        let interval = self.config.publish_interval;
        let mut next_publish = Instant::now();

        loop {
            let frame = match self.source.next_frame()? {
                Some(frame) => frame,
                None => {
                    if self.config.loop_source {
                        // Sequence numbers continue across the wrap.
                        self.source.rewind()?;
                        continue;
                    }
                    tracing::info!(published = self.seq, "End of source");
                    return Ok(());
                }
            };

            let envelope = self.encode_frame(&frame)?;
            self.publish(envelope).await;
            self.seq += 1;

            // Wall-clock schedule: fixed cadence, independent of how long
            // encode/publish took. After a long stall, jump forward instead
            // of bursting the missed slots.
            next_publish += interval;
            let now = Instant::now();
            if now > next_publish + interval * 5 {
                next_publish = now + interval;
            }
            tokio::time::sleep_until(next_publish).await;
        }
    }

    /// Run until `shutdown` completes or the source ends.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.run() => result,
        }
    }

    async fn publish(&mut self, envelope: Envelope) {
        if let Err(e) = self.publisher.publish(&envelope).await {
            // This envelope is lost; reconnect and carry on with the next.
            tracing::warn!(error = %e, seq = self.seq, "Publish failed, reconnecting");
            self.publisher.connect_with_retry().await;
        } else {
            tracing::trace!(seq = self.seq, "Frame published");
        }
    }

    fn encode_frame(&self, frame: &SourceFrame) -> Result<Envelope> {
        let rgb = frame.image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut jpeg = Vec::with_capacity(rgb.len() / 4);
        JpegEncoder::new_with_quality(&mut jpeg, self.config.jpeg_quality).encode_image(&rgb)?;

        let metadata = FrameMetadata::new(
            self.seq,
            unix_millis(),
            width,
            height,
            self.config.jpeg_quality,
            self.config.source_label.clone(),
        );

        Envelope::new(self.config.topic.clone(), &metadata, Bytes::from(jpeg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::source::TestPatternSource;
    use crate::envelope::Topic;

    fn capturer(frames: u64) -> Capturer<TestPatternSource> {
        let config = CapturerConfig::new(
            "127.0.0.1:1".parse().unwrap(),
            Topic::new("raw").unwrap(),
        );
        Capturer::new(config, TestPatternSource::new(16, 8, frames))
    }

    #[test]
    fn test_encode_frame_builds_valid_envelope() {
        let mut cap = capturer(1);
        let frame = cap.source.next_frame().unwrap().unwrap();
        let envelope = cap.encode_frame(&frame).unwrap();

        assert_eq!(envelope.topic.as_str(), "raw");
        let meta = envelope.decode_metadata().unwrap();
        assert_eq!(meta.seq, 0);
        assert_eq!(meta.width, 16);
        assert_eq!(meta.height, 8);
        assert_eq!(meta.encoding, "jpeg");

        // Payload must be an independently decodable image.
        let decoded = image::load_from_memory(&envelope.payload).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn test_same_source_frame_encodes_identically() {
        let cap = capturer(1);
        let mut source_a = TestPatternSource::new(16, 8, 1);
        let mut source_b = TestPatternSource::new(16, 8, 1);

        let a = cap
            .encode_frame(&source_a.next_frame().unwrap().unwrap())
            .unwrap();
        let b = cap
            .encode_frame(&source_b.next_frame().unwrap().unwrap())
            .unwrap();

        assert_eq!(a.payload, b.payload);
    }
}
