//! The transformer node
//!
//! Subscribes under one filter, republishes under another topic. One reader
//! task pulls envelopes off the bus into a bounded intake queue; one worker
//! task processes them strictly in order. When the worker cannot keep up,
//! the intake queue sheds its oldest entries, so latency and memory stay
//! bounded, order is never violated.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use tokio::sync::broadcast;

use crate::client::{BusPublisher, BusSubscriber, ClientConfig};
use crate::envelope::{unix_millis, Envelope, FrameMetadata};
use crate::error::Result;
use crate::transform::config::TransformerConfig;
use crate::transform::ops::FrameTransform;

/// In-order frame transformer between two topics.
pub struct Transformer<T: FrameTransform> {
    config: TransformerConfig,
    transform: T,
}

impl<T: FrameTransform> Transformer<T> {
    /// Create a transformer applying `transform` to every input frame.
    pub fn new(config: TransformerConfig, transform: T) -> Self {
        Self { config, transform }
    }

    /// Run forever: receive, transform, republish.
    pub async fn run(self) -> Result<()> {
        let mut subscriber = BusSubscriber::new(
            ClientConfig::new(self.config.sub_addr),
            self.config.sub_filter.clone(),
        );
        let mut publisher = BusPublisher::new(ClientConfig::new(self.config.pub_addr));

        subscriber.connect_with_retry().await;
        publisher.connect_with_retry().await;

        tracing::info!(
            filter = %self.config.sub_filter,
            topic = %self.config.pub_topic,
            transform = self.transform.label(),
            "Transformer started"
        );

        // Bounded intake between the bus reader and the worker. The broadcast
        // ring sheds oldest-first on overflow, matching the broker's policy.
        let (intake_tx, mut intake_rx) =
            broadcast::channel::<Envelope>(self.config.intake_capacity);

        let reader = tokio::spawn(async move {
            loop {
                match subscriber.recv().await {
                    Ok(Some(envelope)) => {
                        // Fails only when the worker is gone; shutdown.
                        if intake_tx.send(envelope).is_err() {
                            return;
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
        });

        // Worker: strictly sequential, preserving arrival order.
        loop {
            match intake_rx.recv().await {
                Ok(envelope) => {
                    if let Some(output) = self.process(envelope) {
                        if let Err(e) = publisher.publish(&output).await {
                            tracing::warn!(error = %e, "Publish failed, reconnecting");
                            publisher.connect_with_retry().await;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "Transformer behind, dropped oldest input");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        reader.abort();
        Ok(())
    }

    /// Transform one envelope. `None` means it was dropped (malformed
    /// metadata or undecodable payload), logged and never fatal.
    fn process(&self, envelope: Envelope) -> Option<Envelope> {
        let metadata = match envelope.decode_metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(topic = %envelope.topic, error = %e, "Dropping envelope with bad metadata");
                return None;
            }
        };

        let image = match image::load_from_memory(&envelope.payload) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(seq = metadata.seq, error = %e, "Dropping undecodable payload");
                return None;
            }
        };

        let output = self.transform.apply(image);
        let (width, height) = (output.width(), output.height());

        // JPEG carries either luma or RGB; anything else is converted.
        let mut jpeg = Vec::with_capacity(envelope.payload.len());
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, self.config.jpeg_quality);
        let encoded = if output.color().has_color() {
            encoder.encode_image(&output.to_rgb8())
        } else {
            encoder.encode_image(&output.to_luma8())
        };
        if let Err(e) = encoded {
            tracing::warn!(seq = metadata.seq, error = %e, "Re-encode failed, dropping frame");
            return None;
        }

        let out_metadata = metadata.processed_by(
            self.transform.label(),
            width,
            height,
            self.config.jpeg_quality,
            unix_millis(),
        );

        match Envelope::new(
            self.config.pub_topic.clone(),
            &out_metadata,
            Bytes::from(jpeg),
        ) {
            Ok(out) => Some(out),
            Err(e) => {
                tracing::warn!(seq = metadata.seq, error = %e, "Failed to build output envelope");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FrameSource, TestPatternSource};
    use crate::envelope::{Topic, TopicFilter};
    use crate::transform::ops::Grayscale;

    fn transformer() -> Transformer<Grayscale> {
        let config = TransformerConfig::new(
            "127.0.0.1:1".parse().unwrap(),
            "127.0.0.1:1".parse().unwrap(),
            TopicFilter::new("raw"),
            Topic::new("processed").unwrap(),
        );
        Transformer::new(config, Grayscale)
    }

    fn input_envelope(seq: u64) -> Envelope {
        let mut source = TestPatternSource::new(16, 8, 1);
        let frame = source.next_frame().unwrap().unwrap();
        let rgb = frame.image.to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, 80)
            .encode_image(&rgb)
            .unwrap();

        let metadata = FrameMetadata::new(seq, 1234, 16, 8, 80, "cam-0");
        Envelope::new(Topic::new("raw").unwrap(), &metadata, Bytes::from(jpeg)).unwrap()
    }

    #[test]
    fn test_process_produces_grayscale_output() {
        let output = transformer().process(input_envelope(3)).unwrap();

        assert_eq!(output.topic.as_str(), "processed");

        let metadata = output.decode_metadata().unwrap();
        assert_eq!(metadata.seq, 3);
        assert_eq!(metadata.source, "cam-0");
        assert_eq!(metadata.processed.as_deref(), Some("grayscale"));
        assert!(metadata.processed_ts_ms.is_some());
        assert_eq!(metadata.quality, 85);

        let decoded = image::load_from_memory(&output.payload).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
        assert_eq!(decoded.color().channel_count(), 1);
    }

    #[test]
    fn test_bad_metadata_dropped() {
        let envelope = Envelope::from_parts(
            Topic::new("raw").unwrap(),
            Bytes::from_static(b"not json"),
            Bytes::from_static(&[0xFF, 0xD8]),
        );

        assert!(transformer().process(envelope).is_none());
    }

    #[test]
    fn test_undecodable_payload_dropped() {
        let metadata = FrameMetadata::new(0, 0, 16, 8, 80, "cam-0");
        let envelope = Envelope::new(
            Topic::new("raw").unwrap(),
            &metadata,
            Bytes::from_static(b"definitely not a jpeg"),
        )
        .unwrap();

        assert!(transformer().process(envelope).is_none());
    }
}
