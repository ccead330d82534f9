//! Bus subscriber
//!
//! Node-side connection to the broker's egress listener. The connection
//! opens with a subscribe frame carrying the topic filter; after that the
//! broker pushes matching envelopes until either side goes away.

use tokio::net::TcpStream;

use crate::client::config::ClientConfig;
use crate::client::publisher::connect_once;
use crate::envelope::wire::{read_envelope, write_subscribe};
use crate::envelope::{Envelope, TopicFilter};
use crate::error::{Error, Result};

/// Subscriber half of a bus connection.
pub struct BusSubscriber {
    config: ClientConfig,
    filter: TopicFilter,
    stream: Option<TcpStream>,
}

impl BusSubscriber {
    /// Create a subscriber for the given filter. Does not connect yet.
    pub fn new(config: ClientConfig, filter: TopicFilter) -> Self {
        Self {
            config,
            filter,
            stream: None,
        }
    }

    /// The filter this subscriber announces.
    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    /// One connect-and-subscribe attempt, bounded by the configured timeout.
    pub async fn connect(&mut self) -> Result<()> {
        let mut stream = connect_once(&self.config).await?;
        write_subscribe(&mut stream, &self.filter).await?;

        tracing::debug!(
            addr = %self.config.addr,
            filter = %self.filter,
            "Subscriber connected"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Connect, retrying with capped exponential backoff until it succeeds.
    pub async fn connect_with_retry(&mut self) {
        let mut backoff = self.config.initial_backoff;
        loop {
            match self.connect().await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(
                        addr = %self.config.addr,
                        error = %e,
                        retry_in_ms = backoff.as_millis() as u64,
                        "Broker unreachable, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
            }
        }
    }

    /// Receive the next matching envelope.
    ///
    /// Returns `Ok(None)` when the broker closed the connection cleanly. On
    /// any error the connection is discarded; the caller reconnects.
    pub async fn recv(&mut self) -> Result<Option<Envelope>> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        match read_envelope(stream).await {
            Ok(Some(envelope)) => Ok(Some(envelope)),
            Ok(None) => {
                self.stream = None;
                Ok(None)
            }
            Err(e) => {
                self.stream = None;
                Err(e)
            }
        }
    }

    /// Whether a connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Drop the connection.
    pub fn disconnect(&mut self) {
        self.stream = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::net::TcpListener;

    use crate::envelope::wire::{read_subscribe, write_envelope};
    use crate::envelope::Topic;

    #[tokio::test]
    async fn test_recv_without_connect_fails() {
        let config = ClientConfig::new("127.0.0.1:1".parse().unwrap());
        let mut subscriber = BusSubscriber::new(config, TopicFilter::new("raw"));

        assert!(matches!(subscriber.recv().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_subscribe_frame_sent_on_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut subscriber =
            BusSubscriber::new(ClientConfig::new(addr), TopicFilter::new("processed"));
        subscriber.connect().await.unwrap();

        let (mut peer, _) = listener.accept().await.unwrap();
        let filter = read_subscribe(&mut peer).await.unwrap().unwrap();
        assert_eq!(filter.as_str(), "processed");

        // Peer pushes an envelope; the subscriber receives it.
        let env = Envelope::from_parts(
            Topic::new("processed").unwrap(),
            Bytes::from_static(b"{}"),
            Bytes::from_static(&[9]),
        );
        write_envelope(&mut peer, &env).await.unwrap();

        let received = subscriber.recv().await.unwrap().unwrap();
        assert_eq!(received.payload[0], 9);

        // Peer closes; recv reports a clean end of stream.
        drop(peer);
        assert!(subscriber.recv().await.unwrap().is_none());
        assert!(!subscriber.is_connected());
    }
}
