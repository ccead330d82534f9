//! Bus publisher
//!
//! Node-side connection to the broker's ingress listener. Publishing is
//! fire-and-forget: the broker applies its drop policy downstream, and this
//! side never waits on any consumer.

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::client::config::ClientConfig;
use crate::envelope::wire::write_envelope;
use crate::envelope::Envelope;
use crate::error::{Error, Result};

/// Publisher half of a bus connection.
///
/// # Example
/// ```no_run
/// use framebus::{BusPublisher, ClientConfig};
///
/// # async fn example() -> framebus::Result<()> {
/// let config = ClientConfig::new("127.0.0.1:5555".parse().unwrap());
/// let mut publisher = BusPublisher::new(config);
/// publisher.connect_with_retry().await;
/// # Ok(())
/// # }
/// ```
pub struct BusPublisher {
    config: ClientConfig,
    stream: Option<TcpStream>,
}

impl BusPublisher {
    /// Create a publisher. Does not connect yet.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// One connect attempt, bounded by the configured timeout.
    pub async fn connect(&mut self) -> Result<()> {
        let stream = connect_once(&self.config).await?;
        tracing::debug!(addr = %self.config.addr, "Publisher connected");
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

    /// Publish one envelope.
    ///
    /// On any write error the connection is discarded and the error returned;
    /// the envelope is considered dropped and the caller reconnects.
    pub async fn publish(&mut self, envelope: &Envelope) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        if let Err(e) = write_envelope(stream, envelope).await {
            self.stream = None;
            return Err(e);
        }
        Ok(())
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

pub(crate) async fn connect_once(config: &ClientConfig) -> Result<TcpStream> {
    let stream = timeout(config.connect_timeout, TcpStream::connect(config.addr))
        .await
        .map_err(|_| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connect timed out",
            ))
        })??;

    if config.tcp_nodelay {
        stream.set_nodelay(true)?;
    }
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::net::TcpListener;

    use crate::envelope::wire::read_envelope;
    use crate::envelope::{FrameMetadata, Topic};

    #[tokio::test]
    async fn test_publish_without_connect_fails() {
        let config = ClientConfig::new("127.0.0.1:1".parse().unwrap());
        let mut publisher = BusPublisher::new(config);

        let meta = FrameMetadata::new(0, 0, 1, 1, 80, "test");
        let env = Envelope::new(Topic::new("raw").unwrap(), &meta, Bytes::new()).unwrap();

        assert!(matches!(
            publisher.publish(&env).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_publish_reaches_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut publisher = BusPublisher::new(ClientConfig::new(addr));
        publisher.connect().await.unwrap();
        assert!(publisher.is_connected());

        let (mut peer, _) = listener.accept().await.unwrap();

        let meta = FrameMetadata::new(5, 100, 2, 2, 80, "test");
        let env = Envelope::new(
            Topic::new("raw").unwrap(),
            &meta,
            Bytes::from_static(&[1, 2, 3]),
        )
        .unwrap();
        publisher.publish(&env).await.unwrap();

        let received = read_envelope(&mut peer).await.unwrap().unwrap();
        assert_eq!(received.topic.as_str(), "raw");
        assert_eq!(received.payload, Bytes::from_static(&[1, 2, 3]));
        assert_eq!(received.decode_metadata().unwrap().seq, 5);
    }
}
