//! framebus: topic-based pub/sub for live video frames
//!
//! A small message bus built for one job: moving a live stream of encoded
//! video frames from producers to consumers with bounded memory and a bias
//! toward freshness. Four node types talk over it:
//!
//! ```text
//! [Capturer] --raw--> [Broker] --raw--> [Transformer] --processed--> [Broker]
//!                                                                       |
//!                                                             [Gateway] <┘
//!                                                                 |
//!                                                  browser <img src="/stream.mjpg">
//! ```
//!
//! Every message on the bus is a three-part [`Envelope`]: a topic string, a
//! JSON [`FrameMetadata`] record, and an opaque JPEG payload. The broker
//! routes envelopes by topic prefix without ever parsing the other two parts.
//! Slow consumers lose the oldest frames rather than stalling producers or
//! growing queues.
//!
//! # Quick start
//!
//! ```no_run
//! use framebus::{Broker, BrokerConfig};
//!
//! # async fn example() -> framebus::Result<()> {
//! let config = BrokerConfig::new("0.0.0.0:5555".parse().unwrap(), "0.0.0.0:5556".parse().unwrap());
//! Broker::new(config).run().await?;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod capture;
pub mod client;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod stats;
pub mod transform;

pub use broker::{Broker, BrokerConfig};
pub use capture::{Capturer, CapturerConfig};
pub use client::{BusPublisher, BusSubscriber, ClientConfig};
pub use envelope::{Envelope, FrameMetadata, Topic, TopicFilter};
pub use error::{Error, Result};
pub use gateway::{Gateway, GatewayConfig};
pub use transform::{Transformer, TransformerConfig};
