//! Bus client connections
//!
//! The connect/reconnect layer every non-broker node uses: [`BusPublisher`]
//! pushes envelopes to the broker's ingress listener, [`BusSubscriber`]
//! receives matching envelopes from the egress listener. Connection loss is
//! recoverable: callers reconnect with capped backoff instead of
//! terminating.

pub mod config;
pub mod publisher;
pub mod subscriber;

pub use config::ClientConfig;
pub use publisher::BusPublisher;
pub use subscriber::BusSubscriber;
