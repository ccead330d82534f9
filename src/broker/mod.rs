//! The message broker
//!
//! A stateless relay: producers connect to the ingress listener and push
//! envelopes; subscribers connect to the egress listener, announce a topic
//! filter, and receive every matching envelope. The broker never parses
//! metadata or payloads; it is a pure router.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SubscriptionRegistry>
//!                   ┌───────────────────────────────┐
//!                   │ subscriptions: HashMap<id,    │
//!                   │   Subscription {              │
//!                   │     filter,                   │
//!                   │     tx: broadcast::Sender,    │
//!                   │   }                           │
//!                   │ >                             │
//!                   └──────────────┬────────────────┘
//!                                  │
//!          ┌───────────────────────┼───────────────────────┐
//!          │                       │                       │
//!          ▼                       ▼                       ▼
//!     [Producer]             [Subscriber]            [Subscriber]
//!     read_envelope()        rx.recv()               rx.recv()
//!          │                       │                       │
//!          └──► registry.relay()──► write_envelope() ──► TCP
//! ```
//!
//! # Delivery guarantees
//!
//! Envelopes from one producer reach a matching subscriber in the order they
//! were published; nothing is guaranteed across producers. Each subscription
//! holds a bounded queue (the high-water mark): a subscriber that cannot keep
//! up loses the *oldest* queued envelopes, so memory stays bounded and the
//! stream stays fresh. `bytes::Bytes` reference counting makes the fan-out
//! clone cheap, so subscribers share one allocation per envelope.

pub mod config;
pub mod listener;
pub mod registry;

pub use config::BrokerConfig;
pub use listener::{Broker, BrokerListeners};
pub use registry::SubscriptionRegistry;
