//! The three-part envelope and topic contract
//!
//! Every message exchanged over the bus is exactly three parts in fixed
//! order: topic, metadata, payload. The broker routes on the topic alone and
//! treats the other two parts as opaque bytes; producing and consuming nodes
//! encode/decode the metadata record at their own boundary.
//!
//! Wire layout (all length prefixes big-endian `u32`):
//!
//! ```text
//! +-----------+-------------+----------+------------+-------------+------------+
//! | topic_len | topic utf-8 | meta_len | metadata   | payload_len | payload    |
//! |  (4)      |  (n)        |  (4)     |  (n)       |  (4)        |  (n)       |
//! +-----------+-------------+----------+------------+-------------+------------+
//! ```
//!
//! A subscriber connection opens with a single subscribe frame carrying its
//! topic filter: `[filter_len][filter utf-8]`.
//!
//! The contract is versionless and fixed by convention; it is validated
//! defensively at every boundary instead. A length prefix over its cap or a
//! malformed topic poisons the framing and closes the connection. A
//! well-framed envelope whose *metadata record* does not decode is dropped by
//! the consumer that noticed, never fatal.

pub mod metadata;
pub mod topic;
pub mod wire;

pub use metadata::{unix_millis, FrameMetadata, METADATA_VERSION};
pub use topic::{Topic, TopicFilter};
pub use wire::{
    read_envelope, read_subscribe, write_envelope, write_subscribe, Envelope, MAX_METADATA_LEN,
    MAX_PAYLOAD_LEN, MAX_TOPIC_LEN,
};
