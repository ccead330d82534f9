//! Crate error types
//!
//! Wire-level violations (`EnvelopeError`) are kept separate from the
//! top-level `Error` so connection code can decide whether a failure poisons
//! the framing (close the connection) or only the single message (drop it).

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for bus nodes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying I/O or socket error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire contract violation on a bus connection.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Metadata record failed to encode/decode as JSON.
    #[error("metadata codec error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Payload failed to decode or a frame failed to encode as an image.
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Operation requires an established bus connection.
    #[error("not connected to broker")]
    NotConnected,

    /// A frame source could not be opened or yielded no frames.
    #[error("frame source error: {0}")]
    Source(String),
}

/// Violations of the three-part envelope wire contract.
///
/// Any of these means the peer is not speaking the protocol (or the stream
/// has been corrupted), so the framing can no longer be trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// Topic part was empty.
    #[error("empty topic")]
    EmptyTopic,

    /// Topic part was not valid UTF-8.
    #[error("topic is not valid UTF-8")]
    TopicNotUtf8,

    /// Topic length prefix exceeded the cap.
    #[error("topic too long: {len} bytes")]
    TopicTooLong { len: usize },

    /// Metadata length prefix exceeded the cap.
    #[error("metadata too large: {len} bytes")]
    MetadataTooLarge { len: usize },

    /// Payload length prefix exceeded the cap.
    #[error("payload too large: {len} bytes")]
    PayloadTooLarge { len: usize },

    /// Metadata record carried a schema version this build does not know.
    #[error("unsupported metadata schema version: {version}")]
    UnsupportedVersion { version: u32 },
}
