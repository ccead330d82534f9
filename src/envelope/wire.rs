//! Envelope wire codec
//!
//! Length-prefixed reader/writer for the three-part envelope and the
//! subscribe frame, over any `AsyncRead`/`AsyncWrite` pair. Size caps are
//! enforced before any allocation so a corrupt or hostile length prefix
//! cannot balloon memory.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{EnvelopeError, Error, Result};

use super::metadata::FrameMetadata;
use super::topic::{Topic, TopicFilter};

/// Maximum topic length in bytes.
pub const MAX_TOPIC_LEN: usize = 1024;

/// Maximum metadata part length in bytes.
pub const MAX_METADATA_LEN: usize = 64 * 1024;

/// Maximum payload length in bytes.
pub const MAX_PAYLOAD_LEN: usize = 32 * 1024 * 1024;

/// One bus message: topic, metadata, payload.
///
/// Metadata and payload are opaque `Bytes` here: the broker relays them
/// untouched, and cloning an envelope only bumps reference counts.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Routing topic.
    pub topic: Topic,
    /// Serialized [`FrameMetadata`] record.
    pub metadata: Bytes,
    /// Encoded image bytes.
    pub payload: Bytes,
}

impl Envelope {
    /// Build an envelope from a typed metadata record.
    pub fn new(topic: Topic, metadata: &FrameMetadata, payload: Bytes) -> Result<Self> {
        Ok(Self {
            topic,
            metadata: metadata.to_bytes()?,
            payload,
        })
    }

    /// Assemble from already-encoded parts.
    pub fn from_parts(topic: Topic, metadata: Bytes, payload: Bytes) -> Self {
        Self {
            topic,
            metadata,
            payload,
        }
    }

    /// Decode the metadata part into the typed record.
    pub fn decode_metadata(&self) -> Result<FrameMetadata> {
        FrameMetadata::from_bytes(&self.metadata)
    }

    /// Total size of this envelope on the wire.
    pub fn encoded_len(&self) -> usize {
        3 * 4 + self.topic.as_str().len() + self.metadata.len() + self.payload.len()
    }
}

/// Write one envelope.
///
/// The header and the two small parts go out as one buffer; the payload is
/// written directly so it is never copied.
pub async fn write_envelope<W>(writer: &mut W, envelope: &Envelope) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let topic = envelope.topic.as_str().as_bytes();
    check_caps(topic.len(), envelope.metadata.len(), envelope.payload.len())?;

    let mut head = BytesMut::with_capacity(3 * 4 + topic.len() + envelope.metadata.len());
    head.put_u32(topic.len() as u32);
    head.put_slice(topic);
    head.put_u32(envelope.metadata.len() as u32);
    head.put_slice(&envelope.metadata);
    head.put_u32(envelope.payload.len() as u32);

    writer.write_all(&head).await?;
    writer.write_all(&envelope.payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one envelope.
///
/// Returns `Ok(None)` when the peer closed the connection at a frame
/// boundary. A length prefix over its cap or a malformed topic is an
/// [`EnvelopeError`]; the caller must treat the connection as unusable.
pub async fn read_envelope<R>(reader: &mut R) -> Result<Option<Envelope>>
where
    R: AsyncRead + Unpin,
{
    let topic_len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if topic_len == 0 {
        return Err(EnvelopeError::EmptyTopic.into());
    }
    if topic_len > MAX_TOPIC_LEN {
        return Err(EnvelopeError::TopicTooLong { len: topic_len }.into());
    }

    let mut topic_buf = vec![0u8; topic_len];
    reader.read_exact(&mut topic_buf).await?;
    let topic = String::from_utf8(topic_buf)
        .map_err(|_| Error::from(EnvelopeError::TopicNotUtf8))
        .and_then(Topic::new)?;

    let meta_len = reader.read_u32().await? as usize;
    if meta_len > MAX_METADATA_LEN {
        return Err(EnvelopeError::MetadataTooLarge { len: meta_len }.into());
    }
    let mut metadata = BytesMut::zeroed(meta_len);
    reader.read_exact(&mut metadata).await?;

    let payload_len = reader.read_u32().await? as usize;
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(EnvelopeError::PayloadTooLarge { len: payload_len }.into());
    }
    let mut payload = BytesMut::zeroed(payload_len);
    reader.read_exact(&mut payload).await?;

    Ok(Some(Envelope::from_parts(
        topic,
        metadata.freeze(),
        payload.freeze(),
    )))
}

/// Write the subscribe frame a subscriber opens its connection with.
pub async fn write_subscribe<W>(writer: &mut W, filter: &TopicFilter) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let raw = filter.as_str().as_bytes();
    if raw.len() > MAX_TOPIC_LEN {
        return Err(EnvelopeError::TopicTooLong { len: raw.len() }.into());
    }

    let mut buf = BytesMut::with_capacity(4 + raw.len());
    buf.put_u32(raw.len() as u32);
    buf.put_slice(raw);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the subscribe frame. `Ok(None)` when the peer closed instead.
pub async fn read_subscribe<R>(reader: &mut R) -> Result<Option<TopicFilter>>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_TOPIC_LEN {
        return Err(EnvelopeError::TopicTooLong { len }.into());
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    let filter = String::from_utf8(buf).map_err(|_| Error::from(EnvelopeError::TopicNotUtf8))?;
    Ok(Some(TopicFilter::new(filter)))
}

fn check_caps(topic_len: usize, meta_len: usize, payload_len: usize) -> Result<()> {
    if topic_len == 0 {
        return Err(EnvelopeError::EmptyTopic.into());
    }
    if topic_len > MAX_TOPIC_LEN {
        return Err(EnvelopeError::TopicTooLong { len: topic_len }.into());
    }
    if meta_len > MAX_METADATA_LEN {
        return Err(EnvelopeError::MetadataTooLarge { len: meta_len }.into());
    }
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(EnvelopeError::PayloadTooLarge { len: payload_len }.into());
    }
    Ok(())
}
