//! The frame metadata record
//!
//! The middle part of every envelope, serialized as compact JSON. The schema
//! is explicit and versioned: decoders tolerate unknown extra fields but
//! reject records from a schema major version they do not know.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{EnvelopeError, Result};

/// Current metadata schema version.
pub const METADATA_VERSION: u32 = 1;

/// Structured record describing one frame.
///
/// `seq` increases monotonically per producer and never resets, even when the
/// producer loops back to the start of its source. The `processed` fields are
/// absent on capture and filled in by a transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Schema version.
    pub v: u32,

    /// Per-producer sequence number, monotonically increasing.
    pub seq: u64,

    /// Capture timestamp, unix milliseconds.
    pub ts_ms: u64,

    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,

    /// Payload encoding, `"jpeg"`.
    pub encoding: String,

    /// JPEG quality the payload was encoded with.
    pub quality: u8,

    /// Label of the producing node.
    pub source: String,

    /// Transformation label, set by a transformer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<String>,

    /// Transformation timestamp, unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_ts_ms: Option<u64>,
}

impl FrameMetadata {
    /// Build a capture-time record for a JPEG frame.
    pub fn new(
        seq: u64,
        ts_ms: u64,
        width: u32,
        height: u32,
        quality: u8,
        source: impl Into<String>,
    ) -> Self {
        Self {
            v: METADATA_VERSION,
            seq,
            ts_ms,
            width,
            height,
            encoding: "jpeg".to_string(),
            quality,
            source: source.into(),
            processed: None,
            processed_ts_ms: None,
        }
    }

    /// Derive the record for a transformed copy of this frame.
    ///
    /// Capture identity (`seq`, `ts_ms`, `source`) is preserved; dimensions
    /// and quality describe the new payload.
    pub fn processed_by(
        &self,
        label: impl Into<String>,
        width: u32,
        height: u32,
        quality: u8,
        processed_ts_ms: u64,
    ) -> Self {
        Self {
            v: METADATA_VERSION,
            seq: self.seq,
            ts_ms: self.ts_ms,
            width,
            height,
            encoding: self.encoding.clone(),
            quality,
            source: self.source.clone(),
            processed: Some(label.into()),
            processed_ts_ms: Some(processed_ts_ms),
        }
    }

    /// Serialize as compact JSON bytes for the metadata part.
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Decode from a metadata part, enforcing the schema version.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let meta: Self = serde_json::from_slice(raw)?;
        if meta.v != METADATA_VERSION {
            return Err(EnvelopeError::UnsupportedVersion { version: meta.v }.into());
        }
        Ok(meta)
    }
}

/// Milliseconds since the unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let meta = FrameMetadata::new(42, 1_700_000_000_000, 640, 480, 80, "cam-0");
        let decoded = FrameMetadata::from_bytes(&meta.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let json = r#"{"v":1,"seq":7,"ts_ms":123,"width":10,"height":10,
            "encoding":"jpeg","quality":80,"source":"cam","future_field":true}"#;
        let meta = FrameMetadata::from_bytes(json.as_bytes()).unwrap();
        assert_eq!(meta.seq, 7);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let json = r#"{"v":2,"seq":0,"ts_ms":0,"width":1,"height":1,
            "encoding":"jpeg","quality":80,"source":"cam"}"#;
        assert!(FrameMetadata::from_bytes(json.as_bytes()).is_err());
    }

    #[test]
    fn test_processed_preserves_capture_identity() {
        let meta = FrameMetadata::new(9, 1000, 640, 480, 80, "cam-0");
        let out = meta.processed_by("grayscale", 640, 480, 85, 2000);

        assert_eq!(out.seq, 9);
        assert_eq!(out.ts_ms, 1000);
        assert_eq!(out.source, "cam-0");
        assert_eq!(out.processed.as_deref(), Some("grayscale"));
        assert_eq!(out.processed_ts_ms, Some(2000));
        assert_eq!(out.quality, 85);
    }

    #[test]
    fn test_absent_processed_fields_not_serialized() {
        let meta = FrameMetadata::new(0, 0, 1, 1, 80, "cam");
        let json = String::from_utf8(meta.to_bytes().unwrap().to_vec()).unwrap();
        assert!(!json.contains("processed"));
    }
}
