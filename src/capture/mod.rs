//! The producer node
//!
//! `OPENED → (READ_FRAME → ENCODE → PUBLISH → WAIT)* → [EOF: loop? rewind :
//! STOPPED]`. Pacing comes from the wall clock, never from downstream
//! consumption. There is no flow control on the bus; the broker
//! drops for consumers that fall behind.

pub mod capturer;
pub mod config;
pub mod source;

pub use capturer::Capturer;
pub use config::CapturerConfig;
pub use source::{FrameSource, JpegDirSource, SourceFrame, TestPatternSource};
