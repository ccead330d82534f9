//! The transformer node
//!
//! Decode → transform → re-encode → republish, strictly in arrival order,
//! with a bounded intake that sheds the oldest input under sustained
//! overload (the same freshness bias the broker applies).

pub mod config;
pub mod ops;
pub mod transformer;

pub use config::TransformerConfig;
pub use ops::{FrameTransform, Grayscale, Passthrough};
pub use transformer::Transformer;
