//! Frame transformations
//!
//! A transformation is a pure function on decoded pixels: no I/O, no state,
//! no dependence on arrival time. That keeps the transformer node free to
//! drop input frames under load without changing what any surviving frame
//! looks like.

use image::DynamicImage;

/// A pure image-to-image operation.
pub trait FrameTransform: Send + Sync {
    /// Label recorded in output metadata as `processed`.
    fn label(&self) -> &str;

    /// Apply the transformation.
    fn apply(&self, image: DynamicImage) -> DynamicImage;
}

/// Convert to grayscale. MJPEG viewers handle single-channel JPEGs fine.
pub struct Grayscale;

impl FrameTransform for Grayscale {
    fn label(&self) -> &str {
        "grayscale"
    }

    fn apply(&self, image: DynamicImage) -> DynamicImage {
        image.grayscale()
    }
}

/// No-op transformation, useful for wiring tests and relay-only setups.
pub struct Passthrough;

impl FrameTransform for Passthrough {
    fn label(&self) -> &str {
        "passthrough"
    }

    fn apply(&self, image: DynamicImage) -> DynamicImage {
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(4, 4, |x, _| {
            Rgb([(x * 60) as u8, 0, 255])
        }))
    }

    #[test]
    fn test_grayscale_collapses_channels() {
        let out = Grayscale.apply(test_image());
        assert_eq!(out.color().channel_count(), 1);
        assert_eq!(out.width(), 4);
        assert_eq!(out.height(), 4);
    }

    #[test]
    fn test_passthrough_is_identity() {
        let input = test_image();
        let out = Passthrough.apply(input.clone());
        assert_eq!(out.to_rgb8().as_raw(), input.to_rgb8().as_raw());
    }
}
