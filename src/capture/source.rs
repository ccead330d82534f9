//! Frame sources
//!
//! The seam between the capturer and whatever produces pictures. A source
//! yields decoded frames one at a time and can rewind to its beginning;
//! everything else (pacing, encoding, publishing) belongs to the capturer.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, Rgb};

use crate::error::{Error, Result};

/// One decoded frame read from a source.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// Zero-based position within the source. Resets on rewind, unlike the
    /// published sequence number, which never does.
    pub index: u64,

    /// Decoded pixels.
    pub image: DynamicImage,
}

/// A rewindable sequence of frames.
pub trait FrameSource: Send {
    /// Read the next frame. `Ok(None)` means the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<SourceFrame>>;

    /// Restart from the first frame.
    fn rewind(&mut self) -> Result<()>;
}

/// Source reading a directory of JPEG stills in filename order.
///
/// Stands in for a video file: each image is one frame of the loop.
pub struct JpegDirSource {
    paths: Vec<PathBuf>,
    pos: usize,
}

impl JpegDirSource {
    /// Scan `dir` for `.jpg`/`.jpeg` files. Fails if none are found.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(Error::Source(format!(
                "no JPEG frames in {}",
                dir.display()
            )));
        }

        tracing::info!(dir = %dir.display(), frames = paths.len(), "Frame directory opened");
        Ok(Self { paths, pos: 0 })
    }

    /// Number of frames in the directory.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the directory had no frames (never true after `open`).
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for JpegDirSource {
    fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
        let Some(path) = self.paths.get(self.pos) else {
            return Ok(None);
        };

        let raw = std::fs::read(path)?;
        let image = image::load_from_memory(&raw)?;

        let frame = SourceFrame {
            index: self.pos as u64,
            image,
        };
        self.pos += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}

/// Synthetic source: a moving vertical bar over a gradient.
///
/// Deterministic per frame index, so tests (and demos without any video on
/// disk) can recognize exactly which source frame an envelope carries.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_count: u64,
    pos: u64,
}

impl TestPatternSource {
    /// Create a pattern source of `frame_count` frames at `width`x`height`.
    pub fn new(width: u32, height: u32, frame_count: u64) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            frame_count: frame_count.max(1),
            pos: 0,
        }
    }

    fn render(&self, index: u64) -> DynamicImage {
        let bar_x = ((index * 8) % self.width as u64) as u32;
        let buffer = ImageBuffer::from_fn(self.width, self.height, |x, y| {
            if x == bar_x {
                Rgb([255u8, 255, 255])
            } else {
                Rgb([
                    (x * 255 / self.width) as u8,
                    (y * 255 / self.height) as u8,
                    (index % 256) as u8,
                ])
            }
        });
        DynamicImage::ImageRgb8(buffer)
    }
}

impl FrameSource for TestPatternSource {
    fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
        if self.pos >= self.frame_count {
            return Ok(None);
        }

        let frame = SourceFrame {
            index: self.pos,
            image: self.render(self.pos),
        };
        self.pos += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_source_exhausts_and_rewinds() {
        let mut source = TestPatternSource::new(16, 8, 3);

        for expected in 0..3 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.index, expected);
        }
        assert!(source.next_frame().unwrap().is_none());

        source.rewind().unwrap();
        assert_eq!(source.next_frame().unwrap().unwrap().index, 0);
    }

    #[test]
    fn test_pattern_frames_deterministic() {
        let mut a = TestPatternSource::new(16, 8, 2);
        let mut b = TestPatternSource::new(16, 8, 2);

        let fa = a.next_frame().unwrap().unwrap();
        let fb = b.next_frame().unwrap().unwrap();
        assert_eq!(fa.image.to_rgb8().as_raw(), fb.image.to_rgb8().as_raw());
    }

    #[test]
    fn test_pattern_frames_differ_by_index() {
        let mut source = TestPatternSource::new(16, 8, 2);
        let f0 = source.next_frame().unwrap().unwrap();
        let f1 = source.next_frame().unwrap().unwrap();

        assert_ne!(f0.image.to_rgb8().as_raw(), f1.image.to_rgb8().as_raw());
    }

    #[test]
    fn test_missing_dir_fails_to_open() {
        assert!(JpegDirSource::open("/nonexistent/frames").is_err());
    }
}
