//! Frame types flowing through capture sources and pipelines.
//!
//! - `Frame`: a single decoded image as an owned RGB24 buffer.
//! - `FrameData`: the per-item payload pipeline stages pass along (frame
//!   plus naming/position metadata).

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::fmt;
use std::path::PathBuf;

/// A single decoded video/image frame, tightly packed RGB24.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Build a frame from a tightly packed RGB24 buffer.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions {width}x{height} overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame buffer length mismatch for {width}x{height}: expected {expected}, got {}",
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn from_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            pixels: image.into_raw(),
            width,
            height,
        }
    }

    pub fn to_image(&self) -> RgbImage {
        // Length is validated at construction, so from_raw cannot fail.
        RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub fn into_image(self) -> RgbImage {
        let (width, height) = (self.width, self.height);
        RgbImage::from_raw(width, height, self.pixels)
            .unwrap_or_else(|| RgbImage::new(width, height))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// The payload flowing through a pipeline, one per captured frame.
#[derive(Clone, Debug)]
pub struct FrameData {
    /// Zero-based position in the sequence.
    pub idx: usize,
    /// Item name used by save stages (may contain path separators).
    pub name: String,
    pub frame: Frame,
    /// Original file path, set by image-directory capture.
    pub source_path: Option<PathBuf>,
}

impl FrameData {
    pub fn new(idx: usize, name: impl Into<String>, frame: Frame) -> Self {
        Self {
            idx,
            name: name.into(),
            frame,
            source_path: None,
        }
    }

    pub fn with_source_path(mut self, path: PathBuf) -> Self {
        self.source_path = Some(path);
        self
    }
}
