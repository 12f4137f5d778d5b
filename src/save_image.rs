//! Save frames as still images.

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use serde::Deserialize;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::frame::Frame;

const DEFAULT_JPG_QUALITY: u8 = 95;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            "png" => Ok(ImageFormat::Png),
            other => Err(anyhow!("unsupported image extension: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

/// Writes frames as images under an output root.
///
/// `name` may contain path separators; intermediate directories are
/// created. Existing files are an error unless `overwrite` is set.
pub struct SaveImage {
    output_root: PathBuf,
    format: ImageFormat,
    jpg_quality: Option<u8>,
    png_compression: Option<PngCompression>,
    overwrite: bool,
}

impl SaveImage {
    pub fn new(output_root: impl Into<PathBuf>, format: ImageFormat) -> Self {
        Self {
            output_root: output_root.into(),
            format,
            jpg_quality: None,
            png_compression: None,
            overwrite: false,
        }
    }

    pub fn with_jpg_quality(mut self, quality: u8) -> Self {
        self.jpg_quality = Some(quality.min(100));
        self
    }

    pub fn with_png_compression(mut self, compression: PngCompression) -> Self {
        self.png_compression = Some(compression);
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Write `frame` as `<output_root>/<name>.<ext>` and return the path.
    pub fn save(&self, frame: &Frame, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let path = self
            .output_root
            .join(relative.with_extension(self.format.extension()));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        if !self.overwrite && path.exists() {
            return Err(anyhow!("{} already exists", path.display()));
        }

        let file = std::fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let writer = BufWriter::new(file);
        match self.format {
            ImageFormat::Jpg => {
                let quality = self.jpg_quality.unwrap_or(DEFAULT_JPG_QUALITY);
                JpegEncoder::new_with_quality(writer, quality)
                    .write_image(
                        frame.pixels(),
                        frame.width(),
                        frame.height(),
                        ExtendedColorType::Rgb8,
                    )
                    .with_context(|| format!("failed to encode {}", path.display()))?;
            }
            ImageFormat::Png => {
                let compression = match self.png_compression.unwrap_or_default() {
                    PngCompression::Fast => CompressionType::Fast,
                    PngCompression::Default => CompressionType::Default,
                    PngCompression::Best => CompressionType::Best,
                };
                PngEncoder::new_with_quality(writer, compression, FilterType::Adaptive)
                    .write_image(
                        frame.pixels(),
                        frame.width(),
                        frame.height(),
                        ExtendedColorType::Rgb8,
                    )
                    .with_context(|| format!("failed to encode {}", path.display()))?;
            }
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame() -> Frame {
        let pixels = (0..4 * 4 * 3).map(|i| (i % 256) as u8).collect();
        Frame::new(pixels, 4, 4).expect("valid frame")
    }

    #[test]
    fn saves_png_with_nested_name() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let save = SaveImage::new(dir.path(), ImageFormat::Png);

        let path = save.save(&test_frame(), "run1/000001")?;
        assert_eq!(path, dir.path().join("run1").join("000001.png"));

        let decoded = image::open(&path)?.to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.into_raw(), test_frame().pixels());
        Ok(())
    }

    #[test]
    fn refuses_to_overwrite_by_default() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let save = SaveImage::new(dir.path(), ImageFormat::Jpg);

        save.save(&test_frame(), "frame")?;
        assert!(save.save(&test_frame(), "frame").is_err());

        let save = save.with_overwrite(true);
        save.save(&test_frame(), "frame")?;
        Ok(())
    }

    #[test]
    fn format_parses_from_extension() -> Result<()> {
        assert_eq!(ImageFormat::from_str(".jpeg")?, ImageFormat::Jpg);
        assert_eq!(ImageFormat::from_str("PNG")?, ImageFormat::Png);
        assert!(ImageFormat::from_str("bmp").is_err());
        Ok(())
    }
}
