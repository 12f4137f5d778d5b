//! Optional per-frame transformations applied by capture sources.
//!
//! Configured declaratively (resize and/or flip) and applied to every frame
//! before it is handed downstream. Resizing with a single dimension
//! preserves the aspect ratio.

use anyhow::Result;
use image::imageops::{self, FilterType};
use serde::Deserialize;

use crate::frame::Frame;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TransformConfig {
    pub resize: Option<ResizeConfig>,
    pub flip: Option<FlipDirection>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResizeConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlipDirection {
    Horizontal,
    Vertical,
    Both,
}

/// A frame transformation built from [`TransformConfig`].
#[derive(Clone, Debug)]
pub struct Transform {
    config: TransformConfig,
}

impl Transform {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn apply(&self, frame: Frame) -> Result<Frame> {
        let mut image = frame.into_image();

        if let Some(resize) = &self.config.resize {
            if let Some((width, height)) = target_size(image.width(), image.height(), resize) {
                if (width, height) != image.dimensions() {
                    image = imageops::resize(&image, width, height, FilterType::Triangle);
                }
            }
        }

        match self.config.flip {
            Some(FlipDirection::Horizontal) => imageops::flip_horizontal_in_place(&mut image),
            Some(FlipDirection::Vertical) => imageops::flip_vertical_in_place(&mut image),
            Some(FlipDirection::Both) => {
                imageops::flip_horizontal_in_place(&mut image);
                imageops::flip_vertical_in_place(&mut image);
            }
            None => {}
        }

        Ok(Frame::from_image(image))
    }
}

/// Resolve the output size, keeping the aspect ratio when only one
/// dimension is configured. Returns `None` when no resize is requested.
fn target_size(src_w: u32, src_h: u32, resize: &ResizeConfig) -> Option<(u32, u32)> {
    match (resize.width, resize.height) {
        (None, None) => None,
        (Some(width), Some(height)) => Some((width.max(1), height.max(1))),
        (Some(width), None) => {
            let height = (f64::from(src_h) * f64::from(width) / f64::from(src_w)).round() as u32;
            Some((width.max(1), height.max(1)))
        }
        (None, Some(height)) => {
            let width = (f64::from(src_w) * f64::from(height) / f64::from(src_h)).round() as u32;
            Some((width.max(1), height.max(1)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let pixels = (0..width * height * 3).map(|i| (i % 256) as u8).collect();
        Frame::new(pixels, width, height).expect("valid frame")
    }

    #[test]
    fn resize_with_width_preserves_aspect_ratio() -> Result<()> {
        let transform = Transform::new(TransformConfig {
            resize: Some(ResizeConfig {
                width: Some(32),
                height: None,
            }),
            flip: None,
        });
        let out = transform.apply(gradient_frame(64, 48))?;
        assert_eq!(out.resolution(), (32, 24));
        Ok(())
    }

    #[test]
    fn resize_with_both_dimensions_is_exact() -> Result<()> {
        let transform = Transform::new(TransformConfig {
            resize: Some(ResizeConfig {
                width: Some(10),
                height: Some(20),
            }),
            flip: None,
        });
        let out = transform.apply(gradient_frame(64, 48))?;
        assert_eq!(out.resolution(), (10, 20));
        Ok(())
    }

    #[test]
    fn horizontal_flip_mirrors_pixels() -> Result<()> {
        let frame = Frame::new(vec![1, 1, 1, 2, 2, 2], 2, 1)?;
        let transform = Transform::new(TransformConfig {
            resize: None,
            flip: Some(FlipDirection::Horizontal),
        });
        let out = transform.apply(frame)?;
        assert_eq!(out.pixels(), &[2, 2, 2, 1, 1, 1]);
        Ok(())
    }

    #[test]
    fn empty_config_is_identity() -> Result<()> {
        let frame = gradient_frame(8, 8);
        let transform = Transform::new(TransformConfig::default());
        let out = transform.apply(frame.clone())?;
        assert_eq!(out, frame);
        Ok(())
    }
}
