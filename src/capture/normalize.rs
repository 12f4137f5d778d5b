//! Pixel-format normalization for camera backends.
//!
//! Devices that refuse RGB3 commonly deliver YUYV (packed 4:2:2) or NV12;
//! both are converted to tightly packed RGB24 here.

use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Yuyv,
    Nv12,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(tag: &str) -> Result<Self> {
        match tag {
            "RGB3" => Ok(PixelFormat::Rgb24),
            "YUYV" => Ok(PixelFormat::Yuyv),
            "NV12" => Ok(PixelFormat::Nv12),
            other => Err(anyhow!("unsupported camera pixel format: {other}")),
        }
    }
}

pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    match format {
        PixelFormat::Rgb24 => {
            let expected = frame_area(width, height)? * 3;
            if pixels.len() != expected {
                return Err(anyhow!(
                    "RGB frame length mismatch: expected {expected}, got {}",
                    pixels.len()
                ));
            }
            Ok(pixels.to_vec())
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, width, height),
        PixelFormat::Nv12 => nv12_to_rgb(pixels, width, height),
    }
}

fn frame_area(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let area = frame_area(width, height)?;
    let expected = area * 2;
    if pixels.len() != expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {expected}, got {}",
            pixels.len()
        ));
    }

    let mut rgb = vec![0u8; area * 3];
    for (pair_idx, chunk) in pixels.chunks_exact(4).enumerate() {
        let [y0, u, y1, v] = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let u = f32::from(u) - 128.0;
        let v = f32::from(v) - 128.0;
        for (offset, y) in [(0usize, y0), (1, y1)] {
            let out = (pair_idx * 2 + offset) * 3;
            write_yuv_pixel(&mut rgb[out..out + 3], f32::from(y), u, v);
        }
    }
    Ok(rgb)
}

fn nv12_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    let y_plane = frame_area(width, height)?;
    let expected = y_plane + y_plane / 2;
    if pixels.len() != expected {
        return Err(anyhow!(
            "NV12 frame length mismatch: expected {expected}, got {}",
            pixels.len()
        ));
    }

    let mut rgb = vec![0u8; y_plane * 3];
    for j in 0..h {
        for i in 0..w {
            let y = f32::from(pixels[j * w + i]);
            let uv_index = y_plane + (j / 2) * w + (i / 2) * 2;
            let u = f32::from(pixels[uv_index]) - 128.0;
            let v = f32::from(pixels[uv_index + 1]) - 128.0;
            let out = (j * w + i) * 3;
            write_yuv_pixel(&mut rgb[out..out + 3], y, u, v);
        }
    }
    Ok(rgb)
}

fn write_yuv_pixel(out: &mut [u8], y: f32, u: f32, v: f32) {
    let r = y + 1.402_f32 * v;
    let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
    let b = y + 1.772_f32 * u;
    out[0] = clamp_to_u8(r);
    out[1] = clamp_to_u8(g);
    out[2] = clamp_to_u8(b);
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_gray_converts_to_gray() -> Result<()> {
        // Y=128, U=V=128 is mid-gray.
        let yuyv = vec![128u8; 2 * 2 * 2];
        let rgb = normalize_to_rgb(&yuyv, 2, 2, PixelFormat::Yuyv)?;
        assert_eq!(rgb, vec![128u8; 12]);
        Ok(())
    }

    #[test]
    fn nv12_gray_converts_to_gray() -> Result<()> {
        let nv12 = [vec![128u8; 4], vec![128u8; 2]].concat();
        let rgb = normalize_to_rgb(&nv12, 2, 2, PixelFormat::Nv12)?;
        assert_eq!(rgb, vec![128u8; 12]);
        Ok(())
    }

    #[test]
    fn rgb_pass_through_validates_length() {
        assert!(normalize_to_rgb(&[0u8; 12], 2, 2, PixelFormat::Rgb24).is_ok());
        assert!(normalize_to_rgb(&[0u8; 11], 2, 2, PixelFormat::Rgb24).is_err());
    }

    #[test]
    fn unknown_fourcc_is_rejected() {
        assert!(PixelFormat::from_fourcc("MJPG").is_err());
    }
}
