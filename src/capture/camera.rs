//! Local camera device source.
//!
//! Requested fourcc/resolution/fps are applied best-effort; the values the
//! device actually accepted are read back and logged. Backends: synthetic
//! `stub://` (always) and V4L2 (feature: capture-v4l2).

use anyhow::{anyhow, Result};

use crate::config::CameraCaptureConfig;
use crate::frame::Frame;
use crate::transform::Transform;

use super::FrameSource;

#[cfg(feature = "capture-v4l2")]
use super::camera_v4l2::V4l2Camera;

const STUB_WIDTH: u32 = 640;
const STUB_HEIGHT: u32 = 480;
const STUB_FPS: f64 = 30.0;

/// Camera frame source.
pub struct CameraVideoCapture {
    transform: Option<Transform>,
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraBackend),
    #[cfg(feature = "capture-v4l2")]
    V4l2(V4l2Camera),
}

impl CameraVideoCapture {
    pub fn new(config: CameraCaptureConfig, transform: Option<Transform>) -> Result<Self> {
        let backend = if config.src.starts_with("stub://") {
            CameraBackend::Synthetic(SyntheticCameraBackend::new(config))
        } else {
            #[cfg(feature = "capture-v4l2")]
            {
                CameraBackend::V4l2(V4l2Camera::new(config))
            }
            #[cfg(not(feature = "capture-v4l2"))]
            {
                return Err(anyhow!(
                    "camera capture requires the capture-v4l2 feature (device {})",
                    config.src
                ));
            }
        };
        Ok(Self { transform, backend })
    }
}

impl FrameSource for CameraVideoCapture {
    fn open(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(backend) => backend.open(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::V4l2(backend) => backend.open(),
        }
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let frame = match &mut self.backend {
            CameraBackend::Synthetic(backend) => backend.next()?,
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::V4l2(backend) => backend.next()?,
        };
        match &self.transform {
            Some(transform) => Ok(Some(transform.apply(frame)?)),
            None => Ok(Some(frame)),
        }
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        match &self.backend {
            CameraBackend::Synthetic(backend) => Some(backend.resolution()),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::V4l2(backend) => backend.resolution(),
        }
    }

    fn fps(&self) -> Option<f64> {
        match &self.backend {
            CameraBackend::Synthetic(_) => Some(STUB_FPS),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::V4l2(backend) => backend.fps(),
        }
    }

    fn close(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(_) => Ok(()),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::V4l2(backend) => backend.close(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic backend (stub://) for tests and media-free builds
// ----------------------------------------------------------------------------

struct SyntheticCameraBackend {
    config: CameraCaptureConfig,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticCameraBackend {
    fn new(config: CameraCaptureConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn resolution(&self) -> (u32, u32) {
        self.config.resolution.unwrap_or((STUB_WIDTH, STUB_HEIGHT))
    }

    fn open(&mut self) -> Result<()> {
        let (width, height) = self.resolution();
        log::info!(
            "capturing camera: {} (synthetic, {width}x{height})",
            self.config.src
        );
        Ok(())
    }

    fn next(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let (width, height) = self.resolution();
        let pixel_count = (width * height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + u64::from(self.scene_state)) % 256) as u8;
        }
        Frame::new(pixels, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraCaptureConfig {
        CameraCaptureConfig {
            src: "stub://cam".to_string(),
            fourcc: None,
            resolution: Some((32, 24)),
            fps: None,
        }
    }

    #[test]
    fn stub_camera_produces_endless_frames() -> Result<()> {
        let mut capture = CameraVideoCapture::new(stub_config(), None)?;
        capture.open()?;
        for _ in 0..3 {
            let frame = capture.read()?.expect("live source");
            assert_eq!(frame.resolution(), (32, 24));
        }
        assert_eq!(capture.frame_count(), None);
        capture.close()
    }

    #[test]
    fn consecutive_frames_differ() -> Result<()> {
        let mut capture = CameraVideoCapture::new(stub_config(), None)?;
        capture.open()?;
        let first = capture.read()?.expect("frame");
        let second = capture.read()?.expect("frame");
        assert_ne!(first, second);
        capture.close()
    }
}
