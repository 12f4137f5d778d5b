//! Network stream source (RTSP/HTTP).
//!
//! Backends: synthetic `stub://` (always) and FFmpeg (feature:
//! capture-stream-ffmpeg). Stream sources are unbounded; `read` only
//! returns `None` when the remote end closes.

use anyhow::{anyhow, Result};

use crate::config::StreamCaptureConfig;
use crate::frame::Frame;
use crate::transform::Transform;

use super::FrameSource;

#[cfg(feature = "capture-stream-ffmpeg")]
use super::ffmpeg_input::FfmpegInput;

const STUB_WIDTH: u32 = 640;
const STUB_HEIGHT: u32 = 480;

/// Stream frame source.
pub struct StreamVideoCapture {
    config: StreamCaptureConfig,
    transform: Option<Transform>,
    backend: StreamBackend,
    resolution: Option<(u32, u32)>,
    fps: Option<f64>,
}

enum StreamBackend {
    Synthetic(SyntheticStreamBackend),
    #[cfg(feature = "capture-stream-ffmpeg")]
    Ffmpeg(Option<FfmpegInput>),
}

impl StreamVideoCapture {
    pub fn new(config: StreamCaptureConfig, transform: Option<Transform>) -> Result<Self> {
        let backend = if config.src.starts_with("stub://") {
            StreamBackend::Synthetic(SyntheticStreamBackend::default())
        } else {
            #[cfg(feature = "capture-stream-ffmpeg")]
            {
                StreamBackend::Ffmpeg(None)
            }
            #[cfg(not(feature = "capture-stream-ffmpeg"))]
            {
                return Err(anyhow!(
                    "stream capture requires the capture-stream-ffmpeg feature ({})",
                    config.src
                ));
            }
        };
        Ok(Self {
            config,
            transform,
            backend,
            resolution: None,
            fps: None,
        })
    }
}

impl FrameSource for StreamVideoCapture {
    fn open(&mut self) -> Result<()> {
        match &mut self.backend {
            StreamBackend::Synthetic(_) => {
                self.resolution = Some((STUB_WIDTH, STUB_HEIGHT));
                log::info!("capturing stream: {} (synthetic)", self.config.src);
            }
            #[cfg(feature = "capture-stream-ffmpeg")]
            StreamBackend::Ffmpeg(input) => {
                let opened = FfmpegInput::open(&self.config.src)?;
                self.resolution = Some(opened.resolution());
                self.fps = opened.fps();
                *input = Some(opened);
                log::info!("capturing stream: {}", self.config.src);
            }
        }
        if let Some((width, height)) = self.resolution {
            log::info!("resolution: {width}x{height}");
        }
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let frame = match &mut self.backend {
            StreamBackend::Synthetic(backend) => Some(backend.next()?),
            #[cfg(feature = "capture-stream-ffmpeg")]
            StreamBackend::Ffmpeg(input) => input
                .as_mut()
                .ok_or_else(|| anyhow!("stream source not opened"))?
                .next()?,
        };
        match (&self.transform, frame) {
            (Some(transform), Some(frame)) => Ok(Some(transform.apply(frame)?)),
            (_, frame) => Ok(frame),
        }
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn close(&mut self) -> Result<()> {
        #[cfg(feature = "capture-stream-ffmpeg")]
        if let StreamBackend::Ffmpeg(input) = &mut self.backend {
            *input = None;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Synthetic backend (stub://) for tests and media-free builds
// ----------------------------------------------------------------------------

#[derive(Default)]
struct SyntheticStreamBackend {
    frame_count: u64,
}

impl SyntheticStreamBackend {
    fn next(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let pixel_count = (STUB_WIDTH * STUB_HEIGHT * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        Frame::new(pixels, STUB_WIDTH, STUB_HEIGHT)
    }
}
