//! Local video file source.
//!
//! Decodes frames from a local file and exposes an optional 1-based
//! `start_frame..=end_frame` range. Out-of-range bounds are clamped with a
//! warning rather than rejected. Backends: synthetic `stub://` (always)
//! and FFmpeg (feature: capture-file-ffmpeg).

use anyhow::{anyhow, Result};

use crate::config::FileCaptureConfig;
use crate::frame::Frame;
use crate::transform::Transform;

use super::FrameSource;

#[cfg(feature = "capture-file-ffmpeg")]
use super::ffmpeg_input::FfmpegInput;

const STUB_WIDTH: u32 = 640;
const STUB_HEIGHT: u32 = 480;
const STUB_FPS: f64 = 30.0;
const STUB_DEFAULT_FRAMES: u64 = 100;

/// Local file frame source.
pub struct FileVideoCapture {
    config: FileCaptureConfig,
    transform: Option<Transform>,
    backend: FileBackend,
    /// 1-based first frame to deliver, resolved at open.
    start_frame: u64,
    /// 1-based last frame to deliver (inclusive), when the length is known.
    end_frame: Option<u64>,
    /// Frames consumed from the backend so far (including skipped ones).
    position: u64,
    frame_count: Option<u64>,
    resolution: Option<(u32, u32)>,
    fps: Option<f64>,
}

enum FileBackend {
    Synthetic(SyntheticFileBackend),
    #[cfg(feature = "capture-file-ffmpeg")]
    Ffmpeg(Option<FfmpegInput>),
}

impl FileVideoCapture {
    pub fn new(config: FileCaptureConfig, transform: Option<Transform>) -> Result<Self> {
        if !is_local_file_path(&config.src) {
            return Err(anyhow!(
                "file capture only supports local paths (no URL schemes): {}",
                config.src
            ));
        }
        let backend = if config.src.starts_with("stub://") {
            FileBackend::Synthetic(SyntheticFileBackend::new(&config.src)?)
        } else {
            #[cfg(feature = "capture-file-ffmpeg")]
            {
                FileBackend::Ffmpeg(None)
            }
            #[cfg(not(feature = "capture-file-ffmpeg"))]
            {
                return Err(anyhow!(
                    "file capture requires the capture-file-ffmpeg feature"
                ));
            }
        };
        Ok(Self {
            config,
            transform,
            backend,
            start_frame: 1,
            end_frame: None,
            position: 0,
            frame_count: None,
            resolution: None,
            fps: None,
        })
    }

    fn resolve_range(&mut self) -> Result<()> {
        let fps = self.fps.unwrap_or(STUB_FPS);
        let mut start = match &self.config.start_frame {
            Some(pos) => pos.resolve(fps)?,
            None => 1,
        };
        let mut end = match &self.config.end_frame {
            Some(pos) => Some(pos.resolve(fps)?),
            None => self.frame_count,
        };

        if let Some(frame_count) = self.frame_count {
            if !(1..frame_count).contains(&start) {
                log::warn!("start frame {start} out of range (1, {})", frame_count - 1);
                log::warn!("resetting start frame to 1");
                start = 1;
            }
            if let Some(end_frame) = end {
                if !(end_frame > 1 && end_frame <= frame_count) {
                    log::warn!("end frame {end_frame} out of range (1, {frame_count})");
                    log::warn!("resetting end frame to {frame_count}");
                    end = Some(frame_count);
                }
            }
        }

        self.start_frame = start.max(1);
        self.end_frame = end;
        Ok(())
    }

    fn backend_next(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(backend) => Ok(backend.next()),
            #[cfg(feature = "capture-file-ffmpeg")]
            FileBackend::Ffmpeg(input) => input
                .as_mut()
                .ok_or_else(|| anyhow!("file source not opened"))?
                .next(),
        }
    }
}

impl FrameSource for FileVideoCapture {
    fn open(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(backend) => {
                self.frame_count = Some(backend.total_frames);
                self.resolution = Some((STUB_WIDTH, STUB_HEIGHT));
                self.fps = Some(STUB_FPS);
            }
            #[cfg(feature = "capture-file-ffmpeg")]
            FileBackend::Ffmpeg(input) => {
                let opened = FfmpegInput::open(&self.config.src)?;
                self.frame_count = opened.frame_count();
                self.resolution = Some(opened.resolution());
                self.fps = opened.fps();
                *input = Some(opened);
            }
        }
        self.resolve_range()?;

        log::info!("capturing file: {}", self.config.src);
        if let Some((width, height)) = self.resolution {
            log::info!("resolution: {width}x{height}");
        }
        if let Some(fps) = self.fps {
            log::info!("fps: {fps}");
        }

        // Reach start_frame by decoding and discarding.
        while self.position + 1 < self.start_frame {
            if self.backend_next()?.is_none() {
                break;
            }
            self.position += 1;
        }
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if let Some(end) = self.end_frame {
            if self.position >= end {
                return Ok(None);
            }
        }
        let Some(frame) = self.backend_next()? else {
            return Ok(None);
        };
        self.position += 1;
        match &self.transform {
            Some(transform) => Ok(Some(transform.apply(frame)?)),
            None => Ok(Some(frame)),
        }
    }

    fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn close(&mut self) -> Result<()> {
        #[cfg(feature = "capture-file-ffmpeg")]
        if let FileBackend::Ffmpeg(input) = &mut self.backend {
            *input = None;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Synthetic backend (stub://) for tests and media-free builds
// ----------------------------------------------------------------------------

struct SyntheticFileBackend {
    total_frames: u64,
    produced: u64,
    scene_state: u8,
}

impl SyntheticFileBackend {
    fn new(src: &str) -> Result<Self> {
        let total_frames = match src.split_once("?frames=") {
            Some((_, count)) => count
                .parse()
                .map_err(|_| anyhow!("invalid ?frames= value in {src}"))?,
            None => STUB_DEFAULT_FRAMES,
        };
        Ok(Self {
            total_frames,
            produced: 0,
            scene_state: 0,
        })
    }

    fn next(&mut self) -> Option<Frame> {
        if self.produced >= self.total_frames {
            return None;
        }
        self.produced += 1;
        if self.produced % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let pixel_count = (STUB_WIDTH * STUB_HEIGHT * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.produced + u64::from(self.scene_state)) % 256) as u8;
        }
        // Dimensions are fixed constants, so construction cannot fail.
        Frame::new(pixels, STUB_WIDTH, STUB_HEIGHT).ok()
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FramePos;

    fn stub_config(src: &str) -> FileCaptureConfig {
        FileCaptureConfig {
            src: src.to_string(),
            start_frame: None,
            end_frame: None,
        }
    }

    #[test]
    fn rejects_remote_urls() {
        let config = stub_config("https://example.com/clip.mp4");
        assert!(FileVideoCapture::new(config, None).is_err());
    }

    #[test]
    fn stub_source_reports_length_and_ends() -> Result<()> {
        let mut capture = FileVideoCapture::new(stub_config("stub://clip?frames=7"), None)?;
        capture.open()?;
        assert_eq!(capture.frame_count(), Some(7));

        let mut frames = 0;
        while capture.read()?.is_some() {
            frames += 1;
        }
        assert_eq!(frames, 7);
        assert!(capture.read()?.is_none());
        capture.close()
    }

    #[test]
    fn frame_range_is_inclusive() -> Result<()> {
        let mut config = stub_config("stub://clip?frames=30");
        config.start_frame = Some(FramePos::Index(10));
        config.end_frame = Some(FramePos::Index(20));
        let mut capture = FileVideoCapture::new(config, None)?;
        capture.open()?;

        let mut frames = 0;
        while capture.read()?.is_some() {
            frames += 1;
        }
        // Frames 10..=20.
        assert_eq!(frames, 11);
        capture.close()
    }

    #[test]
    fn out_of_range_bounds_are_clamped() -> Result<()> {
        let mut config = stub_config("stub://clip?frames=10");
        config.start_frame = Some(FramePos::Index(500));
        config.end_frame = Some(FramePos::Index(999));
        let mut capture = FileVideoCapture::new(config, None)?;
        capture.open()?;

        let mut frames = 0;
        while capture.read()?.is_some() {
            frames += 1;
        }
        // Both bounds reset, so the full clip is delivered.
        assert_eq!(frames, 10);
        capture.close()
    }

    #[test]
    fn transform_is_applied_to_read_frames() -> Result<()> {
        use crate::transform::{ResizeConfig, Transform, TransformConfig};

        let transform = Transform::new(TransformConfig {
            resize: Some(ResizeConfig {
                width: Some(64),
                height: None,
            }),
            flip: None,
        });
        let mut capture =
            FileVideoCapture::new(stub_config("stub://clip?frames=1"), Some(transform))?;
        capture.open()?;
        let frame = capture.read()?.expect("one frame");
        assert_eq!(frame.resolution(), (64, 48));
        capture.close()
    }
}
