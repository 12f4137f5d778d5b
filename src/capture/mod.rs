//! Frame capture sources.
//!
//! Thin wrappers around media backends that all produce [`Frame`]s:
//! - Local video files (feature: capture-file-ffmpeg)
//! - Local camera devices (feature: capture-v4l2)
//! - Network streams (feature: capture-stream-ffmpeg)
//! - Still-image files/directories
//!
//! Every source type also has a synthetic `stub://` backend that is always
//! compiled, so capture paths are exercisable without native media
//! libraries. [`VideoCapture`] is the config-driven front: it picks the
//! source, applies the optional transform, and (by default) wraps the
//! source in [`ThreadedSource`] so acquisition overlaps processing.

pub mod camera;
#[cfg(feature = "capture-v4l2")]
pub(crate) mod camera_v4l2;
pub mod file;
#[cfg(any(feature = "capture-file-ffmpeg", feature = "capture-stream-ffmpeg"))]
pub(crate) mod ffmpeg_input;
pub mod image_dir;
#[cfg(feature = "capture-v4l2")]
pub(crate) mod normalize;
pub mod queue;
pub mod stream;

pub use camera::CameraVideoCapture;
pub use file::FileVideoCapture;
pub use image_dir::ImageCapture;
pub use queue::{BoundedFrameQueue, ThreadedSource};
pub use stream::StreamVideoCapture;

use anyhow::{anyhow, Result};

use crate::config::{CaptureConfig, CaptureKind};
use crate::frame::Frame;
use crate::transform::Transform;

/// A source of decoded frames.
///
/// `read` returns `Ok(None)` at end of stream; live sources simply never
/// do. Sources must be `open`ed before the first read and `close`d to
/// release backend resources.
pub trait FrameSource {
    fn open(&mut self) -> Result<()>;
    fn read(&mut self) -> Result<Option<Frame>>;

    /// Total number of frames, when the source is finite and known.
    fn frame_count(&self) -> Option<u64> {
        None
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        None
    }

    fn fps(&self) -> Option<f64> {
        None
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

enum CaptureInner {
    Direct(Box<dyn FrameSource + Send>),
    Threaded(ThreadedSource),
}

/// Config-driven video capture front.
pub struct VideoCapture {
    inner: CaptureInner,
}

impl VideoCapture {
    /// Build and open the source selected by `config`.
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let transform = config.transform.clone().map(Transform::new);

        let mut source: Box<dyn FrameSource + Send> = match config.capture {
            CaptureKind::File => {
                let file = config
                    .file
                    .clone()
                    .ok_or_else(|| anyhow!("file capture requires a [file] section"))?;
                Box::new(FileVideoCapture::new(file, transform)?)
            }
            CaptureKind::Camera => {
                let camera = config.camera.clone().unwrap_or_default();
                Box::new(CameraVideoCapture::new(camera, transform)?)
            }
            CaptureKind::Stream => {
                let stream = config
                    .stream
                    .clone()
                    .ok_or_else(|| anyhow!("stream capture requires a [stream] section"))?;
                Box::new(StreamVideoCapture::new(stream, transform)?)
            }
        };
        source.open()?;

        let inner = if config.threaded {
            CaptureInner::Threaded(ThreadedSource::spawn(source, config.effective_queue_size())?)
        } else {
            CaptureInner::Direct(source)
        };
        Ok(Self { inner })
    }

    /// Next frame in order, `None` once the source is exhausted.
    pub fn read(&mut self) -> Result<Option<Frame>> {
        match &mut self.inner {
            CaptureInner::Direct(source) => source.read(),
            CaptureInner::Threaded(source) => source.read(),
        }
    }

    pub fn frame_count(&self) -> Option<u64> {
        match &self.inner {
            CaptureInner::Direct(source) => source.frame_count(),
            CaptureInner::Threaded(source) => source.frame_count(),
        }
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        match &self.inner {
            CaptureInner::Direct(source) => source.resolution(),
            CaptureInner::Threaded(source) => source.resolution(),
        }
    }

    pub fn fps(&self) -> Option<f64> {
        match &self.inner {
            CaptureInner::Direct(source) => source.fps(),
            CaptureInner::Threaded(source) => source.fps(),
        }
    }

    /// Release the source (and join the capture thread when threaded).
    pub fn close(&mut self) -> Result<()> {
        match &mut self.inner {
            CaptureInner::Direct(source) => source.close(),
            CaptureInner::Threaded(source) => source.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;

    #[test]
    fn threaded_stub_file_capture_delivers_all_frames() -> Result<()> {
        let mut config = CaptureConfig::for_source("stub://clip?frames=20");
        config.queue_size = Some(4);
        let mut capture = VideoCapture::open(&config)?;
        assert_eq!(capture.frame_count(), Some(20));

        let mut frames = 0;
        while let Some(_frame) = capture.read()? {
            frames += 1;
        }
        assert_eq!(frames, 20);
        capture.close()?;
        Ok(())
    }

    #[test]
    fn unthreaded_capture_matches_threaded_output() -> Result<()> {
        let mut threaded_cfg = CaptureConfig::for_source("stub://clip?frames=5");
        let mut direct_cfg = threaded_cfg.clone();
        threaded_cfg.threaded = true;
        direct_cfg.threaded = false;

        let mut threaded = VideoCapture::open(&threaded_cfg)?;
        let mut direct = VideoCapture::open(&direct_cfg)?;
        loop {
            let a = threaded.read()?;
            let b = direct.read()?;
            assert_eq!(a, b);
            if a.is_none() {
                break;
            }
        }
        threaded.close()?;
        direct.close()?;
        Ok(())
    }
}
