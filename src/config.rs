//! Capture configuration.
//!
//! Loaded from a TOML file, then overridden by `FRAMEFLOW_*` environment
//! variables, then validated. The `capture` key selects which source
//! section (`[file]`, `[camera]`, `[stream]`) is used.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
/// Queue size for buffered file decoding.
pub const DEFAULT_FILE_QUEUE_SIZE: usize = 16;
/// Queue size for live sources; small to keep frames fresh.
pub const DEFAULT_LIVE_QUEUE_SIZE: usize = 5;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    File,
    Camera,
    Stream,
}

impl FromStr for CaptureKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "file" => Ok(CaptureKind::File),
            "camera" => Ok(CaptureKind::Camera),
            "stream" => Ok(CaptureKind::Stream),
            other => Err(anyhow!("unsupported capture type: {other}")),
        }
    }
}

/// A frame position, either a 1-based frame index or a `[HH:]MM:SS[.mmm]`
/// time string resolved against the source fps.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FramePos {
    Index(u64),
    Time(String),
}

impl FromStr for FramePos {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(anyhow!("frame position must not be empty"));
        }
        if value.chars().all(|c| c.is_ascii_digit()) {
            return Ok(FramePos::Index(value.parse()?));
        }
        // Validate the time format up front so bad input fails at parse
        // time rather than mid-capture.
        crate::util::parse_time(value)?;
        Ok(FramePos::Time(value.to_string()))
    }
}

impl FramePos {
    /// Resolve to a 1-based frame index.
    pub fn resolve(&self, fps: f64) -> Result<u64> {
        match self {
            FramePos::Index(idx) => Ok(*idx),
            FramePos::Time(time) => {
                let seconds = crate::util::parse_time(time)?;
                Ok((seconds * fps) as u64)
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    pub capture: CaptureKind,
    #[serde(default = "default_threaded")]
    pub threaded: bool,
    /// Frames buffered ahead by the capture thread. Defaults to
    /// [`DEFAULT_FILE_QUEUE_SIZE`] for files, [`DEFAULT_LIVE_QUEUE_SIZE`]
    /// for live sources.
    pub queue_size: Option<usize>,
    pub file: Option<FileCaptureConfig>,
    pub camera: Option<CameraCaptureConfig>,
    pub stream: Option<StreamCaptureConfig>,
    pub transform: Option<crate::transform::TransformConfig>,
}

fn default_threaded() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct FileCaptureConfig {
    /// Local video file path (`stub://` for the synthetic backend).
    pub src: String,
    pub start_frame: Option<FramePos>,
    pub end_frame: Option<FramePos>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CameraCaptureConfig {
    /// Device path, e.g. `/dev/video0` (`stub://` for the synthetic backend).
    #[serde(default = "default_camera_device")]
    pub src: String,
    /// Preferred pixel-format FOURCC, applied best-effort.
    pub fourcc: Option<String>,
    /// Preferred resolution, applied best-effort.
    pub resolution: Option<(u32, u32)>,
    /// Preferred frame rate, applied best-effort.
    pub fps: Option<u32>,
}

fn default_camera_device() -> String {
    DEFAULT_CAMERA_DEVICE.to_string()
}

impl Default for CameraCaptureConfig {
    fn default() -> Self {
        Self {
            src: default_camera_device(),
            fourcc: None,
            resolution: None,
            fps: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamCaptureConfig {
    /// Stream URL, e.g. `rtsp://...` (`stub://` for the synthetic backend).
    pub src: String,
}

impl CaptureConfig {
    /// Load from a TOML file, apply env overrides, validate.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse from a TOML string without env overrides or validation.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Build a minimal config for a single source string: digits select a
    /// camera index, URLs a stream, anything else a file path.
    pub fn for_source(src: &str) -> Self {
        let (capture, file, camera, stream) = if src.chars().all(|c| c.is_ascii_digit())
            && !src.is_empty()
        {
            let camera = CameraCaptureConfig {
                src: format!("/dev/video{src}"),
                ..CameraCaptureConfig::default()
            };
            (CaptureKind::Camera, None, Some(camera), None)
        } else if src.contains("://") && !src.starts_with("stub://") {
            let stream = StreamCaptureConfig {
                src: src.to_string(),
            };
            (CaptureKind::Stream, None, None, Some(stream))
        } else {
            let file = FileCaptureConfig {
                src: src.to_string(),
                start_frame: None,
                end_frame: None,
            };
            (CaptureKind::File, Some(file), None, None)
        };
        Self {
            capture,
            threaded: true,
            queue_size: None,
            file,
            camera,
            stream,
            transform: None,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(kind) = std::env::var("FRAMEFLOW_CAPTURE") {
            if !kind.trim().is_empty() {
                self.capture = kind.parse()?;
            }
        }
        if let Ok(src) = std::env::var("FRAMEFLOW_SOURCE") {
            if !src.trim().is_empty() {
                match self.capture {
                    CaptureKind::File => {
                        self.file
                            .get_or_insert_with(|| FileCaptureConfig {
                                src: String::new(),
                                start_frame: None,
                                end_frame: None,
                            })
                            .src = src;
                    }
                    CaptureKind::Camera => {
                        self.camera.get_or_insert_with(CameraCaptureConfig::default).src = src;
                    }
                    CaptureKind::Stream => {
                        self.stream
                            .get_or_insert_with(|| StreamCaptureConfig {
                                src: String::new(),
                            })
                            .src = src;
                    }
                }
            }
        }
        if let Ok(threaded) = std::env::var("FRAMEFLOW_THREADED") {
            self.threaded = threaded
                .parse()
                .map_err(|_| anyhow!("FRAMEFLOW_THREADED must be true or false"))?;
        }
        if let Ok(queue_size) = std::env::var("FRAMEFLOW_QUEUE_SIZE") {
            let size: usize = queue_size
                .parse()
                .map_err(|_| anyhow!("FRAMEFLOW_QUEUE_SIZE must be a positive integer"))?;
            self.queue_size = Some(size);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.queue_size == Some(0) {
            return Err(anyhow!("queue_size must be at least 1"));
        }
        match self.capture {
            CaptureKind::File => {
                let file = self
                    .file
                    .as_ref()
                    .ok_or_else(|| anyhow!("capture = \"file\" requires a [file] section"))?;
                if file.src.trim().is_empty() {
                    return Err(anyhow!("file capture requires a non-empty src"));
                }
            }
            CaptureKind::Camera => {
                if self.camera.is_none() {
                    return Err(anyhow!("capture = \"camera\" requires a [camera] section"));
                }
            }
            CaptureKind::Stream => {
                let stream = self
                    .stream
                    .as_ref()
                    .ok_or_else(|| anyhow!("capture = \"stream\" requires a [stream] section"))?;
                if stream.src.trim().is_empty() {
                    return Err(anyhow!("stream capture requires a non-empty src"));
                }
            }
        }
        Ok(())
    }

    /// Queue size to use for the threaded wrapper.
    pub fn effective_queue_size(&self) -> usize {
        self.queue_size.unwrap_or(match self.capture {
            CaptureKind::File => DEFAULT_FILE_QUEUE_SIZE,
            CaptureKind::Camera | CaptureKind::Stream => DEFAULT_LIVE_QUEUE_SIZE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_capture_with_range() -> Result<()> {
        let cfg = CaptureConfig::from_toml_str(
            r#"
            capture = "file"

            [file]
            src = "clip.mp4"
            start_frame = 10
            end_frame = "1:30.250"

            [transform.resize]
            width = 640
            "#,
        )?;
        assert_eq!(cfg.capture, CaptureKind::File);
        assert!(cfg.threaded);
        let file = cfg.file.expect("file section");
        assert_eq!(file.src, "clip.mp4");
        assert_eq!(file.start_frame, Some(FramePos::Index(10)));
        assert_eq!(file.end_frame, Some(FramePos::Time("1:30.250".into())));
        Ok(())
    }

    #[test]
    fn rejects_unknown_capture_kind() {
        let err = CaptureConfig::from_toml_str("capture = \"screen\"");
        assert!(err.is_err());
    }

    #[test]
    fn validate_requires_matching_section() -> Result<()> {
        let cfg = CaptureConfig::from_toml_str("capture = \"stream\"")?;
        assert!(cfg.validate().is_err());
        Ok(())
    }

    #[test]
    fn validate_rejects_zero_queue() -> Result<()> {
        let mut cfg = CaptureConfig::for_source("clip.mp4");
        cfg.queue_size = Some(0);
        assert!(cfg.validate().is_err());
        Ok(())
    }

    #[test]
    fn for_source_classifies_inputs() {
        assert_eq!(CaptureConfig::for_source("0").capture, CaptureKind::Camera);
        assert_eq!(
            CaptureConfig::for_source("rtsp://cam/live").capture,
            CaptureKind::Stream
        );
        assert_eq!(
            CaptureConfig::for_source("clip.mp4").capture,
            CaptureKind::File
        );
        assert_eq!(
            CaptureConfig::for_source("stub://clip").capture,
            CaptureKind::File
        );
    }

    #[test]
    fn frame_pos_parses_from_cli_strings() -> Result<()> {
        assert_eq!("12".parse::<FramePos>()?, FramePos::Index(12));
        assert_eq!("1:30".parse::<FramePos>()?, FramePos::Time("1:30".into()));
        assert!("abc".parse::<FramePos>().is_err());
        Ok(())
    }

    #[test]
    fn frame_pos_resolves_times_against_fps() -> Result<()> {
        assert_eq!(FramePos::Index(7).resolve(30.0)?, 7);
        assert_eq!(FramePos::Time("0:02".into()).resolve(25.0)?, 50);
        Ok(())
    }

    #[test]
    fn effective_queue_size_defaults_by_kind() {
        assert_eq!(
            CaptureConfig::for_source("clip.mp4").effective_queue_size(),
            DEFAULT_FILE_QUEUE_SIZE
        );
        assert_eq!(
            CaptureConfig::for_source("0").effective_queue_size(),
            DEFAULT_LIVE_QUEUE_SIZE
        );
    }
}
