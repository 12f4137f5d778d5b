//! frameflow - building blocks for frame-processing tools
//!
//! This crate wraps the plumbing shared by video/image utilities:
//!
//! - `capture`: frame sources (video files, cameras, streams, image
//!   directories) with an optional background capture thread feeding a
//!   bounded queue
//! - `pipeline`: lazy map/filter pipelines with stage lifecycle, plus
//!   ready-made capture/save/metrics/progress stages
//! - `save_image` / `save_video`: frame sinks
//! - `transform`: resize and flip applied at the capture boundary
//! - `metrics` / `progress`: per-iteration instrumentation
//! - `observable`: process-wide events, mainly the clean-shutdown signal
//! - `config`: TOML capture configuration with env overrides
//!
//! Heavy media backends are feature-gated (`capture-file-ffmpeg`,
//! `capture-stream-ffmpeg`, `capture-v4l2`, `save-video-ffmpeg`); every
//! capture path also has a synthetic `stub://` backend that is always
//! compiled, so the crate works without native media libraries.

pub mod capture;
pub mod config;
pub mod frame;
pub mod fs;
pub mod metrics;
pub mod observable;
pub mod pipeline;
pub mod progress;
pub mod save_image;
pub mod save_video;
pub mod transform;
pub mod util;

pub use capture::{
    BoundedFrameQueue, CameraVideoCapture, FileVideoCapture, FrameSource, ImageCapture,
    StreamVideoCapture, ThreadedSource, VideoCapture,
};
pub use config::{CaptureConfig, CaptureKind, FramePos};
pub use frame::{Frame, FrameData};
pub use metrics::Metrics;
pub use observable::{observable, Observable, STOP_EVENT};
pub use pipeline::{
    CaptureImagePipe, CaptureVideoPipe, FilterStage, MapStage, MetricsPipe, Pipeline, ProgressPipe,
    SaveImagePipe, SaveVideoPipe, SourceStage,
};
pub use progress::Progress;
pub use save_image::{ImageFormat, SaveImage};
pub use save_video::{SaveVideo, SaveVideoConfig};
pub use transform::{Transform, TransformConfig};
