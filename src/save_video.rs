//! Save a frame stream as a video file.
//!
//! The encoder is initialized lazily from the first frame's dimensions.
//! Requires the save-video-ffmpeg feature; without it, construction
//! returns an error naming the feature.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use crate::frame::Frame;

pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_FOURCC: &str = "mp4v";

/// Video writer configuration.
#[derive(Clone, Debug)]
pub struct SaveVideoConfig {
    pub dst: PathBuf,
    /// Frame rate of the created stream.
    pub fps: u32,
    /// Codec tag: `mp4v`, `mjpg` or `avc1`/`h264`.
    pub fourcc: String,
    pub overwrite: bool,
}

impl SaveVideoConfig {
    pub fn new(dst: impl Into<PathBuf>) -> Self {
        Self {
            dst: dst.into(),
            fps: DEFAULT_FPS,
            fourcc: DEFAULT_FOURCC.to_string(),
            overwrite: false,
        }
    }
}

#[derive(Debug)]
pub struct SaveVideo {
    #[cfg(feature = "save-video-ffmpeg")]
    sink: ffmpeg_sink::FfmpegVideoSink,
}

impl SaveVideo {
    pub fn new(config: SaveVideoConfig) -> Result<Self> {
        if !config.overwrite && config.dst.is_file() {
            return Err(anyhow!("{} already exists", config.dst.display()));
        }
        if let Some(parent) = parent_dir(&config.dst) {
            std::fs::create_dir_all(parent)?;
        }
        #[cfg(feature = "save-video-ffmpeg")]
        {
            Ok(Self {
                sink: ffmpeg_sink::FfmpegVideoSink::new(config)?,
            })
        }
        #[cfg(not(feature = "save-video-ffmpeg"))]
        {
            let _ = config;
            Err(anyhow!(
                "video encoding requires the save-video-ffmpeg feature"
            ))
        }
    }

    /// Append a frame. The writer is created from the first frame's size;
    /// later frames must match it.
    pub fn save(&mut self, frame: &Frame) -> Result<()> {
        #[cfg(feature = "save-video-ffmpeg")]
        {
            self.sink.save(frame)
        }
        #[cfg(not(feature = "save-video-ffmpeg"))]
        {
            let _ = frame;
            Err(anyhow!(
                "video encoding requires the save-video-ffmpeg feature"
            ))
        }
    }

    /// Flush the encoder and finalize the container.
    pub fn close(&mut self) -> Result<()> {
        #[cfg(feature = "save-video-ffmpeg")]
        {
            self.sink.close()
        }
        #[cfg(not(feature = "save-video-ffmpeg"))]
        {
            Ok(())
        }
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

#[cfg(feature = "save-video-ffmpeg")]
mod ffmpeg_sink {
    use anyhow::{anyhow, Context, Result};
    use ffmpeg_next as ffmpeg;

    use crate::frame::Frame;

    use super::SaveVideoConfig;

    pub(super) struct FfmpegVideoSink {
        config: SaveVideoConfig,
        output: ffmpeg::format::context::Output,
        encoder: Option<ffmpeg::encoder::Video>,
        scaler: Option<ffmpeg::software::scaling::Context>,
        stream_index: usize,
        stream_time_base: ffmpeg::Rational,
        frame_index: i64,
        finalized: bool,
    }

    impl FfmpegVideoSink {
        pub(super) fn new(config: SaveVideoConfig) -> Result<Self> {
            ffmpeg::init().context("initialize ffmpeg")?;
            let output = ffmpeg::format::output(&config.dst).with_context(|| {
                format!(
                    "failed to open output '{}' with ffmpeg",
                    config.dst.display()
                )
            })?;
            Ok(Self {
                config,
                output,
                encoder: None,
                scaler: None,
                stream_index: 0,
                stream_time_base: ffmpeg::Rational::new(1, super::DEFAULT_FPS as i32),
                frame_index: 0,
                finalized: false,
            })
        }

        fn codec_id(&self) -> Result<ffmpeg::codec::Id> {
            match self.config.fourcc.to_ascii_lowercase().as_str() {
                "mp4v" => Ok(ffmpeg::codec::Id::MPEG4),
                "mjpg" => Ok(ffmpeg::codec::Id::MJPEG),
                "avc1" | "h264" => Ok(ffmpeg::codec::Id::H264),
                other => Err(anyhow!("unsupported video codec tag: {other}")),
            }
        }

        fn init_writer(&mut self, width: u32, height: u32) -> Result<()> {
            let codec_id = self.codec_id()?;
            let codec = ffmpeg::encoder::find(codec_id)
                .ok_or_else(|| anyhow!("encoder for {codec_id:?} not available"))?;
            let global_header = self
                .output
                .format()
                .flags()
                .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

            let mut stream = self.output.add_stream(codec).context("add video stream")?;
            self.stream_index = stream.index();

            let context = ffmpeg::codec::context::Context::new_with_codec(codec);
            let mut encoder = context.encoder().video().context("create video encoder")?;
            let fps = self.config.fps.max(1) as i32;
            // MJPEG insists on full-range YUV.
            let pixel_format = if codec_id == ffmpeg::codec::Id::MJPEG {
                ffmpeg::util::format::pixel::Pixel::YUVJ420P
            } else {
                ffmpeg::util::format::pixel::Pixel::YUV420P
            };
            encoder.set_width(width);
            encoder.set_height(height);
            encoder.set_format(pixel_format);
            encoder.set_time_base(ffmpeg::Rational::new(1, fps));
            encoder.set_frame_rate(Some(ffmpeg::Rational::new(fps, 1)));
            if global_header {
                encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
            }

            let encoder = encoder.open().context("open video encoder")?;
            stream.set_parameters(&encoder);
            stream.set_time_base(ffmpeg::Rational::new(1, fps));

            let scaler = ffmpeg::software::scaling::context::Context::get(
                ffmpeg::util::format::pixel::Pixel::RGB24,
                width,
                height,
                pixel_format,
                width,
                height,
                ffmpeg::software::scaling::flag::Flags::BILINEAR,
            )
            .context("create ffmpeg scaler")?;

            self.output
                .write_header()
                .context("write container header")?;
            self.stream_time_base = self
                .output
                .stream(self.stream_index)
                .map(|stream| stream.time_base())
                .unwrap_or(ffmpeg::Rational::new(1, fps));
            self.encoder = Some(encoder);
            self.scaler = Some(scaler);

            log::info!(
                "writing video: {} ({}, {width}x{height}, {} fps)",
                self.config.dst.display(),
                self.config.fourcc,
                self.config.fps
            );
            Ok(())
        }

        pub(super) fn save(&mut self, frame: &Frame) -> Result<()> {
            if self.encoder.is_none() {
                self.init_writer(frame.width(), frame.height())?;
            }

            let (width, height) = frame.resolution();
            let mut rgb = ffmpeg::frame::Video::new(
                ffmpeg::util::format::pixel::Pixel::RGB24,
                width,
                height,
            );
            copy_rgb_into(frame, &mut rgb)?;

            let mut encoded = ffmpeg::frame::Video::empty();
            self.scaler
                .as_mut()
                .ok_or_else(|| anyhow!("video writer not initialized"))?
                .run(&rgb, &mut encoded)
                .context("convert frame for encoding")?;
            encoded.set_pts(Some(self.frame_index));
            self.frame_index += 1;

            self.encoder
                .as_mut()
                .ok_or_else(|| anyhow!("video writer not initialized"))?
                .send_frame(&encoded)
                .context("send frame to encoder")?;
            self.drain_packets()
        }

        pub(super) fn close(&mut self) -> Result<()> {
            if self.finalized {
                return Ok(());
            }
            if let Some(encoder) = self.encoder.as_mut() {
                encoder.send_eof().context("flush encoder")?;
                self.drain_packets()?;
                self.output
                    .write_trailer()
                    .context("write container trailer")?;
            }
            self.finalized = true;
            Ok(())
        }

        fn drain_packets(&mut self) -> Result<()> {
            let Some(encoder) = self.encoder.as_mut() else {
                return Ok(());
            };
            let mut packet = ffmpeg::Packet::empty();
            while encoder.receive_packet(&mut packet).is_ok() {
                packet.set_stream(self.stream_index);
                packet.rescale_ts(encoder.time_base(), self.stream_time_base);
                packet
                    .write_interleaved(&mut self.output)
                    .context("write encoded packet")?;
            }
            Ok(())
        }
    }

    impl Drop for FfmpegVideoSink {
        fn drop(&mut self) {
            if !self.finalized {
                if let Err(err) = self.close() {
                    log::warn!("failed to finalize video output: {err:#}");
                }
            }
        }
    }

    /// Copy tightly packed RGB24 into an ffmpeg frame, honoring its stride.
    fn copy_rgb_into(frame: &Frame, dst: &mut ffmpeg::frame::Video) -> Result<()> {
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let row_bytes = width * 3;
        let stride = dst.stride(0) as usize;
        let data = dst.data_mut(0);
        let pixels = frame.pixels();

        for row in 0..height {
            let src = &pixels[row * row_bytes..(row + 1) * row_bytes];
            let dst_row = data
                .get_mut(row * stride..row * stride + row_bytes)
                .ok_or_else(|| anyhow!("ffmpeg frame row is out of bounds"))?;
            dst_row.copy_from_slice(src);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "save-video-ffmpeg"))]
    #[test]
    fn construction_names_the_missing_feature() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = SaveVideo::new(SaveVideoConfig::new(dir.path().join("out.mp4")))
            .expect_err("must fail without the encoder feature");
        assert!(err.to_string().contains("save-video-ffmpeg"));
    }

    #[test]
    fn refuses_existing_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dst = dir.path().join("out.mp4");
        std::fs::write(&dst, b"existing").expect("write");

        let err = SaveVideo::new(SaveVideoConfig::new(&dst)).expect_err("must refuse overwrite");
        assert!(err.to_string().contains("already exists"));
    }
}
