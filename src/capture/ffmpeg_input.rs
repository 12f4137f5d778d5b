//! FFmpeg-backed demux/decode shared by the file and stream sources.
//!
//! Opens the best video stream of an input URL/path, decodes packets and
//! scales every frame to tightly packed RGB24.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use crate::frame::Frame;

pub(crate) struct FfmpegInput {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: Option<u64>,
    fps: Option<f64>,
    flushing: bool,
    finished: bool,
}

impl FfmpegInput {
    pub(crate) fn open(src: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&src)
            .with_context(|| format!("failed to open input '{src}' with ffmpeg"))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("input has no video track: {src}"))?;
        let stream_index = input_stream.index();

        let frame_count = match input_stream.frames() {
            n if n > 0 => Some(n as u64),
            // Some containers do not carry a frame count.
            _ => None,
        };
        let rate = input_stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 && rate.numerator() > 0 {
            Some(f64::from(rate.numerator()) / f64::from(rate.denominator()))
        } else {
            None
        };

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            frame_count,
            fps,
            flushing: false,
            finished: false,
        })
    }

    pub(crate) fn resolution(&self) -> (u32, u32) {
        (self.decoder.width(), self.decoder.height())
    }

    pub(crate) fn fps(&self) -> Option<f64> {
        self.fps
    }

    pub(crate) fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    /// Decode the next frame, `None` once the input is drained.
    pub(crate) fn next(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb = ffmpeg::frame::Video::empty();
                self.scaler
                    .run(&decoded, &mut rgb)
                    .context("scale frame to RGB")?;
                return Ok(Some(frame_from_rgb(&rgb)?));
            }
            if self.flushing {
                self.finished = true;
                return Ok(None);
            }
            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .send_packet(&packet)
                        .context("send packet to ffmpeg decoder")?;
                }
                None => {
                    self.decoder
                        .send_eof()
                        .context("flush ffmpeg decoder")?;
                    self.flushing = true;
                }
            }
        }
    }
}

/// Copy a scaled RGB24 frame into a tightly packed buffer, dropping any
/// row padding ffmpeg added.
fn frame_from_rgb(frame: &ffmpeg::frame::Video) -> Result<Frame> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0) as usize;
    let data = frame.data(0);

    if stride == row_bytes {
        return Frame::new(data.to_vec(), width, height);
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }
    Frame::new(pixels, width, height)
}
