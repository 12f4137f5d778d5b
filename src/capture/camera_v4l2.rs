//! V4L2 camera backend.
//!
//! Opens a device node, negotiates format best-effort (preferring RGB3,
//! falling back to whatever the device reports) and memory-maps a capture
//! stream. The stream borrows the device, so both live together in a
//! self-referencing state struct.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use crate::config::CameraCaptureConfig;
use crate::frame::Frame;
use crate::util::decode_fourcc;

use super::normalize::{normalize_to_rgb, PixelFormat};

pub(crate) struct V4l2Camera {
    config: CameraCaptureConfig,
    state: Option<V4l2State>,
    active_width: u32,
    active_height: u32,
    active_format: Option<PixelFormat>,
    active_fps: Option<f64>,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Camera {
    pub(crate) fn new(config: CameraCaptureConfig) -> Self {
        let (width, height) = config.resolution.unwrap_or((640, 480));
        Self {
            config,
            state: None,
            active_width: width,
            active_height: height,
            active_format: None,
            active_fps: None,
        }
    }

    pub(crate) fn open(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.src)
            .with_context(|| format!("open v4l2 device {}", self.config.src))?;

        let mut format = device.format().context("read v4l2 format")?;
        if let Some((width, height)) = self.config.resolution {
            format.width = width;
            format.height = height;
        }
        let requested_fourcc = self.config.fourcc.as_deref().unwrap_or("RGB3");
        format.fourcc = v4l::FourCC::new(
            requested_fourcc
                .as_bytes()
                .try_into()
                .map_err(|_| anyhow!("FOURCC must be 4 characters: {requested_fourcc}"))?,
        );

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("failed to set format on {}: {err}", self.config.src);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        if let Some(fps) = self.config.fps {
            let params = v4l::video::capture::Parameters::with_fps(fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("failed to set fps on {}: {err}", self.config.src);
            }
        }
        self.active_fps = device
            .params()
            .ok()
            .and_then(|params| {
                let interval = params.interval;
                if interval.numerator == 0 {
                    None
                } else {
                    Some(f64::from(interval.denominator) / f64::from(interval.numerator))
                }
            });

        let fourcc = decode_fourcc(u32::from_le_bytes(format.fourcc.repr));
        self.active_width = format.width;
        self.active_height = format.height;
        self.active_format = Some(PixelFormat::from_fourcc(&fourcc)?);

        let state = V4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "capturing camera: {} ({fourcc}, {}x{}, {} fps)",
            self.config.src,
            self.active_width,
            self.active_height,
            self.active_fps.unwrap_or(0.0)
        );
        Ok(())
    }

    pub(crate) fn next(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self
            .state
            .as_mut()
            .context("v4l2 device not connected")?;
        let format = self
            .active_format
            .context("v4l2 pixel format not negotiated")?;

        let (width, height) = (self.active_width, self.active_height);
        let pixels = state.with_stream_mut(|stream| -> Result<Vec<u8>> {
            let (buf, _meta) = stream.next().context("capture v4l2 frame")?;
            normalize_to_rgb(buf, width, height, format)
        })?;
        Frame::new(pixels, width, height)
    }

    pub(crate) fn resolution(&self) -> Option<(u32, u32)> {
        Some((self.active_width, self.active_height))
    }

    pub(crate) fn fps(&self) -> Option<f64> {
        self.active_fps
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        self.state = None;
        Ok(())
    }
}
