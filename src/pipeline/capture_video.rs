//! Pipeline source over [`VideoCapture`].

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::VideoCapture;
use crate::config::CaptureConfig;
use crate::frame::FrameData;
use crate::observable::{observable, SubscriptionId, STOP_EVENT};

use super::SourceStage;

/// Emits one [`FrameData`] per captured frame, named `000000`, `000001`, …
///
/// Subscribes to [`STOP_EVENT`] so a Ctrl+C (or any other notifier) ends
/// the stream cleanly after the in-flight frame.
pub struct CaptureVideoPipe {
    capture: VideoCapture,
    idx: usize,
    stopped: Arc<AtomicBool>,
    subscription: Option<SubscriptionId>,
}

impl CaptureVideoPipe {
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let capture = VideoCapture::open(config)?;
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        let subscription = observable().register(STOP_EVENT, move || {
            flag.store(true, Ordering::SeqCst);
        });
        Ok(Self {
            capture,
            idx: 0,
            stopped,
            subscription: Some(subscription),
        })
    }

    pub fn frame_count(&self) -> Option<u64> {
        self.capture.frame_count()
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.capture.resolution()
    }

    pub fn fps(&self) -> Option<f64> {
        self.capture.fps()
    }
}

impl SourceStage for CaptureVideoPipe {
    type Item = FrameData;

    fn next_item(&mut self) -> Result<Option<FrameData>> {
        if self.stopped.load(Ordering::SeqCst) {
            log::info!("stop requested, ending capture after {} frames", self.idx);
            return Ok(None);
        }
        let Some(frame) = self.capture.read()? else {
            return Ok(None);
        };
        let data = FrameData::new(self.idx, format!("{:06}", self.idx), frame);
        self.idx += 1;
        Ok(Some(data))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(subscription) = self.subscription.take() {
            observable().unregister(&subscription);
        }
        self.capture.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;

    #[test]
    fn names_frames_by_sequence_index() -> Result<()> {
        let config = CaptureConfig::for_source("stub://clip?frames=3");
        let source = CaptureVideoPipe::open(&config)?;
        assert_eq!(source.frame_count(), Some(3));

        let mut pipeline = Pipeline::with_source(source);
        let names: Vec<String> = pipeline.by_ref().map(|data| data.name).collect();
        assert_eq!(names, vec!["000000", "000001", "000002"]);
        pipeline.run()?;
        pipeline.close()
    }
}
