//! Pipeline source over [`ImageCapture`].

use anyhow::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::image_dir::{ImageCapture, DEFAULT_IMAGE_EXTS};
use crate::frame::FrameData;
use crate::observable::{observable, SubscriptionId, STOP_EVENT};

use super::SourceStage;

/// Emits one [`FrameData`] per image file. Item names are the file paths
/// relative to the capture root, without extension, so save stages can
/// mirror the input directory layout.
pub struct CaptureImagePipe {
    capture: ImageCapture,
    total: u64,
    idx: usize,
    stopped: Arc<AtomicBool>,
    subscription: Option<SubscriptionId>,
}

impl CaptureImagePipe {
    pub fn open(
        path: &Path,
        valid_exts: &[&str],
        contains: Option<&str>,
        level: Option<usize>,
    ) -> Result<Self> {
        let capture = ImageCapture::new(path, valid_exts, contains, level)?;
        let total = capture.remaining() as u64;
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        let subscription = observable().register(STOP_EVENT, move || {
            flag.store(true, Ordering::SeqCst);
        });
        Ok(Self {
            capture,
            total,
            idx: 0,
            stopped,
            subscription: Some(subscription),
        })
    }

    pub fn open_with_defaults(path: &Path) -> Result<Self> {
        Self::open(path, DEFAULT_IMAGE_EXTS, None, None)
    }

    /// Number of images found at construction.
    pub fn total(&self) -> u64 {
        self.total
    }

    fn item_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(self.capture.root()).unwrap_or(path);
        let name = relative.with_extension("");
        match name.file_name() {
            Some(_) => name.to_string_lossy().into_owned(),
            // Root was the file itself; fall back to its stem.
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{:06}", self.idx)),
        }
    }
}

impl SourceStage for CaptureImagePipe {
    type Item = FrameData;

    fn next_item(&mut self) -> Result<Option<FrameData>> {
        if self.stopped.load(Ordering::SeqCst) {
            log::info!("stop requested, ending capture after {} images", self.idx);
            return Ok(None);
        }
        let Some((path, frame)) = self.capture.read()? else {
            return Ok(None);
        };
        let name = self.item_name(&path);
        let data = FrameData::new(self.idx, name, frame).with_source_path(path);
        self.idx += 1;
        Ok(Some(data))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(subscription) = self.subscription.take() {
            observable().unregister(&subscription);
        }
        Ok(())
    }
}
