//! Video-encoding pipeline stage.

use anyhow::Result;

use crate::frame::FrameData;
use crate::save_video::SaveVideo;

use super::MapStage;

/// Appends each item's frame to a video file. `close` finalizes the
/// container, so it must run before the process exits for the output to
/// be playable.
pub struct SaveVideoPipe {
    save: SaveVideo,
}

impl SaveVideoPipe {
    pub fn new(save: SaveVideo) -> Self {
        Self { save }
    }
}

impl MapStage<FrameData> for SaveVideoPipe {
    fn apply(&mut self, item: FrameData) -> Result<FrameData> {
        self.save.save(&item.frame)?;
        Ok(item)
    }

    fn close(&mut self) -> Result<()> {
        self.save.close()
    }
}
