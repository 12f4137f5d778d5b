//! Image-saving pipeline stage.

use anyhow::Result;

use crate::frame::FrameData;
use crate::save_image::SaveImage;

use super::MapStage;

/// Writes each item's frame to disk under the item's name, then passes
/// the item through unchanged.
pub struct SaveImagePipe {
    save: SaveImage,
}

impl SaveImagePipe {
    pub fn new(save: SaveImage) -> Self {
        Self { save }
    }
}

impl MapStage<FrameData> for SaveImagePipe {
    fn apply(&mut self, item: FrameData) -> Result<FrameData> {
        self.save.save(&item.frame, &item.name)?;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::pipeline::Pipeline;
    use crate::save_image::ImageFormat;

    #[test]
    fn writes_every_item_under_its_name() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let frames = (0..3).map(|idx| {
            let frame = Frame::new(vec![idx as u8; 2 * 2 * 3], 2, 2).expect("valid frame");
            FrameData::new(idx, format!("{idx:06}"), frame)
        });

        let mut pipeline = Pipeline::new(frames)
            .map(SaveImagePipe::new(SaveImage::new(dir.path(), ImageFormat::Png)));
        pipeline.run()?;
        pipeline.close()?;

        for idx in 0..3 {
            assert!(dir.path().join(format!("{idx:06}.png")).is_file());
        }
        Ok(())
    }
}
