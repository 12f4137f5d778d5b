//! Progress-reporting pipeline stage.

use anyhow::Result;

use crate::progress::Progress;

use super::MapStage;

/// Advances a [`Progress`] display by one per item.
pub struct ProgressPipe {
    progress: Progress,
}

impl ProgressPipe {
    /// Bounded bar when `total` is known, spinner otherwise.
    pub fn new(total: Option<u64>) -> Self {
        Self {
            progress: Progress::new(total),
        }
    }

    pub fn with_progress(progress: Progress) -> Self {
        Self { progress }
    }
}

impl<T> MapStage<T> for ProgressPipe {
    fn apply(&mut self, item: T) -> Result<T> {
        self.progress.update(1);
        Ok(item)
    }

    fn close(&mut self) -> Result<()> {
        self.progress.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;

    #[test]
    fn counts_every_item() -> Result<()> {
        let mut pipeline =
            Pipeline::new(0..7u32).map(ProgressPipe::with_progress(Progress::hidden()));
        pipeline.run()?;
        pipeline.close()
    }
}
