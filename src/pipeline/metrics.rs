//! Metrics-recording pipeline stage.

use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

use crate::metrics::Metrics;

use super::MapStage;

/// Records one [`Metrics`] sample per item. The shared handle stays valid
/// after the stage is moved into a pipeline, so callers can report totals
/// or save samples once the run finishes.
pub struct MetricsPipe {
    metrics: Rc<RefCell<Metrics>>,
}

impl MetricsPipe {
    pub fn new() -> Self {
        Self {
            metrics: Rc::new(RefCell::new(Metrics::start())),
        }
    }

    pub fn handle(&self) -> Rc<RefCell<Metrics>> {
        Rc::clone(&self.metrics)
    }
}

impl Default for MetricsPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MapStage<T> for MetricsPipe {
    fn apply(&mut self, item: T) -> Result<T> {
        self.metrics.borrow_mut().update();
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;

    #[test]
    fn handle_reports_samples_after_the_run() -> Result<()> {
        let stage = MetricsPipe::new();
        let metrics = stage.handle();

        let mut pipeline = Pipeline::new(0..5u32).map(stage);
        pipeline.run()?;
        pipeline.close()?;

        assert_eq!(metrics.borrow().len(), 5);
        Ok(())
    }
}
