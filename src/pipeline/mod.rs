//! Lazy frame-processing pipelines.
//!
//! A [`Pipeline`] chains a source with map/filter stages into one lazy
//! iterator. Nothing is pulled from the source until the pipeline is
//! iterated or [`Pipeline::run`] drains it. Stages can own resources
//! (encoders, file handles); [`Pipeline::close`] releases them in reverse
//! registration order, so downstream sinks flush before their upstream
//! sources are torn down.
//!
//! Stage errors terminate the stream at the failing item and are reported
//! by `run()` (or [`Pipeline::take_error`] when iterating manually).

use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

pub mod capture_image;
pub mod capture_video;
pub mod metrics;
pub mod progress;
pub mod save_image;
pub mod save_video;

pub use capture_image::CaptureImagePipe;
pub use capture_video::CaptureVideoPipe;
pub use metrics::MetricsPipe;
pub use progress::ProgressPipe;
pub use save_image::SaveImagePipe;
pub use save_video::SaveVideoPipe;

/// Produces pipeline items until exhausted.
pub trait SourceStage {
    type Item;

    /// Next item, `Ok(None)` once the source is done.
    fn next_item(&mut self) -> Result<Option<Self::Item>>;

    /// Release resources. Called once by [`Pipeline::close`].
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Per-item transformation (or side effect) applied by [`Pipeline::map`].
pub trait MapStage<T> {
    fn apply(&mut self, item: T) -> Result<T>;

    /// Release resources. Called once by [`Pipeline::close`].
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T, F> MapStage<T> for F
where
    F: FnMut(T) -> Result<T>,
{
    fn apply(&mut self, item: T) -> Result<T> {
        self(item)
    }
}

/// Per-item predicate applied by [`Pipeline::filter`].
pub trait FilterStage<T> {
    fn keep(&mut self, item: &T) -> Result<bool>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T, F> FilterStage<T> for F
where
    F: FnMut(&T) -> Result<bool>,
{
    fn keep(&mut self, item: &T) -> Result<bool> {
        self(item)
    }
}

type SharedError = Rc<RefCell<Option<anyhow::Error>>>;
type Closer = Box<dyn FnMut() -> Result<()>>;

/// A lazy sequence of items with attached stage lifecycle.
pub struct Pipeline<T> {
    iter: Box<dyn Iterator<Item = T>>,
    closers: Vec<Closer>,
    error: SharedError,
}

impl<T: 'static> Pipeline<T> {
    /// Build a pipeline over a plain iterator (no lifecycle to manage).
    pub fn new(source: impl Iterator<Item = T> + 'static) -> Self {
        Self {
            iter: Box::new(source),
            closers: Vec::new(),
            error: SharedError::default(),
        }
    }

    /// Build a pipeline over a [`SourceStage`], registering its `close`.
    pub fn with_source<S>(source: S) -> Self
    where
        S: SourceStage<Item = T> + 'static,
    {
        let source = Rc::new(RefCell::new(source));
        let error = SharedError::default();

        let iter_source = Rc::clone(&source);
        let iter_error = Rc::clone(&error);
        let iter = std::iter::from_fn(move || match iter_source.borrow_mut().next_item() {
            Ok(item) => item,
            Err(err) => {
                *iter_error.borrow_mut() = Some(err);
                None
            }
        });

        Self {
            iter: Box::new(iter),
            closers: vec![Box::new(move || source.borrow_mut().close())],
            error,
        }
    }

    /// Append a map stage. Items flow through `stage.apply` in order.
    pub fn map<S>(self, stage: S) -> Self
    where
        S: MapStage<T> + 'static,
    {
        let Self {
            iter,
            mut closers,
            error,
        } = self;

        let stage = Rc::new(RefCell::new(stage));
        let map_stage = Rc::clone(&stage);
        let map_error = Rc::clone(&error);
        let iter = iter.map_while(move |item| match map_stage.borrow_mut().apply(item) {
            Ok(item) => Some(item),
            Err(err) => {
                *map_error.borrow_mut() = Some(err);
                None
            }
        });
        closers.push(Box::new(move || stage.borrow_mut().close()));

        Self {
            iter: Box::new(iter),
            closers,
            error,
        }
    }

    /// Append a filter stage. Items failing the predicate are dropped.
    pub fn filter<S>(self, stage: S) -> Self
    where
        S: FilterStage<T> + 'static,
    {
        let Self {
            iter,
            mut closers,
            error,
        } = self;

        let stage = Rc::new(RefCell::new(stage));
        let filter_stage = Rc::clone(&stage);
        let filter_error = Rc::clone(&error);
        let iter = iter
            .map_while(move |item| match filter_stage.borrow_mut().keep(&item) {
                Ok(true) => Some(Some(item)),
                Ok(false) => Some(None),
                Err(err) => {
                    *filter_error.borrow_mut() = Some(err);
                    None
                }
            })
            .flatten();
        closers.push(Box::new(move || stage.borrow_mut().close()));

        Self {
            iter: Box::new(iter),
            closers,
            error,
        }
    }

    /// Replace the item stream wholesale. The builder receives the current
    /// iterator and returns a new one, which may change the item type;
    /// registered closers carry over.
    pub fn compose<U, F, I>(self, build: F) -> Pipeline<U>
    where
        F: FnOnce(Box<dyn Iterator<Item = T>>) -> I,
        I: Iterator<Item = U> + 'static,
        U: 'static,
    {
        let Self {
            iter,
            closers,
            error,
        } = self;
        Pipeline {
            iter: Box::new(build(iter)),
            closers,
            error,
        }
    }

    /// Drain the pipeline, returning the first stage error if one occurred.
    pub fn run(&mut self) -> Result<()> {
        for _ in &mut self.iter {}
        match self.error.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The stage error that terminated the stream, if any. Useful when the
    /// pipeline is consumed through the `Iterator` impl instead of `run`.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.borrow_mut().take()
    }

    /// Close every registered stage, most recently added first.
    ///
    /// All closers run even if one fails; the first failure is returned.
    pub fn close(&mut self) -> Result<()> {
        let mut first_error = None;
        for closer in self.closers.iter_mut().rev() {
            if let Err(err) = closer() {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    log::warn!("pipeline stage close failed: {err:#}");
                }
            }
        }
        self.closers.clear();
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<T: 'static> Iterator for Pipeline<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.iter.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct NumberSource {
        next: u32,
        limit: u32,
        closed: Rc<RefCell<Vec<&'static str>>>,
    }

    impl SourceStage for NumberSource {
        type Item = u32;

        fn next_item(&mut self) -> Result<Option<u32>> {
            if self.next >= self.limit {
                return Ok(None);
            }
            self.next += 1;
            Ok(Some(self.next))
        }

        fn close(&mut self) -> Result<()> {
            self.closed.borrow_mut().push("source");
            Ok(())
        }
    }

    struct RecordingStage {
        label: &'static str,
        closed: Rc<RefCell<Vec<&'static str>>>,
    }

    impl MapStage<u32> for RecordingStage {
        fn apply(&mut self, item: u32) -> Result<u32> {
            Ok(item)
        }

        fn close(&mut self) -> Result<()> {
            self.closed.borrow_mut().push(self.label);
            Ok(())
        }
    }

    #[test]
    fn map_and_filter_apply_in_order() -> Result<()> {
        let mut pipeline = Pipeline::new(1..=6u32)
            .map(|n: u32| Ok(n * 10))
            .filter(|n: &u32| Ok(n % 20 == 0));

        let items: Vec<u32> = pipeline.by_ref().collect();
        assert_eq!(items, vec![20, 40, 60]);
        pipeline.run()?;
        pipeline.close()
    }

    #[test]
    fn compose_can_change_the_item_type() -> Result<()> {
        let mut pipeline = Pipeline::new(1..=3u32)
            .compose(|items| items.map(|n| format!("item-{n}")));

        let items: Vec<String> = pipeline.by_ref().collect();
        assert_eq!(items, vec!["item-1", "item-2", "item-3"]);
        pipeline.close()
    }

    #[test]
    fn close_runs_stages_in_reverse_registration_order() -> Result<()> {
        let closed = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::with_source(NumberSource {
            next: 0,
            limit: 3,
            closed: closed.clone(),
        })
        .map(RecordingStage {
            label: "first",
            closed: closed.clone(),
        })
        .map(RecordingStage {
            label: "second",
            closed: closed.clone(),
        });

        pipeline.run()?;
        pipeline.close()?;
        assert_eq!(*closed.borrow(), vec!["second", "first", "source"]);
        Ok(())
    }

    #[test]
    fn stage_error_stops_the_stream_and_surfaces_from_run() {
        let mut pipeline = Pipeline::new(1..=10u32).map(|n: u32| {
            if n == 4 {
                Err(anyhow!("bad item {n}"))
            } else {
                Ok(n)
            }
        });

        let seen: Vec<u32> = pipeline.by_ref().collect();
        assert_eq!(seen, vec![1, 2, 3]);

        let err = pipeline.run().expect_err("error must surface");
        assert!(err.to_string().contains("bad item 4"));
    }

    #[test]
    fn filter_error_surfaces_from_run() {
        let mut pipeline = Pipeline::new(1..=10u32)
            .filter(|n: &u32| if *n == 2 { Err(anyhow!("boom")) } else { Ok(true) });

        let seen: Vec<u32> = pipeline.by_ref().collect();
        assert_eq!(seen, vec![1]);
        assert!(pipeline.run().is_err());
    }

    #[test]
    fn run_on_fresh_pipeline_reports_source_error() {
        struct FailingSource;

        impl SourceStage for FailingSource {
            type Item = u32;

            fn next_item(&mut self) -> Result<Option<u32>> {
                Err(anyhow!("source broke"))
            }
        }

        let mut pipeline = Pipeline::with_source(FailingSource);
        let err = pipeline.run().expect_err("source error must surface");
        assert!(err.to_string().contains("source broke"));
    }
}
