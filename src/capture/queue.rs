//! Bounded frame queue and the producer thread that fills it.
//!
//! `ThreadedSource` decouples I/O-bound frame acquisition from downstream
//! processing: a background thread keeps reading from the wrapped source
//! and pushes into a fixed-capacity FIFO. Backpressure on a full queue is
//! polling with a short sleep (no blocking wait), and end-of-stream is a
//! terminal `None` pushed after the last frame.

use anyhow::{anyhow, Context, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::frame::Frame;

use super::FrameSource;

/// Sleep between polls when the queue is full (producer) or empty
/// (consumer).
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Fixed-capacity FIFO shared between one producer and one consumer.
pub struct BoundedFrameQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> BoundedFrameQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Push an item, or hand it back when the queue is full.
    pub fn try_push(&self, item: T) -> std::result::Result<(), T> {
        let mut items = self.items.lock().expect("frame queue lock poisoned");
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        Ok(())
    }

    /// Pop the oldest item, if any.
    pub fn pop(&self) -> Option<T> {
        self.items
            .lock()
            .expect("frame queue lock poisoned")
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("frame queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Wraps an opened [`FrameSource`] with a capture thread and a bounded
/// queue of decoded frames.
///
/// The producer thread owns the source while running and hands it back on
/// join, so `close()` can release source resources only after the thread
/// has stopped touching them.
pub struct ThreadedSource {
    queue: Arc<BoundedFrameQueue<Option<Frame>>>,
    stopped: Arc<AtomicBool>,
    producer_done: Arc<AtomicBool>,
    handle: Option<JoinHandle<Box<dyn FrameSource + Send>>>,
    finished: bool,
    frame_count: Option<u64>,
    resolution: Option<(u32, u32)>,
    fps: Option<f64>,
}

impl ThreadedSource {
    /// Start the capture thread over an already-opened source.
    pub fn spawn(mut source: Box<dyn FrameSource + Send>, queue_size: usize) -> Result<Self> {
        let frame_count = source.frame_count();
        let resolution = source.resolution();
        let fps = source.fps();

        let queue = Arc::new(BoundedFrameQueue::new(queue_size));
        let stopped = Arc::new(AtomicBool::new(false));
        let producer_done = Arc::new(AtomicBool::new(false));

        let producer_queue = queue.clone();
        let producer_stopped = stopped.clone();
        let producer_flag = producer_done.clone();
        let handle = std::thread::Builder::new()
            .name("frameflow-capture".to_string())
            .spawn(move || {
                capture_loop(&mut source, &producer_queue, &producer_stopped);
                producer_flag.store(true, Ordering::Release);
                source
            })
            .context("failed to spawn capture thread")?;

        Ok(Self {
            queue,
            stopped,
            producer_done,
            handle: Some(handle),
            finished: false,
            frame_count,
            resolution,
            fps,
        })
    }

    /// Next frame in FIFO order, `None` once the source is exhausted.
    ///
    /// Polls the queue with a short sleep while it is empty.
    pub fn read(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            if let Some(item) = self.queue.pop() {
                if item.is_none() {
                    self.finished = true;
                }
                return Ok(item);
            }
            // Producer exited without a sentinel (stop requested mid-read).
            if self.producer_done.load(Ordering::Acquire) {
                self.finished = true;
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Frames currently buffered ahead of the consumer.
    pub fn buffered(&self) -> usize {
        self.queue.len()
    }

    pub fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    /// Stop the capture thread, join it, then close the source.
    pub fn close(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let mut source = handle
                .join()
                .map_err(|_| anyhow!("capture thread panicked"))?;
            source.close()?;
        }
        Ok(())
    }
}

impl Drop for ThreadedSource {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(err) = self.close() {
                log::warn!("failed to close capture source: {err:#}");
            }
        }
    }
}

fn capture_loop(
    source: &mut Box<dyn FrameSource + Send>,
    queue: &BoundedFrameQueue<Option<Frame>>,
    stopped: &AtomicBool,
) {
    while !stopped.load(Ordering::Acquire) {
        let item = match source.read() {
            Ok(item) => item,
            Err(err) => {
                log::error!("frame capture failed: {err:#}");
                None
            }
        };
        let end_of_stream = item.is_none();

        // Poll until there is room; a full queue means the consumer is
        // behind, so yield the CPU instead of spinning.
        let mut pending = item;
        loop {
            match queue.try_push(pending) {
                Ok(()) => break,
                Err(returned) => {
                    if stopped.load(Ordering::Acquire) {
                        return;
                    }
                    pending = returned;
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }

        if end_of_stream {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Finite source yielding numbered single-pixel frames.
    struct CountingSource {
        produced: u32,
        total: u32,
        closed: Arc<AtomicBool>,
    }

    impl FrameSource for CountingSource {
        fn open(&mut self) -> Result<()> {
            Ok(())
        }

        fn read(&mut self) -> Result<Option<Frame>> {
            if self.produced >= self.total {
                return Ok(None);
            }
            let value = (self.produced % 256) as u8;
            self.produced += 1;
            Ok(Some(Frame::new(vec![value, value, value], 1, 1)?))
        }

        fn frame_count(&self) -> Option<u64> {
            Some(u64::from(self.total))
        }

        fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn queue_is_fifo_and_bounded() {
        let queue = BoundedFrameQueue::new(2);
        assert!(queue.try_push(1).is_ok());
        assert!(queue.try_push(2).is_ok());
        assert!(queue.is_full());
        assert_eq!(queue.try_push(3), Err(3));
        assert_eq!(queue.pop(), Some(1));
        assert!(queue.try_push(3).is_ok());
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn queue_capacity_is_at_least_one() {
        let queue: BoundedFrameQueue<u8> = BoundedFrameQueue::new(0);
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn threaded_source_preserves_order_and_terminates() -> Result<()> {
        let closed = Arc::new(AtomicBool::new(false));
        let source = CountingSource {
            produced: 0,
            total: 50,
            closed: closed.clone(),
        };
        // Capacity far below the frame count forces producer backpressure.
        let mut threaded = ThreadedSource::spawn(Box::new(source), 4)?;
        assert_eq!(threaded.frame_count(), Some(50));

        let mut seen = 0u32;
        while let Some(frame) = threaded.read()? {
            assert_eq!(frame.pixels()[0], (seen % 256) as u8);
            seen += 1;
        }
        assert_eq!(seen, 50);

        // Reads after end-of-stream stay at None without blocking.
        assert!(threaded.read()?.is_none());

        threaded.close()?;
        assert!(closed.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn close_joins_producer_before_releasing_source() -> Result<()> {
        let closed = Arc::new(AtomicBool::new(false));
        let source = CountingSource {
            produced: 0,
            total: 1_000_000,
            closed: closed.clone(),
        };
        let mut threaded = ThreadedSource::spawn(Box::new(source), 2)?;
        let _ = threaded.read()?;

        threaded.close()?;
        assert!(closed.load(Ordering::SeqCst));
        Ok(())
    }
}
