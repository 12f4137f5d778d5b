//! Iteration metrics for processing loops.
//!
//! `Metrics` records one sample per `update()` call: the time since the
//! previous update plus the running iterations-per-second and
//! seconds-per-iteration. Samples can be exported as whitespace-separated
//! text for offline analysis.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// One sample per processed item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricsSample {
    /// Seconds since the previous update.
    pub delta: f64,
    /// Running iterations per second at the time of the update.
    pub iter_per_sec: f64,
    /// Running seconds per iteration at the time of the update.
    pub sec_per_iter: f64,
}

#[derive(Debug)]
pub struct Metrics {
    start_time: Instant,
    end_time: Instant,
    samples: Vec<MetricsSample>,
}

impl Metrics {
    /// Create metrics with the clock started.
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            end_time: now,
            samples: Vec::new(),
        }
    }

    /// Record one iteration.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.end_time).as_secs_f64();
        self.end_time = now;
        self.samples.push(MetricsSample {
            delta,
            iter_per_sec: self.iter_per_sec(),
            sec_per_iter: self.sec_per_iter(),
        });
    }

    /// Seconds between `start()` and the most recent `update()`.
    pub fn elapsed(&self) -> f64 {
        self.end_time.duration_since(self.start_time).as_secs_f64()
    }

    /// Approximate iterations per second, 0.0 before any time has elapsed.
    pub fn iter_per_sec(&self) -> f64 {
        let elapsed = self.elapsed();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.len() as f64 / elapsed
    }

    /// Approximate seconds per iteration, 0.0 before the first update.
    pub fn sec_per_iter(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.elapsed() / self.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[MetricsSample] {
        &self.samples
    }

    /// Write samples as whitespace-separated rows, one per iteration.
    ///
    /// Parent directories are created as needed. No samples produce an
    /// empty file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create metrics file {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        for sample in &self.samples {
            writeln!(
                writer,
                "{:e} {:e} {:e}",
                sample.delta, sample.iter_per_sec, sample.sec_per_iter
            )
            .context("failed to write metrics sample")?;
        }
        writer.flush().context("failed to flush metrics file")?;
        Ok(())
    }
}
