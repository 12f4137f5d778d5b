//! Terminal progress reporting.
//!
//! Draws to stderr so interleaved `log` output stays readable. When the
//! total number of items is known a bar with position and rate is shown,
//! otherwise a spinner with an item counter.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a progress display. `total` enables a bounded bar.
    pub fn new(total: Option<u64>) -> Self {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                let style = ProgressStyle::with_template(
                    "{bar:40} {pos}/{len} [{elapsed_precise}, {per_sec}]",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar());
                bar.set_style(style);
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                let style =
                    ProgressStyle::with_template("{spinner} {pos} [{elapsed_precise}, {per_sec}]")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner());
                bar.set_style(style);
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };
        bar.set_draw_target(ProgressDrawTarget::stderr());
        Self { bar }
    }

    /// Create a disabled progress display (draws nothing).
    pub fn hidden() -> Self {
        let bar = ProgressBar::hidden();
        Self { bar }
    }

    pub fn update(&self, n: u64) {
        self.bar.inc(n);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish drawing, leaving the final state on screen.
    pub fn close(&self) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_progress_counts_updates() {
        let progress = Progress::hidden();
        progress.update(1);
        progress.update(2);
        assert_eq!(progress.position(), 3);
        progress.close();
    }

    #[test]
    fn bounded_progress_tracks_position() {
        let progress = Progress::new(Some(10));
        progress.update(4);
        assert_eq!(progress.position(), 4);
        progress.close();
    }
}
