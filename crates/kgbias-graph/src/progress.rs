//! Periodic progress records for long batch loops (scoring, iteration).
//!
//! `tick` is safe to call from rayon workers; the counter is atomic and the
//! record is emitted by whichever worker crosses the boundary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Progress {
    label: String,
    total: usize,
    every: usize,
    done: AtomicUsize,
    start: Instant,
}

impl Progress {
    /// `every == 0` disables the periodic record.
    pub fn new(label: impl Into<String>, total: usize, every: usize) -> Self {
        Self {
            label: label.into(),
            total,
            every,
            done: AtomicUsize::new(0),
            start: Instant::now(),
        }
    }

    pub fn tick(&self) -> usize {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.every > 0 && done % self.every == 0 {
            let elapsed = self.start.elapsed();
            let eta = estimate_remaining(elapsed, done, self.total);
            tracing::info!(
                task = %self.label,
                processed = done,
                total = self.total,
                elapsed_s = %format!("{:.1}", elapsed.as_secs_f64()),
                eta_s = %format!("{:.1}", eta.as_secs_f64()),
                "progress"
            );
        }
        done
    }

    pub fn processed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Linear extrapolation: average time per item so far, times items left.
pub fn estimate_remaining(elapsed: Duration, done: usize, total: usize) -> Duration {
    if done == 0 || done >= total {
        return Duration::ZERO;
    }
    elapsed.mul_f64((total - done) as f64 / done as f64)
}
