//! Elapsed time and ETA for a fixed number of repeated runs
//!
//! ```
//! use quatstat::progress::Progress;
//!
//! let mut progress = Progress::new(10);
//! progress.start();
//! for batch in 1..=10 {
//!     // ... one batch of work ...
//!     let sample = progress.sample();
//!     assert_eq!(sample.iteration, batch);
//! }
//! ```

use std::time::{Duration, Instant};

use tracing::info;

/// Timing snapshot taken after an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    /// Iterations completed since `start`
    pub iteration: usize,
    pub num_iterations: usize,
    pub elapsed: Duration,
    /// Average duration of one iteration so far
    pub time_per_iteration: Duration,
    /// Projected duration of all `num_iterations`
    pub estimated_total: Duration,
}

impl ProgressSample {
    /// Projected time still to go
    pub fn remaining(&self) -> Duration {
        self.estimated_total.saturating_sub(self.elapsed)
    }
}

#[derive(Debug, Clone)]
pub struct Progress {
    num_iterations: usize,
    iteration: usize,
    started_at: Option<Instant>,
}

impl Progress {
    pub fn new(num_iterations: usize) -> Self {
        Self {
            num_iterations,
            iteration: 0,
            started_at: None,
        }
    }

    /// Reset the iteration count and start the clock
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Record one finished iteration and report timing
    ///
    /// Called before [`start`](Self::start), this starts the clock and
    /// returns an empty sample for iteration 0.
    pub fn sample(&mut self) -> ProgressSample {
        self.sample_at(Instant::now())
    }

    fn start_at(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.iteration = 0;
    }

    fn sample_at(&mut self, now: Instant) -> ProgressSample {
        let Some(started_at) = self.started_at else {
            self.start_at(now);
            return ProgressSample {
                iteration: 0,
                num_iterations: self.num_iterations,
                elapsed: Duration::ZERO,
                time_per_iteration: Duration::ZERO,
                estimated_total: Duration::ZERO,
            };
        };

        self.iteration += 1;
        let elapsed = now.saturating_duration_since(started_at);
        let time_per_iteration = elapsed.div_f64(self.iteration as f64);
        let estimated_total = time_per_iteration.mul_f64(self.num_iterations as f64);

        info!(
            iteration = self.iteration,
            num_iterations = self.num_iterations,
            "progress {} / {}, time {:.3?} / {:.3?} ({:.3?} per iteration)",
            self.iteration,
            self.num_iterations,
            elapsed,
            estimated_total,
            time_per_iteration
        );

        ProgressSample {
            iteration: self.iteration,
            num_iterations: self.num_iterations,
            elapsed,
            time_per_iteration,
            estimated_total,
        }
    }
}
