//! Running-mean convergence monitor.
//!
//! Every `interval` completed trials (5 % of the run, at least 500) the
//! monitor records the running mean NPV, starting once 1 000 trials are
//! in. When the coefficient of variation of the last three checkpoint
//! means drops below 1 %, it reports the trial count at which that first
//! happened. The signal is informational: the run always completes.

use pm_core::{Real, Size};
use pm_math::Statistics;
use serde::Serialize;
use tracing::info;

const MIN_INTERVAL: Size = 500;
const MIN_COMPLETED: Size = 1_000;
const WINDOW: usize = 3;
const CV_THRESHOLD: Real = 0.01;

/// The running mean NPV after a number of completed trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Checkpoint {
    /// Trials completed.
    pub completed: Size,
    /// Mean NPV over those trials.
    pub mean_npv: Real,
    /// Sample standard deviation of NPV over those trials.
    pub std_dev: Option<Real>,
}

/// Checkpoint history of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceReport {
    /// Trials between checkpoints.
    pub interval: Size,
    /// Recorded checkpoints, in order.
    pub checkpoints: Vec<Checkpoint>,
    /// Trials completed when the running mean first stabilised.
    pub converged_at: Option<Size>,
}

impl ConvergenceReport {
    /// `true` when the running mean stabilised.
    pub fn converged(&self) -> bool {
        self.converged_at.is_some()
    }
}

/// Accumulates NPVs in completion order.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    interval: Size,
    stats: Statistics,
    checkpoints: Vec<Checkpoint>,
    converged_at: Option<Size>,
}

impl ConvergenceMonitor {
    /// A monitor for a run of `n` trials.
    pub fn new(n: Size) -> Self {
        Self {
            interval: (n / 20).max(MIN_INTERVAL),
            stats: Statistics::new(),
            checkpoints: Vec::new(),
            converged_at: None,
        }
    }

    /// Trials between checkpoints.
    pub fn interval(&self) -> Size {
        self.interval
    }

    /// Record one completed trial's NPV.
    pub fn observe(&mut self, npv: Real) {
        self.stats.add(npv);
        let completed = self.stats.samples();
        if completed < MIN_COMPLETED || completed % self.interval != 0 {
            return;
        }
        let Some(mean_npv) = self.stats.mean() else {
            return;
        };
        self.checkpoints.push(Checkpoint {
            completed,
            mean_npv,
            std_dev: self.stats.std_dev(),
        });

        if self.converged_at.is_none() && self.window_is_stable() {
            self.converged_at = Some(completed);
            info!(completed, mean_npv, "running mean NPV converged");
        }
    }

    fn window_is_stable(&self) -> bool {
        let Some(start) = self.checkpoints.len().checked_sub(WINDOW) else {
            return false;
        };
        let window: Statistics = self.checkpoints[start..].iter().map(|c| c.mean_npv).collect();
        let (Some(mean), Some(variance)) = (window.mean(), window.variance()) else {
            return false;
        };
        // population dispersion of the window
        let spread = (variance * (WINDOW as Real - 1.0) / WINDOW as Real).sqrt();
        spread / (mean.abs() + 1e-6) < CV_THRESHOLD
    }

    /// The checkpoint history.
    pub fn finish(self) -> ConvergenceReport {
        ConvergenceReport {
            interval: self.interval,
            checkpoints: self.checkpoints,
            converged_at: self.converged_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn interval_is_five_percent_with_floor() {
        assert_eq!(ConvergenceMonitor::new(1_000).interval(), 500);
        assert_eq!(ConvergenceMonitor::new(10_000).interval(), 500);
        assert_eq!(ConvergenceMonitor::new(40_000).interval(), 2_000);
    }

    #[test]
    fn no_checkpoint_before_a_thousand_trials() {
        let mut m = ConvergenceMonitor::new(10_000);
        for _ in 0..999 {
            m.observe(1.0);
        }
        assert!(m.finish().checkpoints.is_empty());
    }

    #[test]
    fn constant_stream_converges_at_third_checkpoint() {
        let mut m = ConvergenceMonitor::new(10_000);
        for _ in 0..3_000 {
            m.observe(50_000.0);
        }
        let report = m.finish();
        let completed: Vec<Size> = report.checkpoints.iter().map(|c| c.completed).collect();
        assert_eq!(completed, vec![1_000, 1_500, 2_000, 2_500, 3_000]);
        assert_eq!(report.converged_at, Some(2_000));
        assert_abs_diff_eq!(report.checkpoints[0].mean_npv, 50_000.0, epsilon = 1e-9);
    }

    #[test]
    fn drifting_stream_does_not_converge() {
        let mut m = ConvergenceMonitor::new(10_000);
        for i in 0..3_000 {
            m.observe(i as Real * 100.0);
        }
        let report = m.finish();
        assert_eq!(report.checkpoints.len(), 5);
        assert!(!report.converged());
    }
}
