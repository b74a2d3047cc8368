//! Triangular distribution with closed-form CDF and quantile.

use pm_core::{ensure_config, errors::Result, Real};

/// Triangular distribution on `[min, max]` with peak at `mode`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangular {
    min: Real,
    mode: Real,
    max: Real,
}

impl Triangular {
    /// Create the distribution. Requires `min ≤ mode ≤ max` and `min < max`.
    pub fn new(min: Real, mode: Real, max: Real) -> Result<Self> {
        ensure_config!(
            min <= mode && mode <= max && min < max,
            "triangular requires min <= mode <= max with min < max, got ({min}, {mode}, {max})"
        );
        Ok(Self { min, mode, max })
    }

    /// Probability mass to the left of the mode.
    fn split(&self) -> Real {
        (self.mode - self.min) / (self.max - self.min)
    }

    /// Piecewise closed-form inverse CDF.
    pub fn quantile(&self, u: Real) -> Real {
        let width = self.max - self.min;
        if u < self.split() {
            self.min + (u * width * (self.mode - self.min)).sqrt()
        } else {
            self.max - ((1.0 - u) * width * (self.max - self.mode)).sqrt()
        }
    }

    /// Cumulative distribution function.
    pub fn cdf(&self, x: Real) -> Real {
        let width = self.max - self.min;
        if x <= self.min {
            0.0
        } else if x >= self.max {
            1.0
        } else if x <= self.mode {
            (x - self.min).powi(2) / (width * (self.mode - self.min))
        } else {
            1.0 - (self.max - x).powi(2) / (width * (self.max - self.mode))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quantile_at_split_is_mode() {
        let t = Triangular::new(0.18, 0.20, 0.35).unwrap();
        let split = (0.20 - 0.18) / (0.35 - 0.18);
        assert_abs_diff_eq!(t.quantile(split), 0.20, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_left_edge() {
        let t = Triangular::new(0.0, 0.0, 1.0).unwrap();
        assert_abs_diff_eq!(t.quantile(0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.quantile(0.75), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(t.cdf(0.5), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn cdf_inverts_quantile() {
        let t = Triangular::new(0.60, 0.75, 0.90).unwrap();
        for u in [0.01, 0.2, 0.5, 0.8, 0.99] {
            assert_abs_diff_eq!(t.cdf(t.quantile(u)), u, epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_mode_outside_support() {
        assert!(Triangular::new(0.0, 2.0, 1.0).is_err());
        assert!(Triangular::new(1.0, 1.0, 1.0).is_err());
    }
}
