//! Four-parameter (scaled) beta distribution.
//!
//! The CDF is the regularized incomplete beta function from `statrs`; the
//! quantile inverts it with Brent's method to near machine precision.

use crate::solvers1d::brent;
use pm_core::{ensure_config, errors::Result, Real};
use statrs::function::beta::beta_reg;

const QUANTILE_ACCURACY: Real = 1e-14;

/// Beta(α, β) stretched linearly onto `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledBeta {
    alpha: Real,
    beta: Real,
    min: Real,
    max: Real,
}

impl ScaledBeta {
    /// Create the distribution, rejecting non-positive shapes or an empty
    /// support.
    pub fn new(alpha: Real, beta: Real, min: Real, max: Real) -> Result<Self> {
        ensure_config!(
            alpha > 0.0 && beta > 0.0 && alpha.is_finite() && beta.is_finite(),
            "beta shapes must be positive and finite, got alpha={alpha}, beta={beta}"
        );
        ensure_config!(min < max, "beta support requires min < max, got [{min}, {max}]");
        Ok(Self {
            alpha,
            beta,
            min,
            max,
        })
    }

    /// Quantile at probability `u ∈ (0, 1)`.
    pub fn quantile(&self, u: Real) -> Result<Real> {
        let x = if u <= 0.0 {
            0.0
        } else if u >= 1.0 {
            1.0
        } else {
            brent(
                |x| beta_reg(self.alpha, self.beta, x) - u,
                0.0,
                1.0,
                QUANTILE_ACCURACY,
            )?
        };
        Ok(self.min + (self.max - self.min) * x)
    }

    /// Cumulative distribution function on the scaled support.
    pub fn cdf(&self, x: Real) -> Real {
        if x <= self.min {
            0.0
        } else if x >= self.max {
            1.0
        } else {
            beta_reg(self.alpha, self.beta, (x - self.min) / (self.max - self.min))
        }
    }
}
