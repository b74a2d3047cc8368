//! Mean-reverting yearly paths.
//!
//! A sampled base value expands into a year-by-year AR(1) path:
//!
//! ```text
//! value[0] = seed
//! value[t] = clip(mean + φ · (value[t-1] − mean) + ε[t]),   ε[t] ~ N(0, σ²)
//! ```
//!
//! The recursion is sequential by construction: each year needs the one
//! before it.

use crate::settings::SeriesParameters;
use pm_core::{errors::Result, Real, Size};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Serialize;

/// One stochastic driver over the projection horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    values: Vec<Real>,
}

impl TimeSeries {
    /// A path with the same value every year.
    pub fn constant(value: Real, years: Size) -> Self {
        Self {
            values: vec![value; years],
        }
    }

    /// Yearly values, year 1 first.
    pub fn values(&self) -> &[Real] {
        &self.values
    }

    /// Number of years.
    pub fn len(&self) -> Size {
        self.values.len()
    }

    /// `true` for an empty path.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The inflation and appreciation paths of one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPair {
    /// Yearly inflation rates.
    pub inflation: TimeSeries,
    /// Yearly property appreciation rates.
    pub appreciation: TimeSeries,
}

/// Generate a mean-reverting path of `years` values.
///
/// One standard normal is drawn per year after the first, even when the
/// innovation standard deviation is zero, so the number of draws depends
/// only on `years`.
pub fn generate_series<R: Rng + ?Sized>(
    seed_value: Real,
    mean: Real,
    params: &SeriesParameters,
    years: Size,
    rng: &mut R,
) -> Result<TimeSeries> {
    params.validate("time series")?;
    let (lo, hi) = params.bounds;
    let mut values = Vec::with_capacity(years);
    if years == 0 {
        return Ok(TimeSeries { values });
    }
    values.push(seed_value);
    let mut previous = seed_value;
    for _ in 1..years {
        let z: Real = rng.sample(StandardNormal);
        let next = mean + params.mean_reversion * (previous - mean) + params.innovation_std * z;
        previous = next.clamp(lo, hi);
        values.push(previous);
    }
    Ok(TimeSeries { values })
}
