//! Statistics accumulators and order statistics.

use pm_core::Real;

/// Incremental statistics accumulator.
///
/// Uses Welford's update, so the variance stays accurate for large samples
/// with a large mean (NPVs in the hundreds of thousands, say).
#[derive(Debug, Clone)]
pub struct Statistics {
    count: usize,
    mean: Real,
    m2: Real,
    min: Real,
    max: Real,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    /// Create a new empty accumulator.
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: Real::INFINITY,
            max: Real::NEG_INFINITY,
        }
    }

    /// Add a single sample.
    pub fn add(&mut self, x: Real) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as Real;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    /// Number of samples.
    pub fn samples(&self) -> usize {
        self.count
    }

    /// Mean. Returns `None` if no samples have been added.
    pub fn mean(&self) -> Option<Real> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample variance (Bessel-corrected). Returns `None` for fewer than
    /// 2 samples.
    pub fn variance(&self) -> Option<Real> {
        (self.count >= 2).then(|| self.m2 / (self.count as Real - 1.0))
    }

    /// Standard deviation. Returns `None` for fewer than 2 samples.
    pub fn std_dev(&self) -> Option<Real> {
        self.variance().map(Real::sqrt)
    }

    /// Minimum sample value. Returns `None` if no samples have been added.
    pub fn minimum(&self) -> Option<Real> {
        (self.count > 0).then_some(self.min)
    }

    /// Maximum sample value. Returns `None` if no samples have been added.
    pub fn maximum(&self) -> Option<Real> {
        (self.count > 0).then_some(self.max)
    }
}

impl Extend<Real> for Statistics {
    fn extend<I: IntoIterator<Item = Real>>(&mut self, iter: I) {
        for x in iter {
            self.add(x);
        }
    }
}

impl FromIterator<Real> for Statistics {
    fn from_iter<I: IntoIterator<Item = Real>>(iter: I) -> Self {
        let mut s = Self::new();
        s.extend(iter);
        s
    }
}

/// The `p`-th percentile (`p ∈ [0, 100]`) of an ascending slice.
///
/// Linear interpolation between closest ranks: position `(n - 1) p / 100`.
/// Returns `None` for an empty slice.
pub fn percentile(sorted: &[Real], p: Real) -> Option<Real> {
    let last = sorted.len().checked_sub(1)?;
    let pos = (p.clamp(0.0, 100.0) / 100.0) * last as Real;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as Real;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn basic_statistics() {
        let s: Statistics = [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().collect();
        assert_eq!(s.samples(), 5);
        assert_abs_diff_eq!(s.mean().unwrap(), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.variance().unwrap(), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s.std_dev().unwrap(), 2.5_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(s.minimum(), Some(1.0));
        assert_eq!(s.maximum(), Some(5.0));
    }

    #[test]
    fn empty_and_single_sample() {
        let mut s = Statistics::new();
        assert!(s.mean().is_none());
        assert!(s.minimum().is_none());
        s.add(7.0);
        assert_eq!(s.mean(), Some(7.0));
        assert!(s.variance().is_none());
    }

    #[test]
    fn welford_is_stable_with_large_offset() {
        let s: Statistics = [1e9 + 4.0, 1e9 + 7.0, 1e9 + 13.0, 1e9 + 16.0]
            .into_iter()
            .collect();
        assert_abs_diff_eq!(s.variance().unwrap(), 30.0, epsilon = 1e-6);
    }

    #[test]
    fn percentiles_interpolate_linearly() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.0), Some(1.0));
        assert_eq!(percentile(&data, 100.0), Some(4.0));
        assert_abs_diff_eq!(percentile(&data, 50.0).unwrap(), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&data, 10.0).unwrap(), 1.3, epsilon = 1e-12);
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[9.0], 95.0), Some(9.0));
    }
}
