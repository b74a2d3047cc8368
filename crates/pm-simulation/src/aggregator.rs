//! The Aggregator: per-metric summary statistics over a completed run.

use crate::trial::{TrialResult, NPV};
use pm_core::{Real, Size};
use pm_math::{percentile, Statistics};
use serde::Serialize;
use std::collections::BTreeMap;

/// Percentiles reported when the caller names none.
pub const DEFAULT_PERCENTILES: [Real; 6] = [5.0, 10.0, 25.0, 75.0, 90.0, 95.0];

/// Summary of one output metric.
///
/// Undefined values (IRRs without a root) are left out of every statistic
/// and counted in `undefined_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStatistics {
    /// Defined values.
    pub count: Size,
    /// Undefined values.
    pub undefined_count: Size,
    /// Mean.
    pub mean: Option<Real>,
    /// Median.
    pub median: Option<Real>,
    /// Sample standard deviation.
    pub std_dev: Option<Real>,
    /// Smallest value.
    pub min: Option<Real>,
    /// Largest value.
    pub max: Option<Real>,
    /// Requested percentiles keyed `"p5"`, `"p95"`, ...
    pub percentiles: BTreeMap<String, Real>,
    /// Share of all trials with a strictly positive value; NPV only.
    pub positive_probability: Option<Real>,
}

impl AggregateStatistics {
    fn from_values(values: &[Option<Real>], percentiles: &[Real], with_probability: bool) -> Self {
        let mut defined: Vec<Real> = values.iter().flatten().copied().collect();
        defined.sort_by(|a, b| a.total_cmp(b));
        let stats: Statistics = defined.iter().copied().collect();

        let positive_probability = (with_probability && !values.is_empty()).then(|| {
            defined.iter().filter(|&&v| v > 0.0).count() as Real / values.len() as Real
        });
        Self {
            count: defined.len(),
            undefined_count: values.len() - defined.len(),
            mean: stats.mean(),
            median: percentile(&defined, 50.0),
            std_dev: stats.std_dev(),
            min: stats.minimum(),
            max: stats.maximum(),
            percentiles: percentiles
                .iter()
                .filter_map(|&p| percentile(&defined, p).map(|v| (format!("p{p}"), v)))
                .collect(),
            positive_probability,
        }
    }
}

/// Summarise every output metric with the default percentiles.
pub fn summarize(results: &[TrialResult]) -> BTreeMap<String, AggregateStatistics> {
    summarize_with(results, &DEFAULT_PERCENTILES)
}

/// Summarise every output metric with the given percentiles.
pub fn summarize_with(
    results: &[TrialResult],
    percentiles: &[Real],
) -> BTreeMap<String, AggregateStatistics> {
    let mut columns: BTreeMap<&'static str, Vec<Option<Real>>> = BTreeMap::new();
    for r in results {
        for (name, value) in r.outputs() {
            columns
                .entry(name)
                .or_insert_with(|| Vec::with_capacity(results.len()))
                .push(value);
        }
    }
    columns
        .into_iter()
        .map(|(name, values)| {
            let stats = AggregateStatistics::from_values(&values, percentiles, name == NPV);
            (name.to_string(), stats)
        })
        .collect()
}

/// Trials with and without a defined IRR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IrrCounts {
    /// Trials whose IRR with sale is defined.
    pub defined: Size,
    /// Trials whose IRR with sale is undefined.
    pub undefined: Size,
}

/// Count trials by whether their IRR with sale is defined.
pub fn irr_counts(results: &[TrialResult]) -> IrrCounts {
    let defined = results.iter().filter(|r| r.has_defined_irr()).count();
    IrrCounts {
        defined,
        undefined: results.len() - defined,
    }
}
