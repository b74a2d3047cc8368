//! Latin Hypercube sampling with an optional Gaussian copula.
//!
//! # Algorithm
//!
//! 1. For each variable, split `[0, 1)` into `n` equal strata, draw one
//!    uniform inside each stratum, and assign strata to trials through an
//!    independent random permutation.
//! 2. With a correlation matrix, map the stratified uniforms to standard
//!    normals, multiply every trial's vector by the factor `L` of the
//!    correlation matrix, and re-assign each variable's strata to trials in
//!    the rank order of the correlated normals. Every stratum still holds
//!    exactly one sample, and the rank structure is that of the Gaussian
//!    copula.
//! 3. Push each uniform through the variable's quantile function.
//! 4. Clip to the variable's bounds. Clipping runs last, so it can flatten
//!    the tails of a correlated pair.
//!
//! [`random_sample`] skips the stratification: every trial gets independent
//! uniforms, which pass through the same copula factor before step 3.

use crate::correlation::CorrelationMatrix;
use crate::distributions::{normal_cdf, normal_cdf_inverse, DistributionSpec};
use crate::random_numbers::MersenneTwisterUniformRng;
use pm_core::{ensure_config, errors::Error, errors::Result, Real, Size};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Uniforms are kept this far away from 0 and 1 so every quantile function
/// returns a finite value.
const UNIFORM_GUARD: Real = 1e-12;

// ─── SampleSet ────────────────────────────────────────────────────────────────

/// `n` joint draws for a set of named variables, stored column-wise.
///
/// Trial `i` reads index `i` of every column. The set is read-only after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSet {
    names: Vec<String>,
    columns: Vec<Vec<Real>>,
    len: Size,
}

impl SampleSet {
    /// Assemble a sample set; every column must have the same length.
    pub fn new(names: Vec<String>, columns: Vec<Vec<Real>>) -> Result<Self> {
        ensure_config!(
            names.len() == columns.len(),
            "{} names for {} sample columns",
            names.len(),
            columns.len()
        );
        let len = columns.first().map_or(0, Vec::len);
        ensure_config!(
            columns.iter().all(|c| c.len() == len),
            "sample columns have different lengths"
        );
        Ok(Self {
            names,
            columns,
            len,
        })
    }

    /// Number of trials.
    pub fn len(&self) -> Size {
        self.len
    }

    /// `true` if the set holds no trials.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Variable names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The draws of one variable, in trial order.
    pub fn column(&self, name: &str) -> Option<&[Real]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|j| self.columns[j].as_slice())
    }

    /// The draws for trial `index`.
    pub fn row(&self, index: Size) -> Result<SampleRow<'_>> {
        if index >= self.len {
            return Err(Error::IndexOutOfRange {
                index,
                size: self.len,
            });
        }
        Ok(SampleRow { set: self, index })
    }
}

/// Borrowed view of one trial's draws.
#[derive(Debug, Clone, Copy)]
pub struct SampleRow<'a> {
    set: &'a SampleSet,
    index: Size,
}

impl<'a> SampleRow<'a> {
    /// Trial index this row belongs to.
    pub fn index(&self) -> Size {
        self.index
    }

    /// The draw for `name`, or `None` if the variable was not sampled.
    pub fn get(&self, name: &str) -> Option<Real> {
        self.set.column(name).map(|c| c[self.index])
    }

    /// All draws of this row keyed by variable name.
    pub fn to_map(&self) -> BTreeMap<String, Real> {
        self.set
            .names
            .iter()
            .zip(&self.set.columns)
            .map(|(name, column)| (name.clone(), column[self.index]))
            .collect()
    }
}

// ─── Sampler ──────────────────────────────────────────────────────────────────

/// Draw `n` Latin Hypercube samples for every spec.
///
/// Every name in `correlation` must belong to `specs`; spec variables the
/// matrix does not mention are sampled independently. Fails with a
/// configuration error for duplicate names, an empty run, or a correlation
/// matrix that names unknown variables.
pub fn latin_hypercube_sample(
    specs: &[DistributionSpec],
    correlation: Option<&CorrelationMatrix>,
    n: Size,
    seed: u64,
) -> Result<SampleSet> {
    let names = checked_names(specs, correlation, n)?;
    let mut rng = MersenneTwisterUniformRng::new(seed);
    let d = specs.len();

    // Per variable: one jitter per stratum and a stratum for every trial.
    let jitter: Vec<Vec<Real>> = (0..d)
        .map(|_| (0..n).map(|_| rng.next_open_real()).collect())
        .collect();
    let mut strata: Vec<Vec<Size>> = (0..d)
        .map(|_| {
            let mut perm: Vec<Size> = (0..n).collect();
            perm.shuffle(&mut rng);
            perm
        })
        .collect();

    if let Some(correlation) = correlation {
        strata = correlate_strata(&names, &strata, &jitter, correlation, n)?;
    }

    let mut columns = Vec::with_capacity(d);
    for (j, spec) in specs.iter().enumerate() {
        let column = strata[j]
            .iter()
            .map(|&k| spec.transform(stratum_uniform(k, jitter[j][k], n)))
            .collect::<Result<Vec<Real>>>()?;
        columns.push(column);
    }
    SampleSet::new(names, columns)
}

/// Draw `n` independent samples for every spec.
///
/// Plain Monte Carlo counterpart of [`latin_hypercube_sample`] with the same
/// validation. With a correlation matrix, each trial's normals are
/// multiplied by the factor and mapped back to uniforms through the normal
/// CDF, so the marginals are untouched and the dependence is the Gaussian
/// copula's.
pub fn random_sample(
    specs: &[DistributionSpec],
    correlation: Option<&CorrelationMatrix>,
    n: Size,
    seed: u64,
) -> Result<SampleSet> {
    let names = checked_names(specs, correlation, n)?;
    let mut rng = MersenneTwisterUniformRng::new(seed);
    let d = specs.len();

    // Trial-major, so one trial's draws are contiguous in the stream.
    let mut uniforms = vec![vec![0.0; n]; d];
    for i in 0..n {
        for column in uniforms.iter_mut() {
            column[i] = guard(rng.next_open_real());
        }
    }

    if let Some(correlation) = correlation {
        let factor = correlation.restricted_to(&names)?.factor()?;
        let mut z = vec![0.0; d];
        for i in 0..n {
            for (j, zj) in z.iter_mut().enumerate() {
                *zj = normal_cdf_inverse(uniforms[j][i])?;
            }
            for (j, yj) in factor.mul_vec(&z).into_iter().enumerate() {
                uniforms[j][i] = guard(normal_cdf(yj));
            }
        }
    }

    let columns = specs
        .iter()
        .zip(&uniforms)
        .map(|(spec, column)| {
            column
                .iter()
                .map(|&u| spec.transform(u))
                .collect::<Result<Vec<Real>>>()
        })
        .collect::<Result<Vec<Vec<Real>>>>()?;
    SampleSet::new(names, columns)
}

/// Spec names, checked for duplicates and against the correlation matrix.
fn checked_names(
    specs: &[DistributionSpec],
    correlation: Option<&CorrelationMatrix>,
    n: Size,
) -> Result<Vec<String>> {
    ensure_config!(n > 0, "number of samples must be positive");
    let names: Vec<String> = specs.iter().map(|s| s.name().to_string()).collect();
    let mut unique = HashSet::with_capacity(names.len());
    for name in &names {
        ensure_config!(unique.insert(name.as_str()), "variable '{name}' is declared twice");
    }
    if let Some(correlation) = correlation {
        for name in correlation.names() {
            ensure_config!(
                unique.contains(name.as_str()),
                "correlated variable '{name}' is not in the active distribution set"
            );
        }
    }
    Ok(names)
}

#[inline]
fn guard(u: Real) -> Real {
    u.clamp(UNIFORM_GUARD, 1.0 - UNIFORM_GUARD)
}

#[inline]
fn stratum_uniform(stratum: Size, jitter: Real, n: Size) -> Real {
    guard((stratum as Real + jitter) / n as Real)
}

/// Re-assign strata so their ranks follow the Gaussian copula.
fn correlate_strata(
    names: &[String],
    strata: &[Vec<Size>],
    jitter: &[Vec<Real>],
    correlation: &CorrelationMatrix,
    n: Size,
) -> Result<Vec<Vec<Size>>> {
    let d = names.len();
    let factor = correlation.restricted_to(names)?.factor()?;

    let mut normals = vec![vec![0.0; n]; d];
    for (j, column) in normals.iter_mut().enumerate() {
        for (i, z) in column.iter_mut().enumerate() {
            let k = strata[j][i];
            *z = normal_cdf_inverse(stratum_uniform(k, jitter[j][k], n))?;
        }
    }

    let mut correlated = vec![vec![0.0; n]; d];
    let mut z = vec![0.0; d];
    for i in 0..n {
        for (j, zj) in z.iter_mut().enumerate() {
            *zj = normals[j][i];
        }
        for (j, yj) in factor.mul_vec(&z).into_iter().enumerate() {
            correlated[j][i] = yj;
        }
    }

    Ok(correlated
        .iter()
        .map(|column| {
            let mut order: Vec<Size> = (0..n).collect();
            order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
            let mut ranks = vec![0; n];
            for (rank, trial) in order.into_iter().enumerate() {
                ranks[trial] = rank;
            }
            ranks
        })
        .collect())
}
