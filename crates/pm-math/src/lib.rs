//! # pm-math
//!
//! Mathematical building blocks for the property Monte Carlo engine:
//! closed-family probability distributions with inverse CDFs, correlation
//! matrices and their factorisation (over nalgebra), a Mersenne-Twister
//! random number generator with deterministic seed derivation, Latin
//! Hypercube and plain random samplers with a Gaussian copula, 1D
//! root-finding, and statistics accumulators.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Correlation matrices over named variables.
pub mod correlation;

/// Probability distributions and distribution specifications.
pub mod distributions;

/// Dense matrix newtype.
pub mod matrix;

/// Matrix decompositions.
pub mod matrix_utilities;

/// Random number generators and seed derivation.
pub mod random_numbers;

/// Latin Hypercube sampling with an optional Gaussian copula.
pub mod sampling;

/// 1D root-finding solvers.
pub mod solvers1d;

/// Statistics accumulators and percentiles.
pub mod statistics;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use correlation::CorrelationMatrix;
pub use distributions::{normal_cdf, normal_cdf_inverse, Distribution, DistributionSpec, Family};
pub use matrix::Matrix;
pub use random_numbers::{derive_seed, MersenneTwisterUniformRng, Stream};
pub use sampling::{latin_hypercube_sample, random_sample, SampleRow, SampleSet};
pub use statistics::{percentile, Statistics};
