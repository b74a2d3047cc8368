//! Probability distributions.
//!
//! The sampler only needs two things from a distribution: its quantile
//! function (to map stratified uniforms onto the target marginal) and its
//! CDF (to audit stratification). [`Distribution`] is a closed sum type over
//! the supported families, so both are a single exhaustive `match`.
//!
//! A [`DistributionSpec`] attaches a variable name and optional clipping
//! bounds. Its wire form is the flat record
//! `{name, family, parameters, bounds}` where `parameters` must carry exactly
//! the keys its family requires.

/// Scaled beta distribution.
pub mod beta;

/// Normal distribution functions.
pub mod normal;

/// Triangular distribution.
pub mod triangular;

pub use beta::ScaledBeta;
pub use normal::{normal_cdf, normal_cdf_inverse, normal_pdf};
pub use triangular::Triangular;

use pm_core::{ensure_config, errors::Error, errors::Result, Real};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Family ────────────────────────────────────────────────────────────────────

/// Distribution family tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Continuous uniform on `[min, max]`.
    Uniform,
    /// Normal with `mean` and `std`.
    Normal,
    /// Triangular with `min`, `mode`, `max`.
    Triangular,
    /// Beta(`alpha`, `beta`) scaled onto `[min, max]`.
    Beta,
    /// Log-normal; `mean` and `std` describe the underlying normal.
    LogNormal,
}

impl Family {
    /// Parameter keys this family requires, in canonical order.
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            Family::Uniform => &["min", "max"],
            Family::Normal => &["mean", "std"],
            Family::Triangular => &["min", "mode", "max"],
            Family::Beta => &["alpha", "beta", "min", "max"],
            Family::LogNormal => &["mean", "std"],
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::Uniform => "uniform",
            Family::Normal => "normal",
            Family::Triangular => "triangular",
            Family::Beta => "beta",
            Family::LogNormal => "lognormal",
        };
        f.write_str(name)
    }
}

// ── Distribution ──────────────────────────────────────────────────────────────

/// A univariate distribution from one of the supported families.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    /// Uniform on `[min, max]`.
    Uniform {
        /// Lower end of the support.
        min: Real,
        /// Upper end of the support.
        max: Real,
    },
    /// Normal distribution.
    Normal {
        /// Mean.
        mean: Real,
        /// Standard deviation (> 0).
        std: Real,
    },
    /// Triangular distribution.
    Triangular {
        /// Lower end of the support.
        min: Real,
        /// Peak.
        mode: Real,
        /// Upper end of the support.
        max: Real,
    },
    /// Beta distribution stretched onto `[min, max]`.
    Beta {
        /// First shape parameter.
        alpha: Real,
        /// Second shape parameter.
        beta: Real,
        /// Lower end of the support.
        min: Real,
        /// Upper end of the support.
        max: Real,
    },
    /// Log-normal: `exp(N(mu, sigma²))`.
    LogNormal {
        /// Mean of the underlying normal.
        mu: Real,
        /// Standard deviation of the underlying normal (> 0).
        sigma: Real,
    },
}

impl Distribution {
    /// Build a distribution from a family tag and a parameter map.
    ///
    /// The map must contain exactly the keys the family requires.
    pub fn from_parameters(family: Family, parameters: &BTreeMap<String, Real>) -> Result<Self> {
        let required = family.required_keys();
        for key in parameters.keys() {
            ensure_config!(
                required.contains(&key.as_str()),
                "unexpected parameter '{key}' for {family} distribution"
            );
        }
        let get = |key: &str| {
            parameters.get(key).copied().ok_or_else(|| {
                Error::Configuration(format!("missing parameter '{key}' for {family} distribution"))
            })
        };
        let distribution = match family {
            Family::Uniform => Distribution::Uniform {
                min: get("min")?,
                max: get("max")?,
            },
            Family::Normal => Distribution::Normal {
                mean: get("mean")?,
                std: get("std")?,
            },
            Family::Triangular => Distribution::Triangular {
                min: get("min")?,
                mode: get("mode")?,
                max: get("max")?,
            },
            Family::Beta => Distribution::Beta {
                alpha: get("alpha")?,
                beta: get("beta")?,
                min: get("min")?,
                max: get("max")?,
            },
            Family::LogNormal => Distribution::LogNormal {
                mu: get("mean")?,
                sigma: get("std")?,
            },
        };
        distribution.validate()?;
        Ok(distribution)
    }

    /// The family tag.
    pub fn family(&self) -> Family {
        match self {
            Distribution::Uniform { .. } => Family::Uniform,
            Distribution::Normal { .. } => Family::Normal,
            Distribution::Triangular { .. } => Family::Triangular,
            Distribution::Beta { .. } => Family::Beta,
            Distribution::LogNormal { .. } => Family::LogNormal,
        }
    }

    /// The parameter map, keyed as in [`Family::required_keys`].
    pub fn parameters(&self) -> BTreeMap<String, Real> {
        let pairs: Vec<(&str, Real)> = match *self {
            Distribution::Uniform { min, max } => vec![("min", min), ("max", max)],
            Distribution::Normal { mean, std } => vec![("mean", mean), ("std", std)],
            Distribution::Triangular { min, mode, max } => {
                vec![("min", min), ("mode", mode), ("max", max)]
            }
            Distribution::Beta {
                alpha,
                beta,
                min,
                max,
            } => vec![("alpha", alpha), ("beta", beta), ("min", min), ("max", max)],
            Distribution::LogNormal { mu, sigma } => vec![("mean", mu), ("std", sigma)],
        };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    /// Check the parameters are consistent with the family.
    pub fn validate(&self) -> Result<()> {
        let params = self.parameters();
        ensure_config!(
            params.values().all(|v| v.is_finite()),
            "{} distribution has non-finite parameters: {params:?}",
            self.family()
        );
        match *self {
            Distribution::Uniform { min, max } => {
                ensure_config!(min < max, "uniform requires min < max, got [{min}, {max}]");
            }
            Distribution::Normal { std, .. } => {
                ensure_config!(std > 0.0, "normal requires std > 0, got {std}");
            }
            Distribution::Triangular { min, mode, max } => {
                Triangular::new(min, mode, max)?;
            }
            Distribution::Beta {
                alpha,
                beta,
                min,
                max,
            } => {
                ScaledBeta::new(alpha, beta, min, max)?;
            }
            Distribution::LogNormal { sigma, .. } => {
                ensure_config!(sigma > 0.0, "lognormal requires std > 0, got {sigma}");
            }
        }
        Ok(())
    }

    /// Inverse CDF at `u ∈ (0, 1)`.
    pub fn quantile(&self, u: Real) -> Result<Real> {
        let x = match *self {
            Distribution::Uniform { min, max } => min + u * (max - min),
            Distribution::Normal { mean, std } => mean + std * normal_cdf_inverse(u)?,
            Distribution::Triangular { min, mode, max } => {
                Triangular::new(min, mode, max)?.quantile(u)
            }
            Distribution::Beta {
                alpha,
                beta,
                min,
                max,
            } => ScaledBeta::new(alpha, beta, min, max)?.quantile(u)?,
            Distribution::LogNormal { mu, sigma } => (mu + sigma * normal_cdf_inverse(u)?).exp(),
        };
        Ok(x)
    }

    /// Cumulative distribution function.
    pub fn cdf(&self, x: Real) -> Result<Real> {
        let p = match *self {
            Distribution::Uniform { min, max } => ((x - min) / (max - min)).clamp(0.0, 1.0),
            Distribution::Normal { mean, std } => normal_cdf((x - mean) / std),
            Distribution::Triangular { min, mode, max } => Triangular::new(min, mode, max)?.cdf(x),
            Distribution::Beta {
                alpha,
                beta,
                min,
                max,
            } => ScaledBeta::new(alpha, beta, min, max)?.cdf(x),
            Distribution::LogNormal { mu, sigma } => {
                if x <= 0.0 {
                    0.0
                } else {
                    normal_cdf((x.ln() - mu) / sigma)
                }
            }
        };
        Ok(p)
    }

    /// Central point estimate used when the variable is held fixed: the
    /// mean for normal, uniform, triangular and beta, the median `exp(mu)`
    /// for log-normal.
    pub fn point_estimate(&self) -> Real {
        match *self {
            Distribution::Uniform { min, max } => 0.5 * (min + max),
            Distribution::Normal { mean, .. } => mean,
            Distribution::Triangular { min, mode, max } => (min + mode + max) / 3.0,
            Distribution::Beta {
                alpha,
                beta,
                min,
                max,
            } => min + (max - min) * alpha / (alpha + beta),
            Distribution::LogNormal { mu, .. } => mu.exp(),
        }
    }
}

// ── DistributionSpec ──────────────────────────────────────────────────────────

/// A named, immutable distribution with optional clipping bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DistributionRecord", into = "DistributionRecord")]
pub struct DistributionSpec {
    name: String,
    distribution: Distribution,
    bounds: Option<(Real, Real)>,
}

impl DistributionSpec {
    /// Create a spec, validating the distribution and the bounds.
    pub fn new(
        name: impl Into<String>,
        distribution: Distribution,
        bounds: Option<(Real, Real)>,
    ) -> Result<Self> {
        let name = name.into();
        ensure_config!(!name.is_empty(), "distribution name must not be empty");
        distribution
            .validate()
            .map_err(|e| Error::Configuration(format!("variable '{name}': {e}")))?;
        if let Some((lo, hi)) = bounds {
            ensure_config!(
                lo.is_finite() && hi.is_finite() && lo <= hi,
                "variable '{name}': bounds ({lo}, {hi}) must be finite and ordered"
            );
        }
        Ok(Self {
            name,
            distribution,
            bounds,
        })
    }

    /// Create a spec from a family tag and a parameter map.
    pub fn from_parameters(
        name: impl Into<String>,
        family: Family,
        parameters: &BTreeMap<String, Real>,
        bounds: Option<(Real, Real)>,
    ) -> Result<Self> {
        let name = name.into();
        let distribution = Distribution::from_parameters(family, parameters)
            .map_err(|e| Error::Configuration(format!("variable '{name}': {e}")))?;
        Self::new(name, distribution, bounds)
    }

    /// Variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying distribution.
    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    /// Clipping bounds, if any.
    pub fn bounds(&self) -> Option<(Real, Real)> {
        self.bounds
    }

    /// Clip `x` to the bounds.
    pub fn clip(&self, x: Real) -> Real {
        match self.bounds {
            Some((lo, hi)) => x.clamp(lo, hi),
            None => x,
        }
    }

    /// Map a uniform `u ∈ (0, 1)` to a clipped draw.
    pub fn transform(&self, u: Real) -> Result<Real> {
        Ok(self.clip(self.distribution.quantile(u)?))
    }

    /// The clipped point estimate of the distribution.
    pub fn point_estimate(&self) -> Real {
        self.clip(self.distribution.point_estimate())
    }

    /// Copy of this spec with different bounds.
    pub fn with_bounds(&self, bounds: Option<(Real, Real)>) -> Result<Self> {
        Self::new(self.name.clone(), self.distribution, bounds)
    }
}

/// Flat wire form of a [`DistributionSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DistributionRecord {
    name: String,
    family: Family,
    parameters: BTreeMap<String, Real>,
    #[serde(default)]
    bounds: Option<(Real, Real)>,
}

impl TryFrom<DistributionRecord> for DistributionSpec {
    type Error = Error;

    fn try_from(record: DistributionRecord) -> Result<Self> {
        Self::from_parameters(record.name, record.family, &record.parameters, record.bounds)
    }
}

impl From<DistributionSpec> for DistributionRecord {
    fn from(spec: DistributionSpec) -> Self {
        Self {
            family: spec.distribution.family(),
            parameters: spec.distribution.parameters(),
            name: spec.name,
            bounds: spec.bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params(pairs: &[(&str, Real)]) -> BTreeMap<String, Real> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn parameter_keys_must_match_family_exactly() {
        let ok = params(&[("min", 0.0), ("mode", 0.5), ("max", 1.0)]);
        assert!(Distribution::from_parameters(Family::Triangular, &ok).is_ok());

        let missing = params(&[("min", 0.0), ("max", 1.0)]);
        let err = Distribution::from_parameters(Family::Triangular, &missing).unwrap_err();
        assert!(err.is_configuration());

        let extra = params(&[("mean", 0.0), ("std", 1.0), ("mode", 0.0)]);
        assert!(Distribution::from_parameters(Family::Normal, &extra)
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn inconsistent_parameters_are_configuration_errors() {
        let reversed = params(&[("min", 2.0), ("max", 1.0)]);
        assert!(Distribution::from_parameters(Family::Uniform, &reversed)
            .unwrap_err()
            .is_configuration());
        let negative_std = params(&[("mean", 0.0), ("std", -1.0)]);
        assert!(Distribution::from_parameters(Family::LogNormal, &negative_std).is_err());
    }

    #[test]
    fn reversed_bounds_rejected() {
        let d = Distribution::Normal { mean: 0.0, std: 1.0 };
        assert!(DistributionSpec::new("x", d, Some((1.0, -1.0)))
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn quantiles_of_each_family() {
        let uniform = Distribution::Uniform { min: 2.0, max: 4.0 };
        assert_abs_diff_eq!(uniform.quantile(0.25).unwrap(), 2.5, epsilon = 1e-12);

        let normal = Distribution::Normal { mean: 250.0, std: 40.0 };
        assert_abs_diff_eq!(normal.quantile(0.5).unwrap(), 250.0, epsilon = 1e-9);

        let lognormal = Distribution::LogNormal {
            mu: 300.0_f64.ln(),
            sigma: 0.25,
        };
        assert_abs_diff_eq!(lognormal.quantile(0.5).unwrap(), 300.0, epsilon = 1e-8);
    }

    #[test]
    fn cdf_inverts_quantile_for_every_family() {
        let families = [
            Distribution::Uniform { min: -1.0, max: 3.0 },
            Distribution::Normal { mean: 0.02, std: 0.005 },
            Distribution::Triangular {
                min: 0.25,
                mode: 0.30,
                max: 0.35,
            },
            Distribution::Beta {
                alpha: 2.5,
                beta: 1.8,
                min: 0.30,
                max: 0.75,
            },
            Distribution::LogNormal {
                mu: 1.7_f64.ln(),
                sigma: 0.15,
            },
        ];
        for d in families {
            for u in [0.02, 0.3, 0.5, 0.7, 0.98] {
                let x = d.quantile(u).unwrap();
                assert_abs_diff_eq!(d.cdf(x).unwrap(), u, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn transform_clips_last() {
        let spec = DistributionSpec::new(
            "daily_rate",
            Distribution::LogNormal {
                mu: 300.0_f64.ln(),
                sigma: 0.25,
            },
            Some((150.0, 450.0)),
        )
        .unwrap();
        assert_eq!(spec.transform(1e-9).unwrap(), 150.0);
        assert_eq!(spec.transform(1.0 - 1e-9).unwrap(), 450.0);
    }

    #[test]
    fn point_estimate_is_clipped() {
        let spec = DistributionSpec::new(
            "x",
            Distribution::Normal { mean: 5.0, std: 1.0 },
            Some((0.0, 4.0)),
        )
        .unwrap();
        assert_eq!(spec.point_estimate(), 4.0);
    }

    #[test]
    fn wire_record_round_trips_through_json_shape() {
        let spec = DistributionSpec::new(
            "owner_nights",
            Distribution::Normal { mean: 5.0, std: 1.0 },
            Some((3.0, 8.0)),
        )
        .unwrap();
        let record = DistributionRecord::from(spec.clone());
        assert_eq!(record.family, Family::Normal);
        assert_eq!(record.parameters.len(), 2);
        assert_eq!(DistributionSpec::try_from(record).unwrap(), spec);
    }
}
