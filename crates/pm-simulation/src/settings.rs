//! Simulation settings.
//!
//! Every field has a documented default, so a TOML document only needs the
//! options it changes:
//!
//! ```
//! use pm_simulation::SimulationSettings;
//!
//! let settings = SimulationSettings::from_toml_str(
//!     r#"
//!     num_simulations = 2000
//!     use_seasonality = false
//!
//!     [events.market_shock]
//!     annual_probability = 0.05
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(settings.num_simulations, 2000);
//! assert_eq!(settings.seed, 42);
//! assert_eq!(settings.events.market_shock.annual_probability, 0.05);
//! assert_eq!(settings.events.market_shock.recovery_years, (1, 3));
//! ```

use crate::registry;
use pm_core::{ensure_config, errors::Error, errors::Result, Amount, Rate, Real, Size, Year};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Time series ───────────────────────────────────────────────────────────────

/// Parameters of one mean-reverting yearly series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesParameters {
    /// Share of last year's deviation from the mean that persists.
    pub mean_reversion: Real,
    /// Standard deviation of the yearly innovation.
    pub innovation_std: Real,
    /// Clipping bounds applied to every generated year.
    pub bounds: (Real, Real),
}

impl SeriesParameters {
    /// Reference inflation path: fast reversion, low volatility.
    pub fn inflation() -> Self {
        Self {
            mean_reversion: 0.80,
            innovation_std: 0.005,
            bounds: (0.0, 0.03),
        }
    }

    /// Reference appreciation path: slower reversion, higher volatility, and
    /// room for downturns.
    pub fn appreciation() -> Self {
        Self {
            mean_reversion: 0.75,
            innovation_std: 0.015,
            bounds: (-0.02, 0.09),
        }
    }

    /// Copy without innovations.
    pub fn without_noise(self) -> Self {
        Self {
            innovation_std: 0.0,
            ..self
        }
    }

    /// Check the parameters are usable.
    pub fn validate(&self, label: &str) -> Result<()> {
        ensure_config!(
            (0.0..=1.0).contains(&self.mean_reversion),
            "{label}: mean reversion {} outside [0, 1]",
            self.mean_reversion
        );
        ensure_config!(
            self.innovation_std.is_finite() && self.innovation_std >= 0.0,
            "{label}: innovation std must be finite and non-negative"
        );
        let (lo, hi) = self.bounds;
        ensure_config!(
            lo.is_finite() && hi.is_finite() && lo <= hi,
            "{label}: bounds ({lo}, {hi}) must be finite and ordered"
        );
        Ok(())
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Major maintenance arrivals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceParameters {
    /// Expected events per year (Poisson intensity).
    pub annual_rate: Real,
    /// Median cost of one event.
    pub median_cost: Amount,
    /// Log-scale volatility of the cost.
    pub cost_sigma: Real,
    /// Smallest recorded cost.
    pub min_cost: Amount,
    /// Largest recorded cost.
    pub max_cost: Amount,
}

impl Default for MaintenanceParameters {
    fn default() -> Self {
        Self {
            annual_rate: 0.15,
            median_cost: 15_000.0,
            cost_sigma: 0.5,
            min_cost: 5_000.0,
            max_cost: 50_000.0,
        }
    }
}

/// Rare market disruptions.
///
/// Each reduction range `(lo, hi)` is a fraction removed from the neutral
/// multiplier, so `(0.30, 0.50)` yields multipliers between 0.50 and 0.70.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketShockParameters {
    /// Probability of a shock in any one year.
    pub annual_probability: Real,
    /// Reduction range for booked nights.
    pub occupancy_reduction: (Real, Real),
    /// Reduction range for nightly rates.
    pub rate_reduction: (Real, Real),
    /// Reduction range for the property value.
    pub value_reduction: (Real, Real),
    /// Inclusive range of recovery horizons, in years.
    pub recovery_years: (Year, Year),
}

impl Default for MarketShockParameters {
    fn default() -> Self {
        Self {
            annual_probability: 0.03,
            occupancy_reduction: (0.30, 0.50),
            rate_reduction: (0.20, 0.30),
            value_reduction: (0.10, 0.20),
            recovery_years: (1, 3),
        }
    }
}

/// Periodic refinancing opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinancingParameters {
    /// First year an opportunity is evaluated.
    pub first_year: Year,
    /// Years between evaluations.
    pub interval: Year,
    /// Standard deviation of the market rate around the current rate.
    pub rate_volatility: Real,
    /// Floor on the market rate.
    pub min_rate: Rate,
    /// Minimum saving, in rate points, before refinancing is considered.
    pub threshold: Rate,
    /// Probability of going ahead once the saving is large enough.
    pub probability: Real,
    /// One-off cost as a fraction of the outstanding balance.
    pub cost_rate: Rate,
}

impl Default for RefinancingParameters {
    fn default() -> Self {
        Self {
            first_year: 3,
            interval: 3,
            rate_volatility: 0.005,
            min_rate: 0.005,
            threshold: 0.005,
            probability: 0.7,
            cost_rate: 0.015,
        }
    }
}

/// All discrete-event parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventParameters {
    /// Major maintenance.
    pub maintenance: MaintenanceParameters,
    /// Market shocks.
    pub market_shock: MarketShockParameters,
    /// Refinancing.
    pub refinancing: RefinancingParameters,
}

impl EventParameters {
    /// Parameters under which no event ever fires.
    pub fn disabled() -> Self {
        let defaults = Self::default();
        Self {
            maintenance: MaintenanceParameters {
                annual_rate: 0.0,
                ..defaults.maintenance
            },
            market_shock: MarketShockParameters {
                annual_probability: 0.0,
                ..defaults.market_shock
            },
            refinancing: RefinancingParameters {
                probability: 0.0,
                ..defaults.refinancing
            },
        }
    }

    /// Check every rate, probability, and range is usable.
    pub fn validate(&self) -> Result<()> {
        let m = &self.maintenance;
        ensure_config!(
            m.annual_rate.is_finite() && m.annual_rate >= 0.0,
            "maintenance rate must be finite and non-negative"
        );
        ensure_config!(
            m.median_cost > 0.0 && m.cost_sigma >= 0.0,
            "maintenance cost distribution needs a positive median and non-negative sigma"
        );
        ensure_config!(
            0.0 <= m.min_cost && m.min_cost <= m.max_cost,
            "maintenance cost bounds ({}, {}) are invalid",
            m.min_cost,
            m.max_cost
        );

        let s = &self.market_shock;
        ensure_config!(
            (0.0..=1.0).contains(&s.annual_probability),
            "shock probability {} outside [0, 1]",
            s.annual_probability
        );
        for (label, (lo, hi)) in [
            ("occupancy", s.occupancy_reduction),
            ("rate", s.rate_reduction),
            ("value", s.value_reduction),
        ] {
            ensure_config!(
                0.0 <= lo && lo <= hi && hi <= 1.0,
                "shock {label} reduction ({lo}, {hi}) must be ordered within [0, 1]"
            );
        }
        let (r_lo, r_hi) = s.recovery_years;
        ensure_config!(
            1 <= r_lo && r_lo <= r_hi,
            "shock recovery years ({r_lo}, {r_hi}) must be ordered and at least 1"
        );

        let r = &self.refinancing;
        ensure_config!(
            r.first_year >= 1 && r.interval >= 1,
            "refinancing cadence must start at year 1 or later with a positive interval"
        );
        ensure_config!(
            r.rate_volatility >= 0.0 && r.min_rate >= 0.0 && r.threshold >= 0.0,
            "refinancing rates must be non-negative"
        );
        ensure_config!(
            (0.0..=1.0).contains(&r.probability),
            "refinancing probability {} outside [0, 1]",
            r.probability
        );
        ensure_config!(
            (0.0..1.0).contains(&r.cost_rate),
            "refinancing cost rate {} outside [0, 1)",
            r.cost_rate
        );
        Ok(())
    }
}

// ── SimulationSettings ────────────────────────────────────────────────────────

/// Options recognised by the Monte Carlo engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of trials.
    pub num_simulations: Size,
    /// Run-level seed; every random draw derives from it.
    pub seed: u64,
    /// Correlate the sampled variables through the Gaussian copula.
    pub use_correlations: bool,
    /// Draw inputs by Latin Hypercube; `false` draws them independently.
    pub use_lhs: bool,
    /// Sample per-season occupancy and rates.
    pub use_seasonality: bool,
    /// Sample electricity costs and the maintenance rate.
    pub use_expense_variation: bool,
    /// Run trials on a worker pool.
    pub parallel: bool,
    /// Projection horizon in years.
    pub horizon_years: Year,
    /// Size of the worker pool.
    pub num_workers: Size,
    /// Runs with at most this many trials stay sequential.
    pub parallel_threshold: Size,
    /// Record convergence checkpoints of the running mean NPV.
    pub check_convergence: bool,
    /// Percentiles reported per output metric, in `[0, 100]`.
    pub percentiles: Vec<Real>,
    /// Variables held at the base configuration's value.
    pub fixed_parameters: BTreeSet<String>,
    /// Discrete-event parameters.
    pub events: EventParameters,
    /// Inflation path parameters.
    pub inflation: SeriesParameters,
    /// Appreciation path parameters.
    pub appreciation: SeriesParameters,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            seed: 42,
            use_correlations: true,
            use_lhs: true,
            use_seasonality: true,
            use_expense_variation: true,
            parallel: true,
            horizon_years: 15,
            num_workers: default_workers(),
            parallel_threshold: 100,
            check_convergence: false,
            percentiles: vec![5.0, 10.0, 25.0, 75.0, 90.0, 95.0],
            fixed_parameters: registry::DEFAULT_FIXED_PARAMETERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            events: EventParameters::default(),
            inflation: SeriesParameters::inflation(),
            appreciation: SeriesParameters::appreciation(),
        }
    }
}

/// One core left free for the caller.
fn default_workers() -> Size {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .saturating_sub(1)
        .max(1)
}

impl SimulationSettings {
    /// Parse settings from TOML and validate them.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let settings: Self = toml::from_str(toml_str)
            .map_err(|e| Error::Configuration(format!("invalid simulation settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<()> {
        ensure_config!(self.num_simulations > 0, "num_simulations must be positive");
        ensure_config!(self.horizon_years >= 1, "horizon_years must be at least 1");
        ensure_config!(self.num_workers >= 1, "num_workers must be at least 1");
        for &p in &self.percentiles {
            ensure_config!(
                (0.0..=100.0).contains(&p),
                "percentile {p} outside [0, 100]"
            );
        }
        self.events.validate()?;
        self.inflation.validate("inflation")?;
        self.appreciation.validate("appreciation")?;
        Ok(())
    }

    /// `true` when `name` is held at its base value.
    pub fn is_fixed(&self, name: &str) -> bool {
        self.fixed_parameters.contains(name)
    }

    /// Copy with additional fixed variables.
    pub fn with_fixed<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fixed = self.fixed_parameters.clone();
        fixed.extend(names.into_iter().map(Into::into));
        Self {
            fixed_parameters: fixed,
            ..self.clone()
        }
    }
}
