//! Monte Carlo sensitivity sweeps.
//!
//! A sweep moves one input across a range of values and runs a full
//! simulation at each, recording how the probability of a positive NPV
//! responds. The swept input is held at the swept value in every trial.
//!
//! The values run in parallel; each nested simulation runs in worker scope
//! and stays sequential.

use crate::aggregator::{irr_counts, summarize};
use crate::orchestrator::{ExecutionScope, Simulation};
use crate::registry::{DAILY_RATE, INTEREST_RATE, OCCUPANCY_RATE};
use crate::trial::NPV;
use pm_core::{ensure_config, errors::Result, Real, Size};
use pm_projection::PropertyConfig;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

/// Inputs that can be swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    /// Yearly principal repayment as a share of the initial loan.
    AmortizationRate,
    /// Mortgage rate.
    InterestRate,
    /// Purchase price; insurance scales with it.
    PurchasePrice,
    /// Flat occupancy rate.
    Occupancy,
    /// Flat average daily rate.
    DailyRate,
}

/// Range of a sweep relative to the base value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepRange {
    /// Lowest value as a multiple of the base.
    pub min_factor: Real,
    /// Highest value as a multiple of the base.
    pub max_factor: Real,
    /// Absolute limits applied to both ends.
    pub clamp: Option<(Real, Real)>,
}

impl SweepParameter {
    /// Every sweepable input.
    pub const ALL: [SweepParameter; 5] = [
        SweepParameter::AmortizationRate,
        SweepParameter::InterestRate,
        SweepParameter::PurchasePrice,
        SweepParameter::Occupancy,
        SweepParameter::DailyRate,
    ];

    /// Default sweep range.
    pub fn default_range(self) -> SweepRange {
        let range = |min_factor, max_factor, clamp| SweepRange {
            min_factor,
            max_factor,
            clamp,
        };
        match self {
            SweepParameter::AmortizationRate => range(0.0, 2.0, Some((0.0, 0.02))),
            SweepParameter::InterestRate => range(0.5, 2.0, Some((0.005, 0.05))),
            SweepParameter::PurchasePrice => range(0.8, 1.2, None),
            SweepParameter::Occupancy => range(0.8, 1.2, Some((0.0, 1.0))),
            SweepParameter::DailyRate => range(0.7, 1.3, None),
        }
    }

    /// The input's value in `config`.
    pub fn base_value(self, config: &PropertyConfig) -> Real {
        match self {
            SweepParameter::AmortizationRate => config.financing.amortization_rate,
            SweepParameter::InterestRate => config.financing.interest_rate,
            SweepParameter::PurchasePrice => config.financing.purchase_price,
            SweepParameter::Occupancy => config.rental.occupancy_rate,
            SweepParameter::DailyRate => config.rental.average_daily_rate,
        }
    }

    /// Copy of `config` with the input set to `value`.
    pub fn apply(self, config: &PropertyConfig, value: Real) -> PropertyConfig {
        let mut c = match self {
            SweepParameter::PurchasePrice => return config.with_purchase_price(value),
            SweepParameter::Occupancy | SweepParameter::DailyRate => config.without_seasons(),
            _ => config.clone(),
        };
        match self {
            SweepParameter::AmortizationRate => c.financing.amortization_rate = value,
            SweepParameter::InterestRate => c.financing.interest_rate = value,
            SweepParameter::Occupancy => c.rental.occupancy_rate = value,
            SweepParameter::DailyRate => c.rental.average_daily_rate = value,
            SweepParameter::PurchasePrice => {}
        }
        c
    }

    /// The sampled variable the input overrides, if any.
    fn pinned_variable(self) -> Option<&'static str> {
        match self {
            SweepParameter::InterestRate => Some(INTEREST_RATE),
            SweepParameter::Occupancy => Some(OCCUPANCY_RATE),
            SweepParameter::DailyRate => Some(DAILY_RATE),
            SweepParameter::AmortizationRate | SweepParameter::PurchasePrice => None,
        }
    }

    /// Seasonal draws would bypass the flat rental fields.
    fn needs_flat_rental(self) -> bool {
        matches!(self, SweepParameter::Occupancy | SweepParameter::DailyRate)
    }
}

/// `points` evenly spaced values from `base × min_factor` to
/// `base × max_factor`, both ends clamped; a single point is the base.
pub fn sweep_values(base: Real, range: SweepRange, points: Size) -> Vec<Real> {
    if points == 1 {
        return vec![base];
    }
    let (mut lo, mut hi) = (base * range.min_factor, base * range.max_factor);
    if let Some((min, max)) = range.clamp {
        lo = lo.clamp(min, max);
        hi = hi.clamp(min, max);
    }
    let steps = points.saturating_sub(1).max(1) as Real;
    (0..points)
        .map(|i| lo + (hi - lo) * (i as Real / steps))
        .collect()
}

/// Outcome at one swept value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    /// Swept value.
    pub value: Real,
    /// Share of trials with a positive NPV.
    pub positive_probability: Real,
    /// Mean NPV.
    pub mean_npv: Real,
    /// Trials without a defined IRR.
    pub irr_undefined: Size,
}

/// Outcomes across a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivitySweep {
    /// Swept input.
    pub parameter: SweepParameter,
    /// Its value in the base configuration.
    pub base_value: Real,
    /// One point per value, in ascending value order.
    pub points: Vec<SweepPoint>,
}

/// Sweep `parameter` across `points` values of its default range.
pub fn sensitivity_sweep(
    simulation: &Simulation,
    parameter: SweepParameter,
    points: Size,
) -> Result<SensitivitySweep> {
    sensitivity_sweep_over(simulation, parameter, parameter.default_range(), points)
}

/// Sweep `parameter` across `points` values of `range`.
pub fn sensitivity_sweep_over(
    simulation: &Simulation,
    parameter: SweepParameter,
    range: SweepRange,
    points: Size,
) -> Result<SensitivitySweep> {
    ensure_config!(points >= 1, "a sweep needs at least one point");
    let base = simulation.base_config();
    let base_value = parameter.base_value(base);
    let values = sweep_values(base_value, range, points);

    let mut settings = match parameter.pinned_variable() {
        Some(name) => simulation.settings().with_fixed([name]),
        None => simulation.settings().clone(),
    };
    if parameter.needs_flat_rental() {
        settings.use_seasonality = false;
    }
    info!(?parameter, points, trials = settings.num_simulations, "starting sensitivity sweep");

    let run_point = |value: Real| -> Result<SweepPoint> {
        let nested = simulation.nested(parameter.apply(base, value), settings.clone())?;
        let trials = nested.run()?.trials;
        let summary = summarize(&trials);
        let npv = summary.get(NPV);
        Ok(SweepPoint {
            value,
            positive_probability: npv.and_then(|s| s.positive_probability).unwrap_or(0.0),
            mean_npv: npv.and_then(|s| s.mean).unwrap_or(0.0),
            irr_undefined: irr_counts(&trials).undefined,
        })
    };

    let parallel = simulation.settings().parallel && simulation.scope() == ExecutionScope::TopLevel;
    let results: Result<Vec<SweepPoint>> = if parallel {
        match simulation.build_pool() {
            Ok(pool) => pool.install(|| values.par_iter().map(|&v| run_point(v)).collect()),
            Err(e) => {
                warn!(error = %e, "worker pool unavailable; sweeping sequentially");
                values.iter().map(|&v| run_point(v)).collect()
            }
        }
    } else {
        values.iter().map(|&v| run_point(v)).collect()
    };

    Ok(SensitivitySweep {
        parameter,
        base_value,
        points: results?,
    })
}
