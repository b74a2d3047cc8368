//! The Distribution Registry.
//!
//! Declares the uncertain inputs of the model: one [`DistributionSpec`] per
//! named variable plus the correlation structure between them. The
//! registry is built once and never mutated; a run selects its active
//! subset from the [`SimulationSettings`] toggles.

use crate::settings::SimulationSettings;
use pm_core::{ensure_config, errors::Result, Real};
use pm_math::{CorrelationMatrix, Distribution, DistributionSpec};
use std::collections::HashSet;

// ── Variable names ────────────────────────────────────────────────────────────

/// Annual occupancy (flat rental model).
pub const OCCUPANCY_RATE: &str = "occupancy_rate";
/// Average daily rate (flat rental model).
pub const DAILY_RATE: &str = "daily_rate";
/// Winter-season occupancy.
pub const WINTER_OCCUPANCY: &str = "winter_occupancy";
/// Summer-season occupancy.
pub const SUMMER_OCCUPANCY: &str = "summer_occupancy";
/// Off-peak occupancy.
pub const OFFPEAK_OCCUPANCY: &str = "offpeak_occupancy";
/// Winter-season daily rate.
pub const WINTER_RATE: &str = "winter_rate";
/// Summer-season daily rate.
pub const SUMMER_RATE: &str = "summer_rate";
/// Off-peak daily rate.
pub const OFFPEAK_RATE: &str = "offpeak_rate";
/// Mortgage interest rate.
pub const INTEREST_RATE: &str = "interest_rate";
/// Management fee rate.
pub const MANAGEMENT_FEE: &str = "management_fee";
/// Nights each owner uses the property.
pub const OWNER_NIGHTS: &str = "owner_nights";
/// Shared building charges.
pub const NUBBING_COSTS_ANNUAL: &str = "nubbing_costs_annual";
/// Electricity and internet.
pub const ELECTRICITY_INTERNET_ANNUAL: &str = "electricity_internet_annual";
/// Maintenance reserve rate.
pub const MAINTENANCE_RATE: &str = "maintenance_rate";
/// Base inflation rate (seeds the inflation series).
pub const INFLATION_RATE: &str = "inflation_rate";
/// Base appreciation rate (seeds the appreciation series).
pub const PROPERTY_APPRECIATION: &str = "property_appreciation";
/// Share of bookings through online agencies.
pub const OTA_BOOKING_PERCENTAGE: &str = "ota_booking_percentage";
/// Agency commission.
pub const OTA_FEE_RATE: &str = "ota_fee_rate";
/// Average nights per stay.
pub const AVERAGE_LENGTH_OF_STAY: &str = "average_length_of_stay";
/// Average guests per booked night.
pub const AVG_GUESTS_PER_NIGHT: &str = "avg_guests_per_night";
/// Cleaning cost per stay.
pub const CLEANING_COST_PER_STAY: &str = "cleaning_cost_per_stay";
/// Owners' marginal tax rate.
pub const MARGINAL_TAX_RATE: &str = "marginal_tax_rate";
/// Discount rate for NPV.
pub const DISCOUNT_RATE: &str = "discount_rate";

/// Variables sampled only when seasonality is enabled.
pub const SEASONAL_VARIABLES: [&str; 6] = [
    WINTER_OCCUPANCY,
    SUMMER_OCCUPANCY,
    OFFPEAK_OCCUPANCY,
    WINTER_RATE,
    SUMMER_RATE,
    OFFPEAK_RATE,
];

/// Variables sampled only when expense variation is enabled.
pub const EXPENSE_VARIABLES: [&str; 2] = [ELECTRICITY_INTERNET_ANNUAL, MAINTENANCE_RATE];

/// Variables held at their base value unless the caller releases them.
pub const DEFAULT_FIXED_PARAMETERS: [&str; 4] = [
    INTEREST_RATE,
    MANAGEMENT_FEE,
    OWNER_NIGHTS,
    NUBBING_COSTS_ANNUAL,
];

// ── Registry ──────────────────────────────────────────────────────────────────

/// Named distributions and their correlation structure.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionRegistry {
    specs: Vec<DistributionSpec>,
    correlation: CorrelationMatrix,
}

impl DistributionRegistry {
    /// Create a registry. Every correlated name must have a spec.
    pub fn new(specs: Vec<DistributionSpec>, correlation: CorrelationMatrix) -> Result<Self> {
        let mut names = HashSet::with_capacity(specs.len());
        for spec in &specs {
            ensure_config!(
                names.insert(spec.name().to_string()),
                "variable '{}' is declared twice",
                spec.name()
            );
        }
        for name in correlation.names() {
            ensure_config!(
                names.contains(name),
                "correlated variable '{name}' has no distribution"
            );
        }
        Ok(Self { specs, correlation })
    }

    /// Independent variables: identity correlation.
    pub fn independent(specs: Vec<DistributionSpec>) -> Result<Self> {
        let names: Vec<&str> = specs.iter().map(DistributionSpec::name).collect();
        let correlation = CorrelationMatrix::identity(&names)?;
        Self::new(specs, correlation)
    }

    /// The reference catalog of 23 variables with its default correlations.
    pub fn reference() -> Result<Self> {
        let specs = reference_catalog()?;
        let names: Vec<&str> = specs.iter().map(DistributionSpec::name).collect();
        let correlation = CorrelationMatrix::from_pairs(&names, &REFERENCE_CORRELATIONS)?;
        Self::new(specs, correlation)
    }

    /// All specs, in declaration order.
    pub fn specs(&self) -> &[DistributionSpec] {
        &self.specs
    }

    /// The spec named `name`.
    pub fn get(&self, name: &str) -> Option<&DistributionSpec> {
        self.specs.iter().find(|s| s.name() == name)
    }

    /// The full correlation matrix.
    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    /// Names of the variables a run with `settings` samples, in declaration
    /// order.
    ///
    /// Seasonal and expense variables drop out when their toggle is off, and
    /// fixed variables always do. Naming an unknown fixed variable is a
    /// configuration error.
    pub fn active_names(&self, settings: &SimulationSettings) -> Result<Vec<String>> {
        for name in &settings.fixed_parameters {
            ensure_config!(
                self.get(name).is_some(),
                "fixed parameter '{name}' is not a registered variable"
            );
        }
        Ok(self
            .specs
            .iter()
            .map(DistributionSpec::name)
            .filter(|name| {
                !settings.is_fixed(name)
                    && (settings.use_seasonality || !SEASONAL_VARIABLES.contains(name))
                    && (settings.use_expense_variation || !EXPENSE_VARIABLES.contains(name))
            })
            .map(str::to_string)
            .collect())
    }

    /// Specs of the active variables.
    pub fn active_specs(&self, settings: &SimulationSettings) -> Result<Vec<DistributionSpec>> {
        let active = self.active_names(settings)?;
        Ok(self
            .specs
            .iter()
            .filter(|s| active.iter().any(|a| a == s.name()))
            .cloned()
            .collect())
    }

    /// Correlation over the active variables, or `None` when correlations
    /// are disabled.
    pub fn active_correlation(
        &self,
        settings: &SimulationSettings,
    ) -> Result<Option<CorrelationMatrix>> {
        if !settings.use_correlations {
            return Ok(None);
        }
        let active = self.active_names(settings)?;
        Ok(Some(self.correlation.restricted_to(&active)?))
    }

    /// Copy in which every variable is a point mass at its point estimate.
    pub fn pinned_to_point_estimates(&self) -> Result<Self> {
        let specs = self
            .specs
            .iter()
            .map(|s| {
                let m = s.point_estimate();
                s.with_bounds(Some((m, m)))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(specs, self.correlation.clone())
    }
}

// ── Reference catalog ─────────────────────────────────────────────────────────

const REFERENCE_CORRELATIONS: [(&str, &str, Real); 17] = [
    (OCCUPANCY_RATE, DAILY_RATE, 0.4),
    (WINTER_OCCUPANCY, WINTER_RATE, 0.5),
    (SUMMER_OCCUPANCY, SUMMER_RATE, 0.5),
    (OFFPEAK_OCCUPANCY, OFFPEAK_RATE, 0.5),
    (WINTER_OCCUPANCY, SUMMER_OCCUPANCY, 0.3),
    (WINTER_RATE, SUMMER_RATE, 0.2),
    (INFLATION_RATE, PROPERTY_APPRECIATION, 0.2),
    (ELECTRICITY_INTERNET_ANNUAL, INFLATION_RATE, 0.3),
    (MAINTENANCE_RATE, INFLATION_RATE, 0.3),
    (OCCUPANCY_RATE, OTA_BOOKING_PERCENTAGE, -0.3),
    (OTA_BOOKING_PERCENTAGE, OTA_FEE_RATE, 0.1),
    (DAILY_RATE, AVERAGE_LENGTH_OF_STAY, -0.2),
    (OCCUPANCY_RATE, CLEANING_COST_PER_STAY, 0.4),
    (AVERAGE_LENGTH_OF_STAY, CLEANING_COST_PER_STAY, -0.3),
    (AVG_GUESTS_PER_NIGHT, CLEANING_COST_PER_STAY, 0.2),
    (INTEREST_RATE, DISCOUNT_RATE, 0.5),
    (PROPERTY_APPRECIATION, MARGINAL_TAX_RATE, 0.1),
];

fn reference_catalog() -> Result<Vec<DistributionSpec>> {
    use Distribution::{Beta, LogNormal, Normal, Triangular};

    let spec = |name: &str, d: Distribution, bounds: Option<(Real, Real)>| {
        DistributionSpec::new(name, d, bounds)
    };
    let normal = |mean, std| Normal { mean, std };
    let tri = |min, mode, max| Triangular { min, mode, max };
    let lognormal = |median: Real, sigma| LogNormal {
        mu: median.ln(),
        sigma,
    };

    vec![
        spec(
            OCCUPANCY_RATE,
            Beta {
                alpha: 2.5,
                beta: 1.8,
                min: 0.30,
                max: 0.75,
            },
            None,
        ),
        spec(DAILY_RATE, lognormal(300.0, 0.25), Some((150.0, 450.0))),
        spec(WINTER_OCCUPANCY, tri(0.60, 0.75, 0.90), None),
        spec(SUMMER_OCCUPANCY, tri(0.50, 0.65, 0.80), None),
        spec(OFFPEAK_OCCUPANCY, tri(0.35, 0.50, 0.65), None),
        spec(WINTER_RATE, normal(250.0, 40.0), Some((180.0, 350.0))),
        spec(SUMMER_RATE, normal(200.0, 30.0), Some((150.0, 280.0))),
        spec(OFFPEAK_RATE, normal(150.0, 25.0), Some((100.0, 220.0))),
        spec(INTEREST_RATE, normal(0.02, 0.005), Some((0.01, 0.04))),
        spec(MANAGEMENT_FEE, tri(0.18, 0.20, 0.35), None),
        spec(OWNER_NIGHTS, normal(5.0, 1.0), Some((3.0, 8.0))),
        spec(NUBBING_COSTS_ANNUAL, lognormal(2_000.0, 0.2), Some((1_200.0, 3_500.0))),
        spec(
            ELECTRICITY_INTERNET_ANNUAL,
            lognormal(1_000.0, 0.2),
            Some((600.0, 2_000.0)),
        ),
        spec(MAINTENANCE_RATE, normal(0.01, 0.003), Some((0.005, 0.02))),
        spec(INFLATION_RATE, normal(0.015, 0.0075), Some((0.0, 0.03))),
        spec(PROPERTY_APPRECIATION, normal(0.035, 0.0275), Some((-0.02, 0.09))),
        spec(
            OTA_BOOKING_PERCENTAGE,
            Beta {
                alpha: 3.0,
                beta: 3.0,
                min: 0.30,
                max: 0.70,
            },
            None,
        ),
        spec(OTA_FEE_RATE, tri(0.25, 0.30, 0.35), None),
        spec(AVERAGE_LENGTH_OF_STAY, lognormal(1.7, 0.15), Some((1.0, 3.0))),
        spec(AVG_GUESTS_PER_NIGHT, normal(2.0, 0.3), Some((1.0, 4.0))),
        spec(CLEANING_COST_PER_STAY, normal(100.0, 15.0), Some((60.0, 130.0))),
        spec(MARGINAL_TAX_RATE, tri(0.25, 0.30, 0.35), None),
        spec(DISCOUNT_RATE, normal(0.03, 0.005), Some((0.02, 0.05))),
    ]
    .into_iter()
    .collect()
}
