//! The Trial Executor.
//!
//! A trial overrides the base configuration with its sampled draws, runs
//! the projection engine year by year under its own inflation and
//! appreciation paths and event calendar, and reduces the resulting
//! per-owner cash flows to NPV and IRRs.

use crate::events::{generate_events, EventCalendar, MarketShock, ShockMultipliers};
use crate::orchestrator::ExecutionScope;
use crate::registry::*;
use crate::settings::SimulationSettings;
use crate::time_series::{generate_series, SeriesPair};
use pm_core::{
    ensure,
    errors::{Error, Result},
    Amount, Rate, Real, Size, Year,
};
use pm_math::{MersenneTwisterUniformRng, SampleRow, Stream};
use pm_projection::{
    growth_factors, owner_cash_flows, sale_proceeds_per_owner, PropertyConfig, ProjectionEngine,
    YearInputs,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

// ── Output names ──────────────────────────────────────────────────────────────

/// Output metric: per-owner net present value.
pub const NPV: &str = "npv";
/// Output metric: per-owner IRR including the terminal sale.
pub const IRR_WITH_SALE: &str = "irr_with_sale";
/// Output metric: per-owner IRR of operating cash flows only.
pub const IRR_WITHOUT_SALE: &str = "irr_without_sale";

// ── TrialResult ───────────────────────────────────────────────────────────────

/// One trial's sampled inputs and derived outputs.
///
/// The year-1 figures describe the resolved configuration before any
/// growth or event; the horizon figures describe the end of the trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialResult {
    /// Position of the trial in the run.
    pub trial_index: Size,
    /// Sampled value of every active variable.
    pub inputs: BTreeMap<String, Real>,
    /// Per-owner net present value.
    pub npv: Amount,
    /// Per-owner IRR with the terminal sale; `None` when undefined.
    pub irr_with_sale: Option<Rate>,
    /// Per-owner IRR without the terminal sale; `None` when undefined.
    pub irr_without_sale: Option<Rate>,
    /// Year-1 pre-tax cash flow of the whole property.
    pub annual_cash_flow: Amount,
    /// Year-1 pre-tax cash flow per owner.
    pub cash_flow_per_owner: Amount,
    /// Year-1 after-tax cash flow per owner.
    pub after_tax_cash_flow_per_owner: Amount,
    /// Year-1 gross rental income.
    pub gross_rental_income: Amount,
    /// Year-1 net operating income.
    pub net_operating_income: Amount,
    /// Property value at the horizon.
    pub final_property_value: Amount,
    /// Loan balance at the horizon.
    pub final_loan_balance: Amount,
    /// Net sale proceeds per owner at the horizon.
    pub sale_proceeds_per_owner: Amount,
    /// Major maintenance events over the horizon.
    pub maintenance_events: u32,
    /// Market shocks over the horizon.
    pub market_shocks: u32,
    /// Refinancings over the horizon.
    pub refinancings: u32,
}

impl TrialResult {
    /// Every numeric output, keyed by metric name. IRRs may be undefined.
    pub fn outputs(&self) -> [(&'static str, Option<Real>); 14] {
        [
            (NPV, Some(self.npv)),
            (IRR_WITH_SALE, self.irr_with_sale),
            (IRR_WITHOUT_SALE, self.irr_without_sale),
            ("annual_cash_flow", Some(self.annual_cash_flow)),
            ("cash_flow_per_owner", Some(self.cash_flow_per_owner)),
            ("after_tax_cash_flow_per_owner", Some(self.after_tax_cash_flow_per_owner)),
            ("gross_rental_income", Some(self.gross_rental_income)),
            ("net_operating_income", Some(self.net_operating_income)),
            ("final_property_value", Some(self.final_property_value)),
            ("final_loan_balance", Some(self.final_loan_balance)),
            ("sale_proceeds_per_owner", Some(self.sale_proceeds_per_owner)),
            ("maintenance_events", Some(Real::from(self.maintenance_events))),
            ("market_shocks", Some(Real::from(self.market_shocks))),
            ("refinancings", Some(Real::from(self.refinancings))),
        ]
    }

    /// `true` when the IRR with sale is defined.
    pub fn has_defined_irr(&self) -> bool {
        self.irr_with_sale.is_some()
    }
}

// ── Configuration resolution ──────────────────────────────────────────────────

fn assign(draws: &BTreeMap<String, Real>, name: &str, field: &mut Real) {
    if let Some(&value) = draws.get(name) {
        *field = value;
    }
}

/// Apply one trial's draws to the base configuration.
///
/// Variables without a draw keep the base value. Seasonal draws go to the
/// seasons by position (winter, summer, off-peak); without seasonality the
/// seasons are dropped and the flat occupancy and daily rate apply.
/// Sampled inflation and appreciation become the configuration's growth
/// assumptions.
pub fn resolve_configuration(
    base: &PropertyConfig,
    draws: &BTreeMap<String, Real>,
    settings: &SimulationSettings,
) -> PropertyConfig {
    let mut c = if settings.use_seasonality {
        base.clone()
    } else {
        base.without_seasons()
    };

    assign(draws, OCCUPANCY_RATE, &mut c.rental.occupancy_rate);
    assign(draws, DAILY_RATE, &mut c.rental.average_daily_rate);
    assign(draws, OWNER_NIGHTS, &mut c.rental.owner_nights_per_owner);
    let seasonal = [
        (WINTER_OCCUPANCY, WINTER_RATE),
        (SUMMER_OCCUPANCY, SUMMER_RATE),
        (OFFPEAK_OCCUPANCY, OFFPEAK_RATE),
    ];
    for (season, (occupancy, rate)) in c.rental.seasons.iter_mut().zip(seasonal) {
        assign(draws, occupancy, &mut season.occupancy_rate);
        assign(draws, rate, &mut season.average_daily_rate);
    }

    assign(draws, INTEREST_RATE, &mut c.financing.interest_rate);

    let e = &mut c.expenses;
    assign(draws, MANAGEMENT_FEE, &mut e.management_fee_rate);
    assign(draws, NUBBING_COSTS_ANNUAL, &mut e.nubbing_costs_annual);
    assign(draws, ELECTRICITY_INTERNET_ANNUAL, &mut e.electricity_internet_annual);
    assign(draws, MAINTENANCE_RATE, &mut e.maintenance_rate);
    assign(draws, AVERAGE_LENGTH_OF_STAY, &mut e.average_length_of_stay);
    assign(draws, AVG_GUESTS_PER_NIGHT, &mut e.avg_guests_per_night);
    assign(draws, CLEANING_COST_PER_STAY, &mut e.cleaning_cost_per_stay);

    let o = &mut c.operating;
    assign(draws, OTA_BOOKING_PERCENTAGE, &mut o.ota_booking_percentage);
    assign(draws, OTA_FEE_RATE, &mut o.ota_fee_rate);
    assign(draws, MARGINAL_TAX_RATE, &mut o.marginal_tax_rate);
    assign(draws, DISCOUNT_RATE, &mut o.discount_rate);

    assign(draws, INFLATION_RATE, &mut c.growth.inflation_rate);
    assign(draws, PROPERTY_APPRECIATION, &mut c.growth.appreciation_rate);
    c
}

// ── TrialExecutor ─────────────────────────────────────────────────────────────

/// Runs single trials against a shared, read-only base configuration.
///
/// The executor carries the [`ExecutionScope`] its trials run in. Work a
/// trial starts of its own must honour it and stay sequential in
/// [`ExecutionScope::Worker`].
#[derive(Clone, Copy)]
pub struct TrialExecutor<'a> {
    engine: &'a dyn ProjectionEngine,
    base: &'a PropertyConfig,
    settings: &'a SimulationSettings,
    scope: ExecutionScope,
}

impl<'a> TrialExecutor<'a> {
    /// Create an executor whose trials run in worker scope.
    pub fn new(
        engine: &'a dyn ProjectionEngine,
        base: &'a PropertyConfig,
        settings: &'a SimulationSettings,
    ) -> Self {
        Self {
            engine,
            base,
            settings,
            scope: ExecutionScope::Worker,
        }
    }

    /// Set the scope trials run in.
    pub fn with_scope(mut self, scope: ExecutionScope) -> Self {
        self.scope = scope;
        self
    }

    /// The scope trials run in.
    pub fn scope(&self) -> ExecutionScope {
        self.scope
    }

    /// Run the trial of `row` with its paths and events drawn from
    /// generators seeded by `(settings.seed, row.index())`.
    pub fn execute(&self, row: &SampleRow<'_>) -> Result<TrialResult> {
        let draws = row.to_map();
        let resolved = resolve_configuration(self.base, &draws, self.settings);
        let seed = self.settings.seed;
        let index = row.index() as u64;
        let years = self.settings.horizon_years as Size;

        let growth = &resolved.growth;
        let inflation = generate_series(
            growth.inflation_rate,
            growth.inflation_rate,
            &self.settings.inflation,
            years,
            &mut MersenneTwisterUniformRng::for_trial(seed, index, Stream::Inflation),
        )?;
        let appreciation = generate_series(
            growth.appreciation_rate,
            growth.appreciation_rate,
            &self.settings.appreciation,
            years,
            &mut MersenneTwisterUniformRng::for_trial(seed, index, Stream::Appreciation),
        )?;
        let events = generate_events(
            self.settings.horizon_years,
            &resolved.financing,
            &self.settings.events,
            &mut MersenneTwisterUniformRng::for_trial(seed, index, Stream::Events),
        )?;

        let series = SeriesPair {
            inflation,
            appreciation,
        };
        self.project(row.index(), draws, &resolved, &series, &events)
    }

    /// Run trial `trial_index` with caller-supplied paths and events.
    ///
    /// Both paths must cover the configured horizon.
    pub fn run_trial(
        &self,
        trial_index: Size,
        row: &SampleRow<'_>,
        series: &SeriesPair,
        events: &EventCalendar,
    ) -> Result<TrialResult> {
        let draws = row.to_map();
        let resolved = resolve_configuration(self.base, &draws, self.settings);
        self.project(trial_index, draws, &resolved, series, events)
    }

    fn project(
        &self,
        trial_index: Size,
        inputs: BTreeMap<String, Real>,
        resolved: &PropertyConfig,
        series: &SeriesPair,
        events: &EventCalendar,
    ) -> Result<TrialResult> {
        let horizon = self.settings.horizon_years as Size;
        ensure!(
            series.inflation.len() == horizon && series.appreciation.len() == horizon,
            "paths of {} and {} years for a {horizon}-year horizon",
            series.inflation.len(),
            series.appreciation.len()
        );

        let inflation = growth_factors(series.inflation.values());
        let appreciation = growth_factors(series.appreciation.values());

        let mut years = Vec::with_capacity(horizon);
        let mut balance = resolved.financing.loan_amount();
        let mut rate = resolved.financing.interest_rate;
        let mut shock: Option<(Year, MarketShock)> = None;

        for (idx, (&inflation_factor, &appreciation_factor)) in
            inflation.iter().zip(&appreciation).enumerate()
        {
            let year = idx as Year + 1;
            let today = events.get(year).copied().unwrap_or_default();

            if let Some(s) = today.market_shock {
                shock = Some((year, s));
            }
            let m = shock.map_or(ShockMultipliers::NEUTRAL, |(start, s)| {
                s.multipliers(year - start)
            });

            let mut refinancing_cost = 0.0;
            if let Some(r) = today.refinance {
                rate = r.new_rate;
                refinancing_cost = r.refinance_cost;
            }

            let result = self.engine.compute_year(&YearInputs {
                config: resolved,
                year,
                inflation_factor,
                appreciation_factor,
                occupancy_multiplier: m.occupancy,
                rate_multiplier: m.rate,
                value_multiplier: m.value,
                interest_rate: rate,
                opening_balance: balance,
                major_maintenance: today.maintenance.map_or(0.0, |e| e.cost),
                refinancing_cost,
            });
            balance = result.loan_balance_end;
            years.push(result);
        }

        let last = years
            .last()
            .ok_or_else(|| Error::Postcondition("trial produced no years".into()))?;
        let sale_proceeds = sale_proceeds_per_owner(resolved, last);
        let flows = owner_cash_flows(resolved.financing.initial_investment_per_owner(), &years);
        let metrics = self.engine.compute_return_metrics(
            &flows,
            sale_proceeds,
            resolved.operating.discount_rate,
        );
        if metrics.irr_with_sale.is_none() {
            debug!(trial = trial_index, npv = metrics.npv, "IRR undefined");
        }

        let first = self.engine.compute_year(&YearInputs::first_year(resolved));
        let counts = events.counts();
        Ok(TrialResult {
            trial_index,
            inputs,
            npv: metrics.npv,
            irr_with_sale: metrics.irr_with_sale,
            irr_without_sale: metrics.irr_without_sale,
            annual_cash_flow: first.cash_flow,
            cash_flow_per_owner: first.cash_flow_per_owner,
            after_tax_cash_flow_per_owner: first.after_tax_cash_flow_per_owner,
            gross_rental_income: first.gross_rental_income,
            net_operating_income: first.net_operating_income,
            final_property_value: last.property_value,
            final_loan_balance: last.loan_balance_end,
            sale_proceeds_per_owner: sale_proceeds,
            maintenance_events: counts.maintenance,
            market_shocks: counts.market_shocks,
            refinancings: counts.refinancings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, MaintenanceEvent, RefinanceEvent};
    use crate::settings::EventParameters;
    use crate::time_series::TimeSeries;
    use approx::assert_abs_diff_eq;
    use pm_math::SampleSet;
    use pm_projection::{deterministic_projection, PropertyProjection};

    fn quiet_settings() -> SimulationSettings {
        SimulationSettings {
            events: EventParameters::disabled(),
            inflation: SimulationSettings::default().inflation.without_noise(),
            appreciation: SimulationSettings::default().appreciation.without_noise(),
            ..SimulationSettings::default()
        }
    }

    fn one_row(pairs: &[(&str, Real)]) -> SampleSet {
        SampleSet::new(
            pairs.iter().map(|(n, _)| n.to_string()).collect(),
            pairs.iter().map(|&(_, v)| vec![v]).collect(),
        )
        .unwrap()
    }

    fn flat_series(config: &PropertyConfig, years: Size) -> SeriesPair {
        SeriesPair {
            inflation: TimeSeries::constant(config.growth.inflation_rate, years),
            appreciation: TimeSeries::constant(config.growth.appreciation_rate, years),
        }
    }

    #[test]
    fn resolution_overrides_only_drawn_fields() {
        let base = PropertyConfig::base_case();
        let settings = SimulationSettings::default();
        let draws = BTreeMap::from([
            (SUMMER_OCCUPANCY.to_string(), 0.7),
            (DISCOUNT_RATE.to_string(), 0.04),
            (INFLATION_RATE.to_string(), 0.02),
        ]);
        let c = resolve_configuration(&base, &draws, &settings);
        assert_eq!(c.rental.seasons[1].occupancy_rate, 0.7);
        assert_eq!(c.rental.seasons[0], base.rental.seasons[0]);
        assert_eq!(c.operating.discount_rate, 0.04);
        assert_eq!(c.growth.inflation_rate, 0.02);
        assert_eq!(c.financing, base.financing);
        assert_eq!(c.expenses, base.expenses);
    }

    #[test]
    fn resolution_without_seasonality_uses_flat_model() {
        let base = PropertyConfig::base_case();
        let settings = SimulationSettings {
            use_seasonality: false,
            ..SimulationSettings::default()
        };
        let draws = BTreeMap::from([(OCCUPANCY_RATE.to_string(), 0.55)]);
        let c = resolve_configuration(&base, &draws, &settings);
        assert!(!c.rental.is_seasonal());
        assert_eq!(c.rental.occupancy_rate, 0.55);
    }

    #[test]
    fn quiet_trial_matches_deterministic_projection() {
        let base = PropertyConfig::base_case();
        let settings = quiet_settings();
        let set = one_row(&[(OCCUPANCY_RATE, 0.5), (DISCOUNT_RATE, 0.035)]);
        let row = set.row(0).unwrap();
        let executor = TrialExecutor::new(&PropertyProjection, &base, &settings);
        let trial = executor.execute(&row).unwrap();

        let resolved = resolve_configuration(&base, &row.to_map(), &settings);
        let p = deterministic_projection(&PropertyProjection, &resolved, 15).unwrap();
        assert_eq!(trial.npv, p.metrics.npv);
        assert_eq!(trial.irr_with_sale, p.metrics.irr_with_sale);
        assert_eq!(trial.irr_without_sale, p.metrics.irr_without_sale);
        assert_eq!(trial.cash_flow_per_owner, p.years[0].cash_flow_per_owner);
        assert_eq!(trial.final_loan_balance, p.years[14].loan_balance_end);
        assert_eq!(trial.inputs.len(), 2);
        assert_eq!(trial.maintenance_events + trial.market_shocks + trial.refinancings, 0);
    }

    #[test]
    fn maintenance_lowers_npv_by_its_discounted_cost() {
        let base = PropertyConfig::base_case();
        let settings = quiet_settings();
        let set = one_row(&[(DISCOUNT_RATE, base.operating.discount_rate)]);
        let row = set.row(0).unwrap();
        let executor = TrialExecutor::new(&PropertyProjection, &base, &settings);
        let series = flat_series(&base, 15);

        let calm = executor
            .run_trial(0, &row, &series, &EventCalendar::new())
            .unwrap();
        let mut events = EventCalendar::new();
        events.insert(2, Event::Maintenance(MaintenanceEvent { cost: 20_000.0 }));
        let hit = executor.run_trial(0, &row, &series, &events).unwrap();

        let r = base.operating.discount_rate;
        let expected = 20_000.0 / base.financing.owners() / (1.0 + r).powi(2);
        assert_abs_diff_eq!(calm.npv - hit.npv, expected, epsilon = 1e-6);
        assert_eq!(hit.maintenance_events, 1);
    }

    #[test]
    fn refinancing_changes_rate_from_its_year_on() {
        let mut base = PropertyConfig::base_case();
        base.financing.interest_rate = 0.03;
        let settings = quiet_settings();
        let set = one_row(&[(DISCOUNT_RATE, 0.03)]);
        let row = set.row(0).unwrap();
        let executor = TrialExecutor::new(&PropertyProjection, &base, &settings);
        let series = flat_series(&base, 15);

        let mut events = EventCalendar::new();
        events.insert(
            3,
            Event::Refinance(RefinanceEvent {
                new_rate: 0.01,
                refinance_cost: 0.0,
            }),
        );
        let calm = executor
            .run_trial(0, &row, &series, &EventCalendar::new())
            .unwrap();
        let refinanced = executor.run_trial(0, &row, &series, &events).unwrap();
        assert!(refinanced.npv > calm.npv);
        assert_eq!(refinanced.final_loan_balance, calm.final_loan_balance);
        assert_eq!(refinanced.refinancings, 1);
    }

    #[test]
    fn shock_fades_and_then_leaves_no_trace_on_value() {
        let base = PropertyConfig::base_case();
        let settings = quiet_settings();
        let set = one_row(&[(DISCOUNT_RATE, 0.03)]);
        let row = set.row(0).unwrap();
        let executor = TrialExecutor::new(&PropertyProjection, &base, &settings);
        let series = flat_series(&base, 15);

        let mut events = EventCalendar::new();
        events.insert(
            5,
            Event::MarketShock(MarketShock {
                occupancy_multiplier: 0.5,
                rate_multiplier: 0.7,
                value_multiplier: 0.8,
                recovery_years: 2,
            }),
        );
        let calm = executor
            .run_trial(0, &row, &series, &EventCalendar::new())
            .unwrap();
        let shocked = executor.run_trial(0, &row, &series, &events).unwrap();
        assert!(shocked.npv < calm.npv);
        assert_eq!(shocked.final_property_value, calm.final_property_value);
        assert_eq!(shocked.market_shocks, 1);
    }

    #[test]
    fn short_paths_are_rejected() {
        let base = PropertyConfig::base_case();
        let settings = quiet_settings();
        let set = one_row(&[(DISCOUNT_RATE, 0.03)]);
        let row = set.row(0).unwrap();
        let executor = TrialExecutor::new(&PropertyProjection, &base, &settings);
        let err = executor
            .run_trial(0, &row, &flat_series(&base, 3), &EventCalendar::new())
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }
}
