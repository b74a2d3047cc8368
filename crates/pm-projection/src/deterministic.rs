//! Deterministic multi-year projection with constant growth rates.
//!
//! Runs the [`ProjectionEngine`] year by year under the configuration's
//! constant inflation and appreciation, with no shocks or one-off events.
//! The Monte Carlo trial with every input pinned to its base value and all
//! event rates at zero must reproduce this projection exactly.

use crate::config::PropertyConfig;
use crate::engine::{ProjectionEngine, YearInputs, YearResult};
use crate::metrics::ReturnMetrics;
use pm_core::{
    ensure_config,
    errors::{Error, Result},
    Amount, Rate, Real, Year,
};
use serde::Serialize;

/// Cumulative growth factors from a yearly rate path.
///
/// Element `t - 1` is the factor for year `t`: year 1 is `1.0` and year `t`
/// compounds the rates of years `1..t`. The last rate in `rates` only
/// matters for a year beyond the path, so it is not used.
pub fn growth_factors(rates: &[Rate]) -> Vec<Real> {
    let mut factor = 1.0;
    rates
        .iter()
        .map(|&rate| {
            let current = factor;
            factor *= 1.0 + rate;
            current
        })
        .collect()
}

/// A complete deterministic projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    /// One result per year, year 1 first.
    pub years: Vec<YearResult>,
    /// Per-owner NPV and IRRs.
    pub metrics: ReturnMetrics,
    /// Net sale proceeds per owner at the horizon.
    pub sale_proceeds_per_owner: Amount,
    /// Cash each owner contributed at year 0.
    pub initial_investment_per_owner: Amount,
}

impl Projection {
    /// Per-owner flows with the negative initial investment at year 0.
    pub fn owner_cash_flows(&self) -> Vec<Amount> {
        owner_cash_flows(self.initial_investment_per_owner, &self.years)
    }
}

/// Per-owner flows with the negative initial investment at year 0.
pub fn owner_cash_flows(initial_investment: Amount, years: &[YearResult]) -> Vec<Amount> {
    std::iter::once(-initial_investment)
        .chain(years.iter().map(|y| y.cash_flow_per_owner))
        .collect()
}

/// Net proceeds per owner from selling at the end of `last`.
pub fn sale_proceeds_per_owner(config: &PropertyConfig, last: &YearResult) -> Amount {
    let f = &config.financing;
    let net_sale = last.property_value * (1.0 - f.selling_cost_rate);
    (net_sale - last.loan_balance_end) / f.owners()
}

/// Project `config` over `horizon` years at its constant growth rates.
pub fn deterministic_projection(
    engine: &dyn ProjectionEngine,
    config: &PropertyConfig,
    horizon: Year,
) -> Result<Projection> {
    config.validate()?;
    ensure_config!(horizon >= 1, "projection horizon must be at least one year");

    let n = horizon as usize;
    let inflation = growth_factors(&vec![config.growth.inflation_rate; n]);
    let appreciation = growth_factors(&vec![config.growth.appreciation_rate; n]);

    let mut years = Vec::with_capacity(n);
    let mut balance = config.financing.loan_amount();
    for (idx, (&inflation_factor, &appreciation_factor)) in
        inflation.iter().zip(&appreciation).enumerate()
    {
        let result = engine.compute_year(&YearInputs {
            year: idx as Year + 1,
            inflation_factor,
            appreciation_factor,
            opening_balance: balance,
            ..YearInputs::first_year(config)
        });
        balance = result.loan_balance_end;
        years.push(result);
    }

    let last = years
        .last()
        .ok_or_else(|| Error::Postcondition("projection produced no years".into()))?;
    let sale_proceeds = sale_proceeds_per_owner(config, last);
    let initial_investment = config.financing.initial_investment_per_owner();
    let flows = owner_cash_flows(initial_investment, &years);
    let metrics =
        engine.compute_return_metrics(&flows, sale_proceeds, config.operating.discount_rate);

    Ok(Projection {
        years,
        metrics,
        sale_proceeds_per_owner: sale_proceeds,
        initial_investment_per_owner: initial_investment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PropertyProjection;
    use approx::assert_abs_diff_eq;

    #[test]
    fn growth_factors_compound_from_year_two() {
        let f = growth_factors(&[0.10, 0.20, 0.50]);
        assert_eq!(f.len(), 3);
        assert_abs_diff_eq!(f[0], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(f[1], 1.1, epsilon = 1e-15);
        assert_abs_diff_eq!(f[2], 1.32, epsilon = 1e-12);
        assert!(growth_factors(&[]).is_empty());
    }

    #[test]
    fn base_case_projection() {
        let config = PropertyConfig::base_case();
        let p = deterministic_projection(&PropertyProjection, &config, 15).unwrap();

        assert_eq!(p.years.len(), 15);
        assert_eq!(p.years[14].year, 15);
        assert_abs_diff_eq!(
            p.years[14].loan_balance_end,
            975_000.0 - 15.0 * 9_750.0,
            epsilon = 1e-6
        );
        for pair in p.years.windows(2) {
            assert_abs_diff_eq!(
                pair[1].loan_balance_start,
                pair[0].loan_balance_end,
                epsilon = 1e-9
            );
            assert!(pair[1].property_value > pair[0].property_value);
        }
        assert_abs_diff_eq!(p.initial_investment_per_owner, 84_662.5, epsilon = 1e-6);

        let flows = p.owner_cash_flows();
        assert_eq!(flows.len(), 16);
        let mut with_sale = flows.clone();
        with_sale[15] += p.sale_proceeds_per_owner;
        assert_abs_diff_eq!(
            p.metrics.npv,
            crate::metrics::net_present_value(&with_sale, 0.03),
            epsilon = 1e-6
        );
        let irr = p.metrics.irr_with_sale.unwrap();
        assert_abs_diff_eq!(
            crate::metrics::net_present_value(&with_sale, irr),
            0.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn zero_horizon_is_a_configuration_error() {
        let config = PropertyConfig::base_case();
        let err = deterministic_projection(&PropertyProjection, &config, 0).unwrap_err();
        assert!(err.is_configuration());
    }
}
