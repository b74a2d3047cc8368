//! The yearly projection engine.

use crate::config::PropertyConfig;
use crate::metrics::ReturnMetrics;
use pm_core::{Amount, Rate, Real, Year};
use serde::Serialize;

/// Everything needed to project one year.
///
/// The engine keeps no state between calls, so the caller threads the loan
/// balance and the effective interest rate from one year to the next.
#[derive(Debug, Clone, Copy)]
pub struct YearInputs<'a> {
    /// Resolved configuration for the trial.
    pub config: &'a PropertyConfig,
    /// Projection year, starting at 1.
    pub year: Year,
    /// Cumulative price-level factor relative to year 1.
    pub inflation_factor: Real,
    /// Cumulative property-value factor relative to year 1.
    pub appreciation_factor: Real,
    /// Market-shock multiplier on booked nights.
    pub occupancy_multiplier: Real,
    /// Market-shock multiplier on nightly rates.
    pub rate_multiplier: Real,
    /// Market-shock multiplier on the property value.
    pub value_multiplier: Real,
    /// Mortgage rate in force this year.
    pub interest_rate: Rate,
    /// Loan balance at the start of the year.
    pub opening_balance: Amount,
    /// One-off major maintenance spend.
    pub major_maintenance: Amount,
    /// One-off refinancing fee.
    pub refinancing_cost: Amount,
}

impl<'a> YearInputs<'a> {
    /// Year 1 with no growth, no shocks, and no one-off costs.
    pub fn first_year(config: &'a PropertyConfig) -> Self {
        Self {
            config,
            year: 1,
            inflation_factor: 1.0,
            appreciation_factor: 1.0,
            occupancy_multiplier: 1.0,
            rate_multiplier: 1.0,
            value_multiplier: 1.0,
            interest_rate: config.financing.interest_rate,
            opening_balance: config.financing.loan_amount(),
            major_maintenance: 0.0,
            refinancing_cost: 0.0,
        }
    }
}

/// One projected year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearResult {
    /// Projection year.
    pub year: Year,
    /// Booked nights.
    pub rented_nights: Real,
    /// Rental income before platform fees.
    pub gross_rental_income: Amount,
    /// Platform commissions.
    pub ota_fees: Amount,
    /// Rental income after platform fees.
    pub net_rental_income: Amount,
    /// Cleaning between stays.
    pub cleaning_cost: Amount,
    /// Management fee.
    pub management_cost: Amount,
    /// Tourist tax.
    pub tourist_tax: Amount,
    /// Insurance.
    pub insurance: Amount,
    /// Shared building charges.
    pub nubbing_costs: Amount,
    /// Electricity and internet.
    pub electricity_internet: Amount,
    /// Maintenance reserve on the current property value.
    pub maintenance_reserve: Amount,
    /// One-off major maintenance.
    pub major_maintenance: Amount,
    /// One-off refinancing fee.
    pub refinancing_cost: Amount,
    /// Total operating expenses.
    pub operating_expenses: Amount,
    /// Net operating income.
    pub net_operating_income: Amount,
    /// Interest paid on the opening balance.
    pub interest: Amount,
    /// Principal repaid.
    pub amortization: Amount,
    /// Interest plus principal.
    pub debt_service: Amount,
    /// Pre-tax cash flow after debt service.
    pub cash_flow: Amount,
    /// Pre-tax cash flow per owner.
    pub cash_flow_per_owner: Amount,
    /// Tax due on operating income net of interest.
    pub tax_liability: Amount,
    /// Cash flow plus the tax benefit of deductible interest.
    pub after_tax_cash_flow: Amount,
    /// After-tax cash flow per owner.
    pub after_tax_cash_flow_per_owner: Amount,
    /// Property value at the end of the year.
    pub property_value: Amount,
    /// Loan balance at the start of the year.
    pub loan_balance_start: Amount,
    /// Loan balance at the end of the year.
    pub loan_balance_end: Amount,
}

impl YearResult {
    /// Total revenue (gross rental income).
    pub fn revenue(&self) -> Amount {
        self.gross_rental_income
    }

    /// Platform fees plus operating expenses.
    pub fn expenses(&self) -> Amount {
        self.ota_fees + self.operating_expenses
    }
}

/// A deterministic financial projection.
///
/// Implementations must be pure: the same inputs always give the same
/// result, and nothing is remembered between calls.
pub trait ProjectionEngine: Send + Sync {
    /// Project one year.
    fn compute_year(&self, inputs: &YearInputs<'_>) -> YearResult;

    /// Discounted-cash-flow metrics for a per-owner flow sequence.
    ///
    /// `cash_flows[0]` is the year-0 flow (the negative initial
    /// investment); `cash_flows[t]` is year `t`. The terminal sale proceeds
    /// arrive with the last flow.
    fn compute_return_metrics(
        &self,
        cash_flows: &[Amount],
        terminal_sale_proceeds: Amount,
        discount_rate: Rate,
    ) -> ReturnMetrics {
        ReturnMetrics::compute(cash_flows, terminal_sale_proceeds, discount_rate)
    }
}

/// The property accounting used by the simulation.
///
/// Revenue scales with inflation and the shock multipliers; cleaning and
/// tourist tax follow booked nights and index with inflation; fixed costs
/// index with inflation; the maintenance reserve follows the appreciated
/// property value. Interest accrues on the opening balance at the year's
/// effective rate; amortization is a fixed share of the initial loan and
/// never exceeds the outstanding balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyProjection;

impl ProjectionEngine for PropertyProjection {
    fn compute_year(&self, inputs: &YearInputs<'_>) -> YearResult {
        let config = inputs.config;
        let f = &config.financing;
        let e = &config.expenses;
        let o = &config.operating;
        let inflation = inputs.inflation_factor;

        let base_nights = config.rental.rented_nights(f.num_owners);
        let rented_nights = base_nights * inputs.occupancy_multiplier;
        let gross_rental_income = config.rental.gross_rental_income(f.num_owners)
            * inflation
            * inputs.occupancy_multiplier
            * inputs.rate_multiplier;
        let ota_fees = gross_rental_income * o.effective_ota_fee_rate();
        let net_rental_income = gross_rental_income - ota_fees;

        let cleaning_cost = if e.cleaning_cost_per_stay > 0.0 {
            rented_nights / e.average_length_of_stay * e.cleaning_cost_per_stay * inflation
        } else {
            0.0
        };
        let management_cost = (net_rental_income - cleaning_cost) * e.management_fee_rate;
        let tourist_tax =
            rented_nights * e.avg_guests_per_night * e.tourist_tax_per_person_per_night * inflation;
        let insurance = e.insurance_annual * inflation;
        let nubbing_costs = e.nubbing_costs_annual * inflation;
        let electricity_internet = e.electricity_internet_annual * inflation;

        let property_value =
            f.purchase_price * inputs.appreciation_factor * inputs.value_multiplier;
        let maintenance_reserve = property_value * e.maintenance_rate;

        let operating_expenses = management_cost
            + cleaning_cost
            + tourist_tax
            + insurance
            + nubbing_costs
            + electricity_internet
            + maintenance_reserve
            + inputs.major_maintenance
            + inputs.refinancing_cost;
        let net_operating_income = net_rental_income - operating_expenses;

        let opening = inputs.opening_balance.max(0.0);
        let interest = opening * inputs.interest_rate;
        let amortization = f.annual_amortization().min(opening);
        let debt_service = interest + amortization;

        let cash_flow = net_operating_income - debt_service;
        let owners = f.owners();
        let tax_liability = (net_operating_income - interest).max(0.0) * o.marginal_tax_rate;
        let tax_savings = interest * o.marginal_tax_rate;
        let after_tax_cash_flow = cash_flow + tax_savings;

        YearResult {
            year: inputs.year,
            rented_nights,
            gross_rental_income,
            ota_fees,
            net_rental_income,
            cleaning_cost,
            management_cost,
            tourist_tax,
            insurance,
            nubbing_costs,
            electricity_internet,
            maintenance_reserve,
            major_maintenance: inputs.major_maintenance,
            refinancing_cost: inputs.refinancing_cost,
            operating_expenses,
            net_operating_income,
            interest,
            amortization,
            debt_service,
            cash_flow,
            cash_flow_per_owner: cash_flow / owners,
            tax_liability,
            after_tax_cash_flow,
            after_tax_cash_flow_per_owner: after_tax_cash_flow / owners,
            property_value,
            loan_balance_start: opening,
            loan_balance_end: opening - amortization,
        }
    }
}
