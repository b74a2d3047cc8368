//! # pm-projection
//!
//! The financial projection engine the Monte Carlo simulation drives: an
//! immutable [`PropertyConfig`] describing financing, rental, expense, and
//! operating assumptions, a [`ProjectionEngine`] that turns one year's
//! resolved inputs into revenue, expenses, debt service, and cash flow, and
//! the discounted-cash-flow [`ReturnMetrics`] (NPV and IRR).
//!
//! The engine is stateless: everything carried from one year to the next
//! (loan balance, effective interest rate) is threaded by the caller.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Property configuration and its base case.
pub mod config;

/// Deterministic multi-year projection with constant growth rates.
pub mod deterministic;

/// The yearly projection engine.
pub mod engine;

/// NPV and IRR.
pub mod metrics;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use config::{
    ExpenseParameters, FinancingParameters, GrowthAssumptions, OperatingParameters,
    PropertyConfig, RentalParameters, Season,
};
pub use deterministic::{
    deterministic_projection, growth_factors, owner_cash_flows, sale_proceeds_per_owner,
    Projection,
};
pub use engine::{ProjectionEngine, PropertyProjection, YearInputs, YearResult};
pub use metrics::{internal_rate_of_return, net_present_value, ReturnMetrics};
