//! Discounted-cash-flow metrics.
//!
//! Flows are annual and indexed by year: `flows[0]` is paid at year 0 and is
//! not discounted, `flows[t]` is discounted by `(1 + r)^t`.
//!
//! - `net_present_value`: present value at a flat annual rate
//! - `internal_rate_of_return`: rate at which the present value is zero
//! - `ReturnMetrics`: NPV and IRR with and without the terminal sale

use pm_core::{
    errors::{Error, Result},
    Amount, Rate, Real,
};
use pm_math::solvers1d::brent;
use serde::{Deserialize, Serialize};

/// Search interval for the internal rate of return.
const IRR_BRACKET: (Rate, Rate) = (-0.99, 10.0);
const IRR_ACCURACY: Real = 1.0e-10;

/// Net present value of annual flows at a flat rate.
pub fn net_present_value(flows: &[Amount], rate: Rate) -> Amount {
    let growth = 1.0 + rate;
    let mut discount = 1.0;
    let mut result = 0.0;
    for &flow in flows {
        result += flow / discount;
        discount *= growth;
    }
    result
}

/// Internal rate of return of annual flows.
///
/// Fails with [`Error::NumericDegeneracy`] when every flow has the same
/// sign, or when the present value does not change sign across
/// `[-99 %, 1000 %]`.
pub fn internal_rate_of_return(flows: &[Amount]) -> Result<Rate> {
    let has_inflow = flows.iter().any(|&f| f > 0.0);
    let has_outflow = flows.iter().any(|&f| f < 0.0);
    if !(has_inflow && has_outflow) {
        return Err(Error::NumericDegeneracy(
            "IRR undefined: cash flows do not change sign".into(),
        ));
    }
    let (lo, hi) = IRR_BRACKET;
    brent(|r| net_present_value(flows, r), lo, hi, IRR_ACCURACY).map_err(|e| {
        Error::NumericDegeneracy(format!("IRR undefined: no root in [{lo}, {hi}] ({e})"))
    })
}

/// Return metrics of one projection, per owner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    /// Net present value including the terminal sale.
    pub npv: Amount,
    /// IRR including the terminal sale; `None` when undefined.
    pub irr_with_sale: Option<Rate>,
    /// IRR of the operating flows only; `None` when undefined.
    pub irr_without_sale: Option<Rate>,
}

impl ReturnMetrics {
    /// Compute the metrics. The terminal sale proceeds are added to the
    /// last flow.
    pub fn compute(flows: &[Amount], terminal_sale_proceeds: Amount, discount_rate: Rate) -> Self {
        let mut with_sale = flows.to_vec();
        if let Some(last) = with_sale.last_mut() {
            *last += terminal_sale_proceeds;
        }
        Self {
            npv: net_present_value(&with_sale, discount_rate),
            irr_with_sale: internal_rate_of_return(&with_sale).ok(),
            irr_without_sale: internal_rate_of_return(flows).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn npv_discounts_from_year_zero() {
        let npv = net_present_value(&[-100.0, 110.0], 0.10);
        assert_abs_diff_eq!(npv, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(net_present_value(&[50.0], 0.5), 50.0, epsilon = 1e-12);
        assert_eq!(net_present_value(&[], 0.05), 0.0);
    }

    #[test]
    fn irr_of_simple_loan() {
        let irr = internal_rate_of_return(&[-1000.0, 50.0, 50.0, 1050.0]).unwrap();
        assert_abs_diff_eq!(irr, 0.05, epsilon = 1e-8);
    }

    #[test]
    fn irr_can_be_negative() {
        let irr = internal_rate_of_return(&[-1000.0, 100.0, 100.0, 600.0]).unwrap();
        assert!(irr < 0.0);
        assert_abs_diff_eq!(
            net_present_value(&[-1000.0, 100.0, 100.0, 600.0], irr),
            0.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn irr_undefined_without_sign_change() {
        let err = internal_rate_of_return(&[-100.0, -10.0, -5.0]).unwrap_err();
        assert!(matches!(err, Error::NumericDegeneracy(_)));
        assert!(internal_rate_of_return(&[]).is_err());
    }

    #[test]
    fn metrics_add_sale_to_last_flow() {
        let m = ReturnMetrics::compute(&[-1000.0, 50.0, 50.0], 1000.0, 0.05);
        assert_abs_diff_eq!(m.irr_with_sale.unwrap(), 0.05, epsilon = 1e-8);
        assert_abs_diff_eq!(m.npv, 0.0, epsilon = 1e-9);
        assert!(m.irr_without_sale.is_none() || m.irr_without_sale.unwrap() < 0.0);
    }
}
