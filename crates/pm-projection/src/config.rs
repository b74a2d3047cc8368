//! Property configuration.
//!
//! A [`PropertyConfig`] is an immutable value. Callers that need a variant
//! (a trial with sampled occupancy, a sensitivity point with a different
//! purchase price) build a new value from the base with struct-update
//! syntax or the `with_*` helpers; the base is never patched in place.

use pm_core::{ensure_config, errors::Result, Amount, Rate, Real, Year};
use serde::{Deserialize, Serialize};

/// Days per calendar month in a non-leap year.
const DAYS_PER_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

// ── Financing ─────────────────────────────────────────────────────────────────

/// Purchase and mortgage terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingParameters {
    /// Purchase price of the property.
    pub purchase_price: Amount,
    /// Loan-to-value ratio at purchase.
    pub loan_to_value: Rate,
    /// Initial mortgage interest rate.
    pub interest_rate: Rate,
    /// Annual amortization as a fraction of the initial loan.
    pub amortization_rate: Rate,
    /// Number of co-owners sharing equity and cash flows.
    pub num_owners: u32,
    /// One-off purchase costs (notary, land registry) as a fraction of price.
    pub acquisition_cost_rate: Rate,
    /// Costs of selling at the horizon (broker, notary, transfer tax) as a
    /// fraction of the sale price.
    pub selling_cost_rate: Rate,
}

impl FinancingParameters {
    /// Initial loan amount.
    pub fn loan_amount(&self) -> Amount {
        self.purchase_price * self.loan_to_value
    }

    /// Total equity contributed at purchase.
    pub fn equity_total(&self) -> Amount {
        self.purchase_price - self.loan_amount()
    }

    /// Acquisition costs paid at purchase.
    pub fn acquisition_costs_total(&self) -> Amount {
        self.purchase_price * self.acquisition_cost_rate
    }

    /// Cash each owner puts in at year 0: equity plus acquisition costs.
    pub fn initial_investment_per_owner(&self) -> Amount {
        (self.equity_total() + self.acquisition_costs_total()) / self.owners()
    }

    /// Amortization paid each year while the loan is outstanding.
    pub fn annual_amortization(&self) -> Amount {
        self.loan_amount() * self.amortization_rate
    }

    /// Outstanding balance at the start of `year` (year 1 opens at the full
    /// loan amount) under the scheduled amortization.
    pub fn balance_at_start_of(&self, year: Year) -> Amount {
        let paid = self.annual_amortization() * Real::from(year.saturating_sub(1));
        (self.loan_amount() - paid).max(0.0)
    }

    /// Number of owners as a real.
    pub fn owners(&self) -> Real {
        Real::from(self.num_owners)
    }
}

// ── Rental ────────────────────────────────────────────────────────────────────

/// One booking season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    /// Display name.
    pub name: String,
    /// Calendar months (1 = January) belonging to the season.
    pub months: Vec<u32>,
    /// Nights reserved for the owners within the season.
    pub owner_nights: u32,
    /// Share of rentable nights that are booked.
    pub occupancy_rate: Rate,
    /// Average daily rate charged to guests.
    pub average_daily_rate: Amount,
}

impl Season {
    /// Calendar nights in the season.
    pub fn calendar_nights(&self) -> u32 {
        self.months
            .iter()
            .filter_map(|&m| DAYS_PER_MONTH.get(m.wrapping_sub(1) as usize))
            .sum()
    }

    /// Nights available to guests.
    pub fn rentable_nights(&self) -> Real {
        Real::from(self.calendar_nights().saturating_sub(self.owner_nights))
    }

    /// Expected booked nights.
    pub fn rented_nights(&self) -> Real {
        self.rentable_nights() * self.occupancy_rate
    }

    /// Expected rental income.
    pub fn income(&self) -> Amount {
        self.rented_nights() * self.average_daily_rate
    }
}

/// Rental assumptions. With an empty `seasons` list the flat annual
/// occupancy and daily rate apply; otherwise the seasons do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalParameters {
    /// Nights each owner uses the property per year (flat model).
    pub owner_nights_per_owner: Real,
    /// Days in the rental year.
    pub days_per_year: u32,
    /// Annual occupancy of rentable nights (flat model).
    pub occupancy_rate: Rate,
    /// Average daily rate (flat model).
    pub average_daily_rate: Amount,
    /// Seasonal breakdown; empty for the flat model.
    pub seasons: Vec<Season>,
}

impl RentalParameters {
    /// `true` when the seasonal model is in effect.
    pub fn is_seasonal(&self) -> bool {
        !self.seasons.is_empty()
    }

    /// Expected booked nights per year.
    pub fn rented_nights(&self, num_owners: u32) -> Real {
        if self.is_seasonal() {
            self.seasons.iter().map(Season::rented_nights).sum()
        } else {
            let owner_nights = self.owner_nights_per_owner * Real::from(num_owners);
            (Real::from(self.days_per_year) - owner_nights).max(0.0) * self.occupancy_rate
        }
    }

    /// Expected gross rental income per year, before platform fees.
    pub fn gross_rental_income(&self, num_owners: u32) -> Amount {
        if self.is_seasonal() {
            self.seasons.iter().map(Season::income).sum()
        } else {
            self.rented_nights(num_owners) * self.average_daily_rate
        }
    }
}

// ── Expenses ──────────────────────────────────────────────────────────────────

/// Operating-expense assumptions, in year-1 money.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseParameters {
    /// Management fee on revenue after platform fees and cleaning.
    pub management_fee_rate: Rate,
    /// Cleaning cost per guest stay; 0 when included in the management fee.
    pub cleaning_cost_per_stay: Amount,
    /// Average nights per stay.
    pub average_length_of_stay: Real,
    /// Tourist tax per guest per night.
    pub tourist_tax_per_person_per_night: Amount,
    /// Average guests per booked night.
    pub avg_guests_per_night: Real,
    /// Annual building insurance.
    pub insurance_annual: Amount,
    /// Annual shared building charges (water, heating).
    pub nubbing_costs_annual: Amount,
    /// Annual electricity and internet.
    pub electricity_internet_annual: Amount,
    /// Maintenance reserve as a fraction of the current property value.
    pub maintenance_rate: Rate,
}

// ── Operating ─────────────────────────────────────────────────────────────────

/// Distribution-channel, tax, and valuation assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingParameters {
    /// Share of bookings made through online travel agencies.
    pub ota_booking_percentage: Rate,
    /// Commission charged by the agencies on those bookings.
    pub ota_fee_rate: Rate,
    /// Owners' marginal income-tax rate.
    pub marginal_tax_rate: Rate,
    /// Discount rate for net present value.
    pub discount_rate: Rate,
}

impl OperatingParameters {
    /// Platform fees as a share of gross rental income.
    pub fn effective_ota_fee_rate(&self) -> Rate {
        self.ota_booking_percentage * self.ota_fee_rate
    }
}

// ── Growth ────────────────────────────────────────────────────────────────────

/// Long-run annual growth rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthAssumptions {
    /// Annual inflation of prices and costs.
    pub inflation_rate: Rate,
    /// Annual appreciation of the property value.
    pub appreciation_rate: Rate,
}

impl Default for GrowthAssumptions {
    fn default() -> Self {
        Self {
            inflation_rate: 0.015,
            appreciation_rate: 0.035,
        }
    }
}

// ── PropertyConfig ────────────────────────────────────────────────────────────

/// A fully validated base configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConfig {
    /// Purchase and mortgage terms.
    pub financing: FinancingParameters,
    /// Rental assumptions.
    pub rental: RentalParameters,
    /// Operating-expense assumptions.
    pub expenses: ExpenseParameters,
    /// Channel, tax, and valuation assumptions.
    pub operating: OperatingParameters,
    /// Inflation and appreciation used when they are not simulated.
    #[serde(default)]
    pub growth: GrowthAssumptions,
}

impl PropertyConfig {
    /// The reference scenario: a 1.3M apartment bought by four owners at
    /// 75 % loan-to-value, let across a winter, summer, and off-peak season.
    pub fn base_case() -> Self {
        let purchase_price = 1_300_000.0;
        let season =
            |name: &str, months: &[u32], owner_nights, occupancy_rate, average_daily_rate| Season {
                name: name.to_string(),
                months: months.to_vec(),
                owner_nights,
                occupancy_rate,
                average_daily_rate,
            };
        Self {
            financing: FinancingParameters {
                purchase_price,
                loan_to_value: 0.75,
                interest_rate: 0.013,
                amortization_rate: 0.01,
                num_owners: 4,
                acquisition_cost_rate: 0.0105,
                selling_cost_rate: 0.078,
            },
            rental: RentalParameters {
                owner_nights_per_owner: 5.0,
                days_per_year: 365,
                occupancy_rate: 0.63,
                average_daily_rate: 200.0,
                seasons: vec![
                    season("Winter Peak", &[12, 1, 2, 3], 8, 0.75, 250.0),
                    season("Summer", &[6, 7, 8, 9], 7, 0.65, 200.0),
                    season("Off-Peak", &[4, 5, 10, 11], 5, 0.50, 150.0),
                ],
            },
            expenses: ExpenseParameters {
                management_fee_rate: 0.20,
                cleaning_cost_per_stay: 80.0,
                average_length_of_stay: 1.7,
                tourist_tax_per_person_per_night: 3.0,
                avg_guests_per_night: 2.0,
                insurance_annual: purchase_price * 0.004,
                nubbing_costs_annual: 2_000.0,
                electricity_internet_annual: 1_000.0,
                maintenance_rate: 0.01,
            },
            operating: OperatingParameters {
                ota_booking_percentage: 0.5,
                ota_fee_rate: 0.3,
                marginal_tax_rate: 0.30,
                discount_rate: 0.03,
            },
            growth: GrowthAssumptions::default(),
        }
    }

    /// Check every field is within its meaningful range.
    pub fn validate(&self) -> Result<()> {
        let f = &self.financing;
        ensure_config!(f.purchase_price > 0.0, "purchase price must be positive");
        ensure_config!(
            (0.0..=1.0).contains(&f.loan_to_value),
            "loan-to-value {} outside [0, 1]",
            f.loan_to_value
        );
        ensure_config!(f.interest_rate >= 0.0, "interest rate must be non-negative");
        ensure_config!(
            (0.0..=1.0).contains(&f.amortization_rate),
            "amortization rate {} outside [0, 1]",
            f.amortization_rate
        );
        ensure_config!(f.num_owners > 0, "at least one owner is required");
        ensure_config!(
            (0.0..1.0).contains(&f.acquisition_cost_rate)
                && (0.0..1.0).contains(&f.selling_cost_rate),
            "transaction cost rates must lie in [0, 1)"
        );

        let r = &self.rental;
        ensure_config!(
            (0.0..=1.0).contains(&r.occupancy_rate),
            "occupancy {} outside [0, 1]",
            r.occupancy_rate
        );
        ensure_config!(r.average_daily_rate >= 0.0, "daily rate must be non-negative");
        ensure_config!(r.owner_nights_per_owner >= 0.0, "owner nights must be non-negative");
        let mut claimed = [false; 12];
        for season in &r.seasons {
            ensure_config!(
                (0.0..=1.0).contains(&season.occupancy_rate) && season.average_daily_rate >= 0.0,
                "season '{}' has invalid occupancy or rate",
                season.name
            );
            for &m in &season.months {
                ensure_config!((1..=12).contains(&m), "season '{}' has month {m}", season.name);
                let slot = &mut claimed[(m - 1) as usize];
                ensure_config!(!*slot, "month {m} belongs to more than one season");
                *slot = true;
            }
        }

        let e = &self.expenses;
        ensure_config!(
            (0.0..=1.0).contains(&e.management_fee_rate),
            "management fee {} outside [0, 1]",
            e.management_fee_rate
        );
        ensure_config!(e.average_length_of_stay > 0.0, "average stay must be positive");
        ensure_config!(
            [
                e.cleaning_cost_per_stay,
                e.tourist_tax_per_person_per_night,
                e.avg_guests_per_night,
                e.insurance_annual,
                e.nubbing_costs_annual,
                e.electricity_internet_annual,
                e.maintenance_rate,
            ]
            .iter()
            .all(|v| *v >= 0.0),
            "expense amounts must be non-negative"
        );

        let o = &self.operating;
        ensure_config!(
            (0.0..=1.0).contains(&o.ota_booking_percentage)
                && (0.0..=1.0).contains(&o.ota_fee_rate),
            "OTA share and fee must lie in [0, 1]"
        );
        ensure_config!(
            (0.0..=1.0).contains(&o.marginal_tax_rate),
            "marginal tax rate {} outside [0, 1]",
            o.marginal_tax_rate
        );
        ensure_config!(o.discount_rate > -1.0, "discount rate must exceed -100%");
        ensure_config!(
            self.growth.inflation_rate > -1.0 && self.growth.appreciation_rate > -1.0,
            "growth rates must exceed -100%"
        );
        Ok(())
    }

    /// Copy with the flat rental model: seasons removed.
    pub fn without_seasons(&self) -> Self {
        Self {
            rental: RentalParameters {
                seasons: Vec::new(),
                ..self.rental.clone()
            },
            ..self.clone()
        }
    }

    /// Copy with a different purchase price; insurance scales with it.
    pub fn with_purchase_price(&self, purchase_price: Amount) -> Self {
        let scale = purchase_price / self.financing.purchase_price;
        Self {
            financing: FinancingParameters {
                purchase_price,
                ..self.financing.clone()
            },
            expenses: ExpenseParameters {
                insurance_annual: self.expenses.insurance_annual * scale,
                ..self.expenses.clone()
            },
            ..self.clone()
        }
    }
}
