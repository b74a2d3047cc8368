//! Discrete events of one trial.
//!
//! Three independent generators fill a sparse [`EventCalendar`]:
//!
//! - **maintenance**: Poisson arrivals per year with a clipped log-normal
//!   cost,
//! - **market shocks**: rare multi-year disruptions that fade back to
//!   neutral over their recovery horizon,
//! - **refinancing**: evaluated on a fixed cadence against a random market
//!   rate; once taken, the new rate holds until the next refinancing.
//!
//! All draws come from the caller's generator, so a trial-local generator
//! seeded from `(run_seed, trial_index)` replays the same calendar.

use crate::settings::EventParameters;
use pm_core::{errors::Error, errors::Result, Amount, Rate, Real, Year};
use pm_projection::FinancingParameters;
use rand::Rng;
use rand_distr::{Poisson, StandardNormal};
use serde::Serialize;
use std::collections::BTreeMap;

// ── Event payloads ────────────────────────────────────────────────────────────

/// One-off major maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaintenanceEvent {
    /// Cost charged in the event year.
    pub cost: Amount,
}

/// A market disruption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketShock {
    /// Multiplier on booked nights in the shock year.
    pub occupancy_multiplier: Real,
    /// Multiplier on nightly rates in the shock year.
    pub rate_multiplier: Real,
    /// Multiplier on the property value in the shock year.
    pub value_multiplier: Real,
    /// Years until the multipliers are back to neutral.
    pub recovery_years: Year,
}

/// Occupancy, rate, and value multipliers in force in one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShockMultipliers {
    /// Multiplier on booked nights.
    pub occupancy: Real,
    /// Multiplier on nightly rates.
    pub rate: Real,
    /// Multiplier on the property value.
    pub value: Real,
}

impl ShockMultipliers {
    /// No shock in force.
    pub const NEUTRAL: Self = Self {
        occupancy: 1.0,
        rate: 1.0,
        value: 1.0,
    };
}

impl MarketShock {
    /// Multipliers `elapsed` years after the shock year.
    ///
    /// Full effect in the shock year, a linear fade over the recovery
    /// horizon, and neutral from `recovery_years` on.
    pub fn multipliers(&self, elapsed: Year) -> ShockMultipliers {
        if elapsed >= self.recovery_years {
            return ShockMultipliers::NEUTRAL;
        }
        let progress = Real::from(elapsed) / Real::from(self.recovery_years);
        let fade = |m: Real| m + (1.0 - m) * progress;
        ShockMultipliers {
            occupancy: fade(self.occupancy_multiplier),
            rate: fade(self.rate_multiplier),
            value: fade(self.value_multiplier),
        }
    }
}

/// A refinancing of the mortgage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefinanceEvent {
    /// Rate in force from the event year on.
    pub new_rate: Rate,
    /// One-off cost charged in the event year.
    pub refinance_cost: Amount,
}

/// A single event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// Major maintenance.
    Maintenance(MaintenanceEvent),
    /// Market shock.
    MarketShock(MarketShock),
    /// Refinancing.
    Refinance(RefinanceEvent),
}

// ── Calendar ──────────────────────────────────────────────────────────────────

/// Events of one year; at most one of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct YearEvents {
    /// Major maintenance, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<MaintenanceEvent>,
    /// Market shock starting this year, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_shock: Option<MarketShock>,
    /// Refinancing this year, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinance: Option<RefinanceEvent>,
}

impl YearEvents {
    fn is_empty(&self) -> bool {
        self.maintenance.is_none() && self.market_shock.is_none() && self.refinance.is_none()
    }

    /// The year's events in a fixed kind order.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        let maintenance = self.maintenance.map(Event::Maintenance);
        let shock = self.market_shock.map(Event::MarketShock);
        let refinance = self.refinance.map(Event::Refinance);
        maintenance.into_iter().chain(shock).chain(refinance)
    }
}

/// Sparse per-year event map of one trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventCalendar {
    years: BTreeMap<Year, YearEvents>,
}

/// Number of events of each kind in a calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    /// Major maintenance events.
    pub maintenance: u32,
    /// Market shocks.
    pub market_shocks: u32,
    /// Refinancings.
    pub refinancings: u32,
}

impl EventCalendar {
    /// An empty calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event` in `year`, replacing an event of the same kind.
    pub fn insert(&mut self, year: Year, event: Event) {
        let slot = self.years.entry(year).or_default();
        match event {
            Event::Maintenance(e) => slot.maintenance = Some(e),
            Event::MarketShock(e) => slot.market_shock = Some(e),
            Event::Refinance(e) => slot.refinance = Some(e),
        }
    }

    /// Events of `year`, if any.
    pub fn get(&self, year: Year) -> Option<&YearEvents> {
        self.years.get(&year)
    }

    /// `true` when no event is recorded.
    pub fn is_empty(&self) -> bool {
        self.years.values().all(YearEvents::is_empty)
    }

    /// Every event with its year, in year order.
    pub fn iter(&self) -> impl Iterator<Item = (Year, Event)> + '_ {
        self.years
            .iter()
            .flat_map(|(&year, events)| events.iter().map(move |e| (year, e)))
    }

    /// Number of events of each kind.
    pub fn counts(&self) -> EventCounts {
        self.iter().fold(EventCounts::default(), |mut c, (_, e)| {
            match e {
                Event::Maintenance(_) => c.maintenance += 1,
                Event::MarketShock(_) => c.market_shocks += 1,
                Event::Refinance(_) => c.refinancings += 1,
            }
            c
        })
    }
}

// ── Generation ────────────────────────────────────────────────────────────────

/// Generate the events of years `1..=years`.
///
/// `financing` supplies the starting mortgage rate and the scheduled loan
/// balance on which refinancing costs are charged.
pub fn generate_events<R: Rng + ?Sized>(
    years: Year,
    financing: &FinancingParameters,
    params: &EventParameters,
    rng: &mut R,
) -> Result<EventCalendar> {
    params.validate()?;
    let m = &params.maintenance;
    let s = &params.market_shock;
    let r = &params.refinancing;

    let arrivals = if m.annual_rate > 0.0 {
        Some(
            Poisson::new(m.annual_rate)
                .map_err(|e| Error::Configuration(format!("maintenance rate: {e}")))?,
        )
    } else {
        None
    };

    let mut calendar = EventCalendar::new();
    let mut current_rate = financing.interest_rate;

    for year in 1..=years {
        if let Some(arrivals) = &arrivals {
            let count: Real = rng.sample(arrivals);
            if count > 0.0 {
                let z: Real = rng.sample(StandardNormal);
                let cost = (m.median_cost.ln() + m.cost_sigma * z)
                    .exp()
                    .clamp(m.min_cost, m.max_cost);
                calendar.insert(year, Event::Maintenance(MaintenanceEvent { cost }));
            }
        }

        if rng.gen::<Real>() < s.annual_probability {
            let mut reduce = |(lo, hi): (Real, Real)| 1.0 - rng.gen_range(lo..=hi);
            let occupancy_multiplier = reduce(s.occupancy_reduction);
            let rate_multiplier = reduce(s.rate_reduction);
            let value_multiplier = reduce(s.value_reduction);
            let (r_lo, r_hi) = s.recovery_years;
            let shock = MarketShock {
                occupancy_multiplier,
                rate_multiplier,
                value_multiplier,
                recovery_years: rng.gen_range(r_lo..=r_hi),
            };
            calendar.insert(year, Event::MarketShock(shock));
        }

        if year >= r.first_year && (year - r.first_year) % r.interval == 0 {
            let z: Real = rng.sample(StandardNormal);
            let market_rate = (current_rate + r.rate_volatility * z).max(r.min_rate);
            if current_rate - market_rate > r.threshold && rng.gen::<Real>() < r.probability {
                let refinance_cost = financing.balance_at_start_of(year) * r.cost_rate;
                calendar.insert(
                    year,
                    Event::Refinance(RefinanceEvent {
                        new_rate: market_rate,
                        refinance_cost,
                    }),
                );
                current_rate = market_rate;
            }
        }
    }
    Ok(calendar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MaintenanceParameters, MarketShockParameters, RefinancingParameters};
    use approx::assert_abs_diff_eq;
    use pm_math::MersenneTwisterUniformRng;
    use pm_projection::PropertyConfig;

    fn financing() -> FinancingParameters {
        PropertyConfig::base_case().financing
    }

    #[test]
    fn disabled_events_never_fire() {
        let mut rng = MersenneTwisterUniformRng::new(11);
        for _ in 0..100 {
            let c = generate_events(15, &financing(), &EventParameters::disabled(), &mut rng)
                .unwrap();
            assert!(c.is_empty());
        }
    }

    #[test]
    fn certain_events_fill_every_slot() {
        let params = EventParameters {
            maintenance: MaintenanceParameters {
                annual_rate: 50.0,
                ..Default::default()
            },
            market_shock: MarketShockParameters {
                annual_probability: 1.0,
                ..Default::default()
            },
            refinancing: RefinancingParameters::default(),
        };
        let mut rng = MersenneTwisterUniformRng::new(3);
        let c = generate_events(15, &financing(), &params, &mut rng).unwrap();
        let counts = c.counts();
        assert_eq!(counts.maintenance, 15);
        assert_eq!(counts.market_shocks, 15);
        for (year, event) in c.iter() {
            match event {
                Event::Maintenance(m) => assert!((5_000.0..=50_000.0).contains(&m.cost)),
                Event::MarketShock(s) => {
                    assert!((0.50..=0.70).contains(&s.occupancy_multiplier));
                    assert!((0.70..=0.80).contains(&s.rate_multiplier));
                    assert!((0.80..=0.90).contains(&s.value_multiplier));
                    assert!((1..=3).contains(&s.recovery_years));
                }
                Event::Refinance(r) => {
                    assert_eq!(year % 3, 0);
                    assert!(r.new_rate >= 0.005);
                }
            }
        }
    }

    #[test]
    fn refinancing_follows_cadence_and_tracks_rate() {
        // A 5 % mortgage against a market near 5 % with wide volatility:
        // opportunities arise, and each new rate undercuts the previous one.
        let mut financing = financing();
        financing.interest_rate = 0.05;
        let params = EventParameters {
            refinancing: RefinancingParameters {
                rate_volatility: 0.02,
                probability: 1.0,
                ..Default::default()
            },
            ..EventParameters::disabled()
        };
        let mut seen = 0;
        for seed in 0..50 {
            let mut rng = MersenneTwisterUniformRng::new(seed);
            let c = generate_events(15, &financing, &params, &mut rng).unwrap();
            let mut rate = 0.05;
            for (year, event) in c.iter() {
                let Event::Refinance(r) = event else {
                    panic!("only refinancing is enabled");
                };
                assert!(year >= 3 && year % 3 == 0);
                assert!(rate - r.new_rate > 0.005);
                assert_abs_diff_eq!(
                    r.refinance_cost,
                    financing.balance_at_start_of(year) * 0.015,
                    epsilon = 1e-9
                );
                rate = r.new_rate;
                seen += 1;
            }
        }
        assert!(seen > 0);
    }

    #[test]
    fn same_seed_same_calendar() {
        let params = EventParameters::default();
        let a = generate_events(15, &financing(), &params, &mut MersenneTwisterUniformRng::new(8))
            .unwrap();
        let b = generate_events(15, &financing(), &params, &mut MersenneTwisterUniformRng::new(8))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn shock_fades_linearly_to_neutral() {
        let shock = MarketShock {
            occupancy_multiplier: 0.6,
            rate_multiplier: 0.8,
            value_multiplier: 0.9,
            recovery_years: 3,
        };
        assert_eq!(shock.multipliers(0).occupancy, 0.6);
        assert_abs_diff_eq!(shock.multipliers(1).occupancy, 0.6 + 0.4 / 3.0, epsilon = 1e-15);
        assert_abs_diff_eq!(shock.multipliers(2).rate, 0.8 + 0.2 * 2.0 / 3.0, epsilon = 1e-15);
        assert_eq!(shock.multipliers(3), ShockMultipliers::NEUTRAL);
        assert_eq!(shock.multipliers(10), ShockMultipliers::NEUTRAL);
    }

    #[test]
    fn insert_replaces_same_kind_only() {
        let mut c = EventCalendar::new();
        c.insert(2, Event::Maintenance(MaintenanceEvent { cost: 1.0 }));
        c.insert(2, Event::Maintenance(MaintenanceEvent { cost: 2.0 }));
        c.insert(
            2,
            Event::Refinance(RefinanceEvent {
                new_rate: 0.01,
                refinance_cost: 10.0,
            }),
        );
        let year = c.get(2).unwrap();
        assert_eq!(year.maintenance, Some(MaintenanceEvent { cost: 2.0 }));
        assert!(year.refinance.is_some());
        assert_eq!(c.counts().maintenance, 1);
        assert_eq!(c.iter().count(), 2);
    }
}
