//! # propmc
//!
//! Monte Carlo simulation of a leveraged rental property held by several
//! co-owners.
//!
//! This crate is a **façade** that re-exports the workspace crates.
//! Application code should depend on this crate rather than the individual
//! `pm-*` crates.
//!
//! ## Quick start
//!
//! ```rust
//! use propmc::projection::{deterministic_projection, PropertyConfig, PropertyProjection};
//! use propmc::simulation::{ResultSet, Simulation, SimulationSettings};
//!
//! let config = PropertyConfig::base_case();
//! let base = deterministic_projection(&PropertyProjection, &config, 15).unwrap();
//! assert_eq!(base.years.len(), 15);
//!
//! let settings = SimulationSettings {
//!     num_simulations: 100,
//!     ..SimulationSettings::default()
//! };
//! let results = ResultSet::run(&Simulation::new(config, settings).unwrap()).unwrap();
//! let p = results.summary["npv"].positive_probability.unwrap();
//! assert!((0.0..=1.0).contains(&p));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, aliases, and error definitions.
pub use pm_core as core;

/// Distributions, correlation, random numbers, sampling, and statistics.
pub use pm_math as math;

/// Property configuration and the yearly projection engine.
pub use pm_projection as projection;

/// The Monte Carlo engine.
pub use pm_simulation as simulation;

pub use pm_core::{Error, Result};
