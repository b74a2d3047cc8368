//! # pm-simulation
//!
//! Monte Carlo simulation of a leveraged, co-owned rental property.
//!
//! A run draws every uncertain input once per trial from the
//! [`DistributionRegistry`] with a Latin Hypercube sampler and a Gaussian
//! copula, expands inflation and appreciation into mean-reverting yearly
//! paths, scatters maintenance, market-shock, and refinancing events over
//! the horizon, and projects each trial year by year through the
//! [`pm_projection::ProjectionEngine`]. Trials share nothing mutable, so
//! the [`Simulation`] fans them out over a rayon pool; the [`aggregator`]
//! reduces the results to per-metric statistics.
//!
//! ```
//! use pm_projection::PropertyConfig;
//! use pm_simulation::{ResultSet, Simulation, SimulationSettings};
//!
//! let settings = SimulationSettings {
//!     num_simulations: 200,
//!     ..SimulationSettings::default()
//! };
//! let simulation = Simulation::new(PropertyConfig::base_case(), settings).unwrap();
//! let results = ResultSet::run(&simulation).unwrap();
//!
//! let npv = &results.summary["npv"];
//! assert!(npv.min <= npv.mean && npv.mean <= npv.max);
//! assert_eq!(results.irr.defined + results.irr.undefined, 200);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Per-metric summary statistics.
pub mod aggregator;

/// Running-mean convergence monitor.
pub mod convergence;

/// Maintenance, market-shock, and refinancing events.
pub mod events;

/// Parallel orchestration of a run.
pub mod orchestrator;

/// Named input distributions and their correlations.
pub mod registry;

/// Serializable result set.
pub mod result_set;

/// One-input Monte Carlo sensitivity sweeps.
pub mod sensitivity;

/// Run settings.
pub mod settings;

/// Mean-reverting yearly paths.
pub mod time_series;

/// Single-trial execution.
pub mod trial;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use aggregator::{irr_counts, summarize, summarize_with, AggregateStatistics, IrrCounts};
pub use convergence::{Checkpoint, ConvergenceMonitor, ConvergenceReport};
pub use events::{
    generate_events, Event, EventCalendar, MaintenanceEvent, MarketShock, RefinanceEvent,
    YearEvents,
};
pub use orchestrator::{
    run_simulation, ExecutionScope, RayonPoolProvider, Simulation, SimulationOutcome,
    WorkerPoolProvider,
};
pub use registry::DistributionRegistry;
pub use result_set::ResultSet;
pub use sensitivity::{sensitivity_sweep, SensitivitySweep, SweepParameter, SweepPoint};
pub use settings::{EventParameters, SeriesParameters, SimulationSettings};
pub use time_series::{generate_series, SeriesPair, TimeSeries};
pub use trial::{resolve_configuration, TrialExecutor, TrialResult};
