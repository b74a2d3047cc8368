//! Serializable result set for downstream consumers.

use crate::aggregator::{irr_counts, summarize_with, AggregateStatistics, IrrCounts};
use crate::convergence::ConvergenceReport;
use crate::orchestrator::{Simulation, SimulationOutcome};
use crate::settings::SimulationSettings;
use crate::trial::TrialResult;
use pm_core::errors::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-trial table, summary statistics, and diagnostics of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    /// Settings the run used.
    pub settings: SimulationSettings,
    /// One row per trial, ordered by `trial_index`.
    pub trials: Vec<TrialResult>,
    /// Summary per output metric.
    pub summary: BTreeMap<String, AggregateStatistics>,
    /// Trials with and without a defined IRR.
    pub irr: IrrCounts,
    /// Convergence checkpoints, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence: Option<ConvergenceReport>,
}

impl ResultSet {
    /// Summarise a completed run.
    pub fn from_outcome(settings: SimulationSettings, outcome: SimulationOutcome) -> Self {
        let summary = summarize_with(&outcome.trials, &settings.percentiles);
        let irr = irr_counts(&outcome.trials);
        Self {
            settings,
            trials: outcome.trials,
            summary,
            irr,
            convergence: outcome.convergence,
        }
    }

    /// Run `simulation` and summarise it.
    pub fn run(simulation: &Simulation) -> Result<Self> {
        let outcome = simulation.run()?;
        Ok(Self::from_outcome(simulation.settings().clone(), outcome))
    }

    /// Compact JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Runtime(format!("cannot serialize results: {e}")))
    }

    /// Indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Runtime(format!("cannot serialize results: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_projection::PropertyConfig;

    #[test]
    fn json_carries_trials_summary_and_counts() {
        let settings = SimulationSettings {
            num_simulations: 20,
            parallel: false,
            ..SimulationSettings::default()
        };
        let sim = Simulation::new(PropertyConfig::base_case(), settings).unwrap();
        let results = ResultSet::run(&sim).unwrap();
        assert_eq!(results.irr.defined + results.irr.undefined, 20);

        let json: serde_json::Value = serde_json::from_str(&results.to_json().unwrap()).unwrap();
        assert_eq!(json["trials"].as_array().unwrap().len(), 20);
        assert_eq!(json["trials"][3]["trial_index"], 3);
        assert!(json["summary"]["npv"]["percentiles"]["p5"].is_number());
        assert!(json["summary"]["npv"]["positive_probability"].is_number());
        assert_eq!(json["settings"]["num_simulations"], 20);
        assert!(json.get("convergence").is_none());
    }
}
