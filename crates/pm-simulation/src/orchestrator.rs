//! The Parallel Orchestrator.
//!
//! A run samples the active variables once, splits the trial indices into
//! contiguous batches, and runs every batch on a worker pool. Workers
//! share the read-only [`SampleSet`] and base configuration; each trial
//! seeds its own generators, so results do not depend on which worker ran
//! them or in what order batches finish.
//!
//! Fan-in goes through an unbounded channel that is drained once the pool
//! scope has returned. A pool that cannot be built sends the whole run
//! down the sequential path; a worker that panics has its batch re-run
//! in-process. Both are logged at `warn`.

use crate::convergence::{ConvergenceMonitor, ConvergenceReport};
use crate::registry::DistributionRegistry;
use crate::settings::SimulationSettings;
use crate::trial::{TrialExecutor, TrialResult};
use pm_core::{
    errors::{Error, Result},
    CancellationToken, Size,
};
use pm_math::{
    latin_hypercube_sample, random_sample, CorrelationMatrix, DistributionSpec, SampleSet,
};
use pm_projection::{PropertyConfig, PropertyProjection, ProjectionEngine};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Batches per worker; more than one keeps the pool busy when batches
/// finish unevenly.
const BATCHES_PER_WORKER: Size = 4;

// ── Execution scope ───────────────────────────────────────────────────────────

/// Where a run executes.
///
/// A run started from inside another run's worker must not build a pool of
/// its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionScope {
    /// Called directly by the application; may build a worker pool.
    #[default]
    TopLevel,
    /// Called from a worker; always runs sequentially.
    Worker,
}

// ── Worker pools ──────────────────────────────────────────────────────────────

/// Builds the worker pool for one run.
pub trait WorkerPoolProvider: Send + Sync {
    /// A pool of `num_workers` threads.
    fn build(&self, num_workers: Size) -> Result<ThreadPool>;
}

/// Dedicated rayon pool per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonPoolProvider;

impl WorkerPoolProvider for RayonPoolProvider {
    fn build(&self, num_workers: Size) -> Result<ThreadPool> {
        ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("pm-worker-{i}"))
            .build()
            .map_err(|e| Error::WorkerExecution(format!("cannot build worker pool: {e}")))
    }
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// Trials of one run, ordered by `trial_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    /// One result per trial.
    pub trials: Vec<TrialResult>,
    /// Checkpoint history, when convergence checking is on.
    pub convergence: Option<ConvergenceReport>,
}

/// A configured Monte Carlo run.
///
/// # Example
///
/// ```
/// use pm_projection::PropertyConfig;
/// use pm_simulation::{Simulation, SimulationSettings};
///
/// let settings = SimulationSettings {
///     num_simulations: 50,
///     ..SimulationSettings::default()
/// };
/// let outcome = Simulation::new(PropertyConfig::base_case(), settings)
///     .unwrap()
///     .run()
///     .unwrap();
/// assert_eq!(outcome.trials.len(), 50);
/// assert!(outcome.trials.iter().enumerate().all(|(i, t)| t.trial_index == i));
/// ```
#[derive(Clone)]
pub struct Simulation {
    base_config: PropertyConfig,
    settings: SimulationSettings,
    registry: DistributionRegistry,
    engine: Arc<dyn ProjectionEngine>,
    pool: Arc<dyn WorkerPoolProvider>,
    scope: ExecutionScope,
    cancellation: CancellationToken,
}

impl Simulation {
    /// A run of the reference registry against `base_config`.
    ///
    /// Fails with a configuration error when either input is invalid.
    pub fn new(base_config: PropertyConfig, settings: SimulationSettings) -> Result<Self> {
        base_config.validate()?;
        settings.validate()?;
        Ok(Self {
            base_config,
            settings,
            registry: DistributionRegistry::reference()?,
            engine: Arc::new(PropertyProjection),
            pool: Arc::new(RayonPoolProvider),
            scope: ExecutionScope::TopLevel,
            cancellation: CancellationToken::new(),
        })
    }

    /// Use `registry` instead of the reference catalog.
    pub fn with_registry(mut self, registry: DistributionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use `engine` for the yearly projection.
    pub fn with_engine(mut self, engine: Arc<dyn ProjectionEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Use `pool` to build the worker pool.
    pub fn with_pool_provider(mut self, pool: Arc<dyn WorkerPoolProvider>) -> Self {
        self.pool = pool;
        self
    }

    /// Run in `scope`.
    pub fn with_scope(mut self, scope: ExecutionScope) -> Self {
        self.scope = scope;
        self
    }

    /// Abort the run when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The run settings.
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// The base configuration.
    pub fn base_config(&self) -> &PropertyConfig {
        &self.base_config
    }

    /// The distribution registry.
    pub fn registry(&self) -> &DistributionRegistry {
        &self.registry
    }

    /// Draw the run's sample set, by Latin Hypercube unless
    /// `settings.use_lhs` is off.
    pub fn sample(&self) -> Result<SampleSet> {
        let specs = self.registry.active_specs(&self.settings)?;
        let correlation = self.registry.active_correlation(&self.settings)?;
        let (n, seed) = (self.settings.num_simulations, self.settings.seed);
        if self.settings.use_lhs {
            latin_hypercube_sample(&specs, correlation.as_ref(), n, seed)
        } else {
            random_sample(&specs, correlation.as_ref(), n, seed)
        }
    }

    /// Where the run executes.
    pub fn scope(&self) -> ExecutionScope {
        self.scope
    }

    /// Executor for this run's trials. Trials of a parallel or nested run
    /// are in worker scope; only a sequential top-level run hands its own
    /// scope down.
    pub(crate) fn executor(&self) -> TrialExecutor<'_> {
        let scope = if self.runs_parallel() {
            ExecutionScope::Worker
        } else {
            self.scope
        };
        TrialExecutor::new(self.engine.as_ref(), &self.base_config, &self.settings)
            .with_scope(scope)
    }

    /// A worker-scope copy against another configuration and settings.
    pub(crate) fn nested(
        &self,
        base_config: PropertyConfig,
        settings: SimulationSettings,
    ) -> Result<Self> {
        base_config.validate()?;
        settings.validate()?;
        Ok(Self {
            base_config,
            settings,
            scope: ExecutionScope::Worker,
            ..self.clone()
        })
    }

    pub(crate) fn build_pool(&self) -> Result<ThreadPool> {
        self.pool.build(self.settings.num_workers)
    }

    fn runs_parallel(&self) -> bool {
        self.settings.parallel
            && self.scope == ExecutionScope::TopLevel
            && self.settings.num_simulations > self.settings.parallel_threshold
    }

    /// Run every trial.
    ///
    /// Returns [`Error::Cancelled`] without results when the cancellation
    /// token fires before the run completes.
    pub fn run(&self) -> Result<SimulationOutcome> {
        let active = self.registry.active_names(&self.settings)?;
        let parallel = self.runs_parallel();
        info!(
            trials = self.settings.num_simulations,
            variables = active.len(),
            correlated = self.settings.use_correlations,
            lhs = self.settings.use_lhs,
            parallel,
            workers = if parallel { self.settings.num_workers } else { 1 },
            "starting simulation"
        );

        let samples = self.sample()?;
        let executor = self.executor();

        let mut trials = if parallel {
            match self.run_parallel(&executor, &samples) {
                Err(e @ Error::WorkerExecution(_)) => {
                    warn!(error = %e, "worker pool unavailable; running sequentially");
                    self.run_batch(&executor, &samples, 0..samples.len())?
                }
                other => other?,
            }
        } else {
            self.run_batch(&executor, &samples, 0..samples.len())?
        };
        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }
        trials.sort_by_key(|t| t.trial_index);

        let convergence = self.settings.check_convergence.then(|| {
            let mut monitor = ConvergenceMonitor::new(trials.len());
            for t in &trials {
                monitor.observe(t.npv);
            }
            monitor.finish()
        });

        info!(
            trials = trials.len(),
            irr_undefined = trials.iter().filter(|t| !t.has_defined_irr()).count(),
            "simulation complete"
        );
        Ok(SimulationOutcome {
            trials,
            convergence,
        })
    }

    fn run_batch(
        &self,
        executor: &TrialExecutor<'_>,
        samples: &SampleSet,
        batch: Range<Size>,
    ) -> Result<Vec<TrialResult>> {
        batch
            .map(|i| {
                if self.cancellation.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                executor.execute(&samples.row(i)?)
            })
            .collect()
    }

    fn run_parallel(
        &self,
        executor: &TrialExecutor<'_>,
        samples: &SampleSet,
    ) -> Result<Vec<TrialResult>> {
        let workers = self.settings.num_workers;
        let pool = self.build_pool()?;
        let n = samples.len();
        let batch_size = n.div_ceil(workers * BATCHES_PER_WORKER).max(1);

        let (tx, rx) = crossbeam_channel::unbounded();
        pool.scope(|scope| {
            for start in (0..n).step_by(batch_size) {
                let batch = start..(start + batch_size).min(n);
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.run_batch(executor, samples, batch.clone())
                    }));
                    // The receiver outlives the scope.
                    let _ = tx.send((batch, outcome));
                });
            }
        });
        drop(tx);

        let mut trials = Vec::with_capacity(n);
        for (batch, outcome) in rx {
            match outcome {
                Ok(results) => {
                    trials.extend(results?);
                    debug!(start = batch.start, end = batch.end, "batch complete");
                }
                Err(payload) => {
                    let e = Error::WorkerExecution(panic_message(payload.as_ref()));
                    warn!(
                        error = %e,
                        start = batch.start,
                        end = batch.end,
                        "worker failed; re-running batch sequentially"
                    );
                    trials.extend(self.run_batch(executor, samples, batch)?);
                }
            }
        }
        Ok(trials)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Run `n` trials of `specs` against `base_config`.
///
/// Every spec is sampled; `correlation`, when given, couples the variables
/// it names. Events and time series use the default settings. Results are
/// ordered by `trial_index`.
pub fn run_simulation(
    n: Size,
    base_config: &PropertyConfig,
    specs: Vec<DistributionSpec>,
    correlation: Option<&CorrelationMatrix>,
    seed: u64,
    parallel: bool,
) -> Result<Vec<TrialResult>> {
    let registry = match correlation {
        Some(c) => DistributionRegistry::new(specs, c.clone())?,
        None => DistributionRegistry::independent(specs)?,
    };
    let settings = SimulationSettings {
        num_simulations: n,
        seed,
        parallel,
        use_correlations: correlation.is_some(),
        fixed_parameters: Default::default(),
        ..SimulationSettings::default()
    };
    let outcome = Simulation::new(base_config.clone(), settings)?
        .with_registry(registry)
        .run()?;
    Ok(outcome.trials)
}
