//! The optimizer driver
//!
//! [`Optimizer::minimize`] is the generic loop: it only knows a
//! [`FitnessFunction`] and a [`Projection`]. [`Optimizer::fit`] binds it to the
//! NMF objective `‖X − W·H‖²_F` over the non-negative orthant and decodes the
//! winning position into `H`.
//!
//! A run either completes and returns a result, or fails with an [`Error`]
//! before (configuration) or during (numeric) the loop; no partial state leaks.

use alloc::vec::Vec;

use crate::config::PsoConfig;
use crate::fitness::{FitnessFunction, ReconstructionError};
use crate::matrix::Matrix;
use crate::observe::{IterationEvent, NoopObserver, Observer};
use crate::particle::resolve_seed;
use crate::projection::{NonNegative, Projection};
use crate::swarm::Swarm;
use crate::update::UpdateRule;
use crate::{Error, Result};

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RunStatus {
    /// All `max_iterations` passes ran
    Completed,
    /// The global best stalled for `patience` iterations
    EarlyStopped,
}

/// Result of [`Optimizer::minimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmOutcome {
    pub best_position: Vec<f64>,
    pub best_fitness: f64,
    /// Update passes actually run
    pub iterations: usize,
    pub status: RunStatus,
    /// Seed the particle streams were derived from
    pub seed: u64,
}

/// Result of [`Optimizer::fit_with_observer`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// The optimized factor (`k × s`, non-negative)
    pub h: Matrix,
    /// `‖X − W·H‖²_F`
    pub best_fitness: f64,
    pub iterations: usize,
    pub status: RunStatus,
    pub seed: u64,
}

/// Particle swarm optimizer bound to one validated configuration.
#[derive(Debug, Clone)]
pub struct Optimizer {
    config: PsoConfig,
}

impl Optimizer {
    pub fn new(config: PsoConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PsoConfig {
        &self.config
    }

    /// Optimize `H` for fixed `W` (`g × k`) and `X` (`g × s`).
    pub fn fit(&self, w: &Matrix, x: &Matrix) -> Result<Matrix> {
        self.fit_with_observer(w, x, &mut NoopObserver)
            .map(|report| report.h)
    }

    /// Like [`fit`](Self::fit), reporting progress to `observer` and returning
    /// run details.
    pub fn fit_with_observer<O: Observer + ?Sized>(
        &self,
        w: &Matrix,
        x: &Matrix,
        observer: &mut O,
    ) -> Result<FitReport> {
        self.config.validate()?;
        let fitness = ReconstructionError::new(w, x)?;
        let projection = match self.config.position_upper {
            Some(upper) => NonNegative::with_upper(upper),
            None => NonNegative::new(),
        };

        let outcome = self.minimize(&fitness, &projection, observer)?;
        let (k, s) = fitness.h_shape();
        Ok(FitReport {
            h: Matrix::from_vec(k, s, outcome.best_position)?,
            best_fitness: outcome.best_fitness,
            iterations: outcome.iterations,
            status: outcome.status,
            seed: outcome.seed,
        })
    }

    /// Minimize an arbitrary objective over the feasible set of `projection`.
    pub fn minimize<F, P, O>(
        &self,
        fitness: &F,
        projection: &P,
        observer: &mut O,
    ) -> Result<SwarmOutcome>
    where
        F: FitnessFunction + ?Sized,
        P: Projection + ?Sized,
        O: Observer + ?Sized,
    {
        let config = &self.config;
        config.validate()?;

        let seed = resolve_seed(config.seed);
        let rule = UpdateRule::from_config(config);

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            population = config.population_size,
            max_iterations = config.max_iterations,
            dimension = fitness.dimension(),
            seed,
            "starting particle swarm"
        );

        let mut swarm = Swarm::initialize(config, seed, fitness, projection);
        if !swarm.global_best_fitness().is_finite() {
            return Err(Error::Numeric { iteration: 0 });
        }

        let mut status = RunStatus::Completed;
        let mut stalled = 0usize;
        while swarm.iteration() < config.max_iterations {
            let improved = swarm.step(&rule, fitness, projection);
            let iteration = swarm.iteration();
            let best_fitness = swarm.global_best_fitness();
            if !best_fitness.is_finite() {
                return Err(Error::Numeric { iteration });
            }

            if config.should_report(iteration) {
                observer.on_iteration(&IterationEvent {
                    iteration,
                    best_fitness,
                    improved,
                });
            }

            stalled = if improved { 0 } else { stalled + 1 };
            if config.patience.is_some_and(|patience| stalled >= patience) {
                status = RunStatus::EarlyStopped;
                break;
            }
        }

        let iterations = swarm.iteration();
        let (best_position, best_fitness) = swarm.into_best();

        #[cfg(feature = "telemetry")]
        tracing::debug!(iterations, best_fitness, ?status, "particle swarm finished");

        Ok(SwarmOutcome {
            best_position,
            best_fitness,
            iterations,
            status,
            seed,
        })
    }
}
