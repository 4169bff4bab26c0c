//! Swarm configuration
//!
//! A [`PsoConfig`] is built once (usually through [`PsoConfig::builder`]),
//! validated eagerly, and then handed to the optimizer by value.

use crate::particle::INIT_VELOCITY_SCALE;
use crate::{ConfigError, Result};

/// Particle Swarm Optimization configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PsoConfig {
    /// Number of particles in the swarm
    pub population_size: usize,
    /// Number of update passes
    pub max_iterations: usize,
    /// Inertia weight (momentum)
    pub inertia: f64,
    /// Cognitive coefficient (attraction to personal best)
    pub cognitive: f64,
    /// Social coefficient (attraction to global best)
    pub social: f64,
    /// Initial positions are drawn uniformly from `[0, init_upper)`
    pub init_upper: f64,
    /// Symmetric per-entry velocity clamp
    pub max_velocity: Option<f64>,
    /// Upper clamp applied by the projection alongside non-negativity
    pub position_upper: Option<f64>,
    /// Stop after this many consecutive iterations without a new global best
    pub patience: Option<usize>,
    /// Seed for the particle streams; `None` draws one per run
    pub seed: Option<u64>,
    /// Emit an iteration event to the observer
    pub verbose: bool,
    /// Report every `log_every` iterations (the final iteration is always reported)
    pub log_every: usize,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            max_iterations: 1000,
            inertia: 0.5,
            cognitive: 1.5,
            social: 1.5,
            init_upper: 10.0,
            max_velocity: None,
            position_upper: None,
            patience: None,
            seed: None,
            verbose: false,
            log_every: 1,
        }
    }
}

impl PsoConfig {
    /// Create a new builder starting from the defaults
    pub fn builder() -> PsoConfigBuilder {
        PsoConfigBuilder::new()
    }

    /// Check every field; the first violation wins.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.log_every == 0 {
            return Err(ConfigError::ZeroLogInterval);
        }
        for (name, value) in [
            ("inertia", self.inertia),
            ("cognitive", self.cognitive),
            ("social", self.social),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteCoefficient { name });
            }
        }
        check_bound("init_upper", self.init_upper)?;
        // Initial velocities are drawn from a span this wide; it must not underflow.
        if INIT_VELOCITY_SCALE * self.init_upper == 0.0 {
            return Err(ConfigError::InvalidBound { name: "init_upper" });
        }
        if let Some(v) = self.max_velocity {
            check_bound("max_velocity", v)?;
        }
        if let Some(u) = self.position_upper {
            check_bound("position_upper", u)?;
        }
        if self.patience == Some(0) {
            return Err(ConfigError::InvalidBound { name: "patience" });
        }
        Ok(())
    }

    /// Whether the 1-based `iteration` emits an event.
    pub(crate) fn should_report(&self, iteration: usize) -> bool {
        self.verbose && (iteration % self.log_every == 0 || iteration == self.max_iterations)
    }
}

fn check_bound(name: &'static str, value: f64) -> core::result::Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidBound { name })
    }
}

/// Builder for PsoConfig
#[derive(Debug, Default)]
pub struct PsoConfigBuilder {
    config: PsoConfig,
}

impl PsoConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn population_size(mut self, size: usize) -> Self {
        self.config.population_size = size;
        self
    }

    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.config.max_iterations = iterations;
        self
    }

    pub fn inertia(mut self, w: f64) -> Self {
        self.config.inertia = w;
        self
    }

    pub fn cognitive(mut self, c1: f64) -> Self {
        self.config.cognitive = c1;
        self
    }

    pub fn social(mut self, c2: f64) -> Self {
        self.config.social = c2;
        self
    }

    /// Upper bound of the initial position distribution
    pub fn init_upper(mut self, bound: f64) -> Self {
        self.config.init_upper = bound;
        self
    }

    pub fn max_velocity(mut self, v_max: f64) -> Self {
        self.config.max_velocity = Some(v_max);
        self
    }

    pub fn position_upper(mut self, bound: f64) -> Self {
        self.config.position_upper = Some(bound);
        self
    }

    /// Enable early stopping after `iterations` without improvement
    pub fn patience(mut self, iterations: usize) -> Self {
        self.config.patience = Some(iterations);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn log_every(mut self, iterations: usize) -> Self {
        self.config.log_every = iterations;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<PsoConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
