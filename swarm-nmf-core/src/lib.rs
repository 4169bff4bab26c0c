//! # SwarmNMF Core
//!
//! Particle swarm optimization of the `H` factor in a non-negative matrix
//! factorization `X ≈ W·H`, where `W` is supplied by the caller.
//!
//! This crate is `no_std` compatible (it needs `alloc`) and provides:
//! - A dense row-major [`Matrix`](matrix::Matrix) with the products and norms the
//!   fitness evaluator needs
//! - Pluggable objectives ([`FitnessFunction`](fitness::FitnessFunction)) and
//!   feasibility maps ([`Projection`](projection::Projection))
//! - The swarm state, the velocity/position update rule and the optimizer driver
//!
//! ## Feature Flags
//!
//! - `std` (default): Enable standard library support
//! - `parallel`: Update particles of one iteration on the rayon thread pool
//! - `telemetry`: Enable tracing-based telemetry
//!
//! ## Example
//!
//! ```rust
//! use swarm_nmf_core::prelude::*;
//!
//! let w = Matrix::from_rows(&[[2.0]]).unwrap();
//! let x = Matrix::from_rows(&[[4.0]]).unwrap();
//! let config = PsoConfig::builder()
//!     .population_size(20)
//!     .max_iterations(200)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//!
//! let h = Optimizer::new(config).fit(&w, &x).unwrap();
//! assert!((h.get(0, 0) - 2.0).abs() < 1e-2);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod config;
pub mod fitness;
pub mod matrix;
pub mod observe;
pub mod optimizer;
pub mod particle;
pub mod projection;
pub mod state;
pub mod swarm;
pub mod update;

#[cfg(feature = "telemetry")]
pub mod telemetry;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{PsoConfig, PsoConfigBuilder};
    pub use crate::fitness::{FitnessFunction, ReconstructionError, SparseReconstructionError};
    pub use crate::matrix::Matrix;
    pub use crate::observe::{HistoryObserver, IterationEvent, NoopObserver, Observer};
    pub use crate::optimizer::{FitReport, Optimizer, RunStatus, SwarmOutcome};
    pub use crate::projection::{NonNegative, Projection};
    pub use crate::{ConfigError, Error, Result};
}

/// Result type for SwarmNMF operations
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for SwarmNMF core operations
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid configuration or input dimensions; raised before any iteration runs
    Config(ConfigError),
    /// The swarm's global best became non-finite
    Numeric {
        /// Iteration at which the best fitness was found non-finite (0 = initialization)
        iteration: usize,
    },
    /// A flat buffer did not match the requested matrix shape
    Shape {
        /// Number of elements the shape requires
        expected: usize,
        /// Number of elements supplied
        actual: usize,
    },
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration error: {e}"),
            Error::Numeric { iteration } => {
                write!(f, "global best fitness became non-finite at iteration {iteration}")
            }
            Error::Shape { expected, actual } => {
                write!(f, "buffer holds {actual} elements, shape requires {expected}")
            }
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// Configuration and dimension errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `population_size` was zero
    EmptyPopulation,
    /// `max_iterations` was zero
    ZeroIterations,
    /// `log_every` was zero
    ZeroLogInterval,
    /// A swarm coefficient was NaN or infinite
    NonFiniteCoefficient { name: &'static str },
    /// A bound was non-positive or non-finite
    InvalidBound { name: &'static str },
    /// A matrix had zero rows or columns
    EmptyMatrix { name: &'static str },
    /// Two dimensions that must agree do not
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::EmptyPopulation => write!(f, "population_size must be > 0"),
            ConfigError::ZeroIterations => write!(f, "max_iterations must be > 0"),
            ConfigError::ZeroLogInterval => write!(f, "log_every must be > 0"),
            ConfigError::NonFiniteCoefficient { name } => {
                write!(f, "coefficient `{name}` must be finite")
            }
            ConfigError::InvalidBound { name } => {
                write!(f, "bound `{name}` must be finite and > 0")
            }
            ConfigError::EmptyMatrix { name } => {
                write!(f, "matrix {name} must have at least one row and one column")
            }
            ConfigError::DimensionMismatch {
                what,
                expected,
                actual,
            } => write!(f, "{what}: expected {expected}, got {actual}"),
        }
    }
}
