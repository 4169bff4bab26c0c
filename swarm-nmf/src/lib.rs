//! # SwarmNMF
//!
//! Non-negative matrix factorization `X ≈ W·H` where `W` comes from the caller
//! (a spectral initialization, a previous stage, ...) and `H` is searched for
//! by a particle swarm.
//!
//! ```rust
//! use swarm_nmf::prelude::*;
//!
//! let w = Matrix::from_rows(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
//! let x = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0], [4.0, 6.0]]).unwrap();
//!
//! let config = PsoConfig::builder().max_iterations(300).seed(1).build().unwrap();
//! let h = Optimizer::new(config).fit(&w, &x).unwrap();
//! assert_eq!(h.shape(), (2, 2));
//! assert!(h.is_non_negative());
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: Update particles on the rayon thread pool
//!
//! ## Crate Structure
//!
//! - [`swarm_nmf_core`]: matrices, objectives, swarm mechanics (no_std compatible)
//! - [`run`]: JSON run specs and the end-to-end fit pipeline
//! - [`artifacts`]: on-disk run bundles with a SHA-256 manifest
//! - [`io`]: matrix files

#![forbid(unsafe_code)]

use std::path::PathBuf;

// Re-export the core crate
pub use swarm_nmf_core as core;

pub use swarm_nmf_core::{
    config::{PsoConfig, PsoConfigBuilder},
    matrix::Matrix,
    optimizer::{FitReport, Optimizer, RunStatus},
    state::FactorizationState,
    telemetry::TracingObserver,
    ConfigError, Error, Result,
};

pub mod artifacts;
pub mod io;
pub mod run;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::run::{RunOutput, RunSpec};
    pub use crate::{RunError, TracingObserver};
}

/// Errors from the end-to-end run pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Optimize(#[from] swarm_nmf_core::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] postcard::Error),
}
