//! Portable snapshot of a finished factorization.
//!
//! Downstream stages receive `H` together with the configuration and seed that
//! produced it, encoded compactly with postcard.

use crate::config::PsoConfig;
use crate::matrix::Matrix;
use crate::optimizer::{FitReport, RunStatus};

/// Version of the snapshot format
pub const STATE_FORMAT_VERSION: u32 = 1;

/// `H` plus the provenance needed to reproduce it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FactorizationState {
    pub version: u32,
    pub h: Matrix,
    pub best_fitness: f64,
    pub iterations: usize,
    pub status: RunStatus,
    pub config: PsoConfig,
    /// Effective seed (the configured one, or the one drawn for the run)
    pub seed: u64,
}

impl FactorizationState {
    pub fn from_report(report: &FitReport, config: &PsoConfig) -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            h: report.h.clone(),
            best_fitness: report.best_fitness,
            iterations: report.iterations,
            status: report.status,
            config: config.clone(),
            seed: report.seed,
        }
    }

    /// Configuration that replays this run exactly.
    pub fn replay_config(&self) -> PsoConfig {
        PsoConfig {
            seed: Some(self.seed),
            ..self.config.clone()
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<alloc::vec::Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::NoopObserver;
    use crate::optimizer::Optimizer;

    #[test]
    fn snapshot_survives_postcard_and_replays() {
        let w = Matrix::from_rows(&[[1.0, 0.5], [0.0, 1.0]]).unwrap();
        let x = Matrix::from_rows(&[[2.0, 1.0, 0.5], [1.0, 3.0, 0.0]]).unwrap();
        let config = PsoConfig::builder().max_iterations(40).build().unwrap();

        let report = Optimizer::new(config.clone())
            .fit_with_observer(&w, &x, &mut NoopObserver)
            .unwrap();
        let state = FactorizationState::from_report(&report, &config);

        let bytes = state.to_bytes().unwrap();
        let decoded = FactorizationState::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(decoded.h.shape(), (2, 3));

        let replayed = Optimizer::new(decoded.replay_config()).fit(&w, &x).unwrap();
        assert_eq!(replayed, state.h);
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let state = FactorizationState {
            version: STATE_FORMAT_VERSION,
            h: Matrix::zeros(1, 2),
            best_fitness: 0.0,
            iterations: 1,
            status: RunStatus::Completed,
            config: PsoConfig::default(),
            seed: 4,
        };
        let bytes = state.to_bytes().unwrap();
        assert!(FactorizationState::from_bytes(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn snapshot_with_inconsistent_h_shape_is_rejected() {
        let state = FactorizationState {
            version: STATE_FORMAT_VERSION,
            h: Matrix::from_rows(&[[1.5]]).unwrap(),
            best_fitness: 0.0,
            iterations: 1,
            status: RunStatus::Completed,
            config: PsoConfig::default(),
            seed: 4,
        };
        let mut bytes = state.to_bytes().unwrap();
        // varint layout: [version, h.rows, h.cols, h.data.len, ...]
        assert_eq!(&bytes[..4], &[1, 1, 1, 1]);
        bytes[1] = 2;
        bytes[2] = 2;
        assert!(FactorizationState::from_bytes(&bytes).is_err());
    }
}
