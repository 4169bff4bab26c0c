//! Objectives scored by the swarm
//!
//! A particle position is a row-major flattening of a candidate `H` (`k × s`):
//! entry `H[i][j]` lives at index `i * s + j`.

use crate::matrix::{squared_residual, Matrix};
use crate::{ConfigError, Result};

/// A fitness function for swarm optimization. Lower is better.
pub trait FitnessFunction: Send + Sync {
    /// Length of the position vectors this function scores
    fn dimension(&self) -> usize;

    /// Score a position. Must be deterministic and side-effect free.
    fn evaluate(&self, position: &[f64]) -> f64;
}

/// Evaluate a position, mapping NaN and infinities to `+∞`.
pub(crate) fn score<F: FitnessFunction + ?Sized>(fitness: &F, position: &[f64]) -> f64 {
    let f = fitness.evaluate(position);
    if f.is_finite() {
        f
    } else {
        f64::INFINITY
    }
}

/// Squared Frobenius reconstruction error `‖X − W·H‖²_F` for fixed `W`, `X`.
#[derive(Debug, Clone, Copy)]
pub struct ReconstructionError<'a> {
    w: &'a Matrix,
    x: &'a Matrix,
}

impl<'a> ReconstructionError<'a> {
    /// Bind `W` (`g × k`) and `X` (`g × s`).
    pub fn new(w: &'a Matrix, x: &'a Matrix) -> Result<Self> {
        check_factor_shapes(w, x)?;
        Ok(Self { w, x })
    }

    /// Rank `k` of the factorization
    pub fn rank(&self) -> usize {
        self.w.cols()
    }

    /// Shape `(k, s)` of `H`
    pub fn h_shape(&self) -> (usize, usize) {
        (self.w.cols(), self.x.cols())
    }

    /// Score a candidate `H` given as a matrix.
    pub fn evaluate_matrix(&self, h: &Matrix) -> Result<f64> {
        let (k, s) = self.h_shape();
        if h.rows() != k {
            return Err(ConfigError::DimensionMismatch {
                what: "row count of H vs column count of W",
                expected: k,
                actual: h.rows(),
            }
            .into());
        }
        if h.cols() != s {
            return Err(ConfigError::DimensionMismatch {
                what: "column count of H vs X",
                expected: s,
                actual: h.cols(),
            }
            .into());
        }
        Ok(squared_residual(self.w, h.as_slice(), self.x))
    }
}

impl FitnessFunction for ReconstructionError<'_> {
    fn dimension(&self) -> usize {
        self.w.cols() * self.x.cols()
    }

    fn evaluate(&self, position: &[f64]) -> f64 {
        squared_residual(self.w, position, self.x)
    }
}

/// Reconstruction error plus an L1 penalty on `H`: `‖X − W·H‖²_F + λ·Σ|H|`.
#[derive(Debug, Clone, Copy)]
pub struct SparseReconstructionError<'a> {
    inner: ReconstructionError<'a>,
    lambda: f64,
}

impl<'a> SparseReconstructionError<'a> {
    pub fn new(w: &'a Matrix, x: &'a Matrix, lambda: f64) -> Result<Self> {
        if !(lambda.is_finite() && lambda >= 0.0) {
            return Err(ConfigError::NonFiniteCoefficient { name: "lambda" }.into());
        }
        Ok(Self {
            inner: ReconstructionError::new(w, x)?,
            lambda,
        })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl FitnessFunction for SparseReconstructionError<'_> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn evaluate(&self, position: &[f64]) -> f64 {
        let l1: f64 = position
            .iter()
            .map(|&v| if v < 0.0 { -v } else { v })
            .sum();
        self.inner.evaluate(position) + self.lambda * l1
    }
}

/// `‖X − W·H‖²_F` for explicit matrices.
pub fn evaluate(w: &Matrix, h: &Matrix, x: &Matrix) -> Result<f64> {
    ReconstructionError::new(w, x)?.evaluate_matrix(h)
}

/// `W` and `X` must be non-empty and share their row count.
pub(crate) fn check_factor_shapes(w: &Matrix, x: &Matrix) -> core::result::Result<(), ConfigError> {
    if w.is_empty() {
        return Err(ConfigError::EmptyMatrix { name: "W" });
    }
    if x.is_empty() {
        return Err(ConfigError::EmptyMatrix { name: "X" });
    }
    if w.rows() != x.rows() {
        return Err(ConfigError::DimensionMismatch {
            what: "row count of W vs X",
            expected: x.rows(),
            actual: w.rows(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn fixture() -> (Matrix, Matrix) {
        let w = Matrix::from_rows(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
        let x = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0], [4.0, 6.0]]).unwrap();
        (w, x)
    }

    #[test]
    fn exact_factor_scores_zero() {
        let (w, x) = fixture();
        let h = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(evaluate(&w, &h, &x).unwrap(), 0.0);

        let f = ReconstructionError::new(&w, &x).unwrap();
        assert_eq!(f.dimension(), 4);
        assert_eq!(f.evaluate(h.as_slice()), 0.0);
    }

    #[test]
    fn scalar_case_is_squared_error() {
        let w = Matrix::from_rows(&[[2.0]]).unwrap();
        let x = Matrix::from_rows(&[[4.0]]).unwrap();
        let f = ReconstructionError::new(&w, &x).unwrap();
        assert_eq!(f.evaluate(&[1.0]), 4.0);
        assert_eq!(f.evaluate(&[2.0]), 0.0);
        assert_eq!(f.evaluate(&[3.5]), 9.0);
    }

    #[test]
    fn row_mismatch_is_config_error() {
        let w = Matrix::zeros(3, 2);
        let x = Matrix::zeros(4, 2);
        assert!(matches!(
            ReconstructionError::new(&w, &x),
            Err(Error::Config(ConfigError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn wrong_h_shape_is_rejected() {
        let (w, x) = fixture();
        let h = Matrix::zeros(3, 2);
        assert!(evaluate(&w, &h, &x).is_err());
    }

    #[test]
    fn h_shape_errors_name_the_offending_axis() {
        let (w, x) = fixture();
        let tall = Matrix::zeros(4, 1);
        assert_eq!(
            evaluate(&w, &tall, &x).unwrap_err(),
            Error::Config(ConfigError::DimensionMismatch {
                what: "row count of H vs column count of W",
                expected: 2,
                actual: 4,
            })
        );

        let wide = Matrix::zeros(2, 3);
        assert_eq!(
            evaluate(&w, &wide, &x).unwrap_err(),
            Error::Config(ConfigError::DimensionMismatch {
                what: "column count of H vs X",
                expected: 2,
                actual: 3,
            })
        );
    }

    #[test]
    fn sparse_objective_adds_l1_penalty() {
        let (w, x) = fixture();
        let h = [1.0, 2.0, 3.0, 4.0];
        let f = SparseReconstructionError::new(&w, &x, 0.5).unwrap();
        assert_eq!(f.evaluate(&h), 5.0);
        assert!(SparseReconstructionError::new(&w, &x, -1.0).is_err());
    }

    #[test]
    fn score_maps_nan_to_infinity() {
        let w = Matrix::from_rows(&[[1.0]]).unwrap();
        let x = Matrix::from_rows(&[[f64::NAN]]).unwrap();
        let f = ReconstructionError::new(&w, &x).unwrap();
        assert!(f.evaluate(&[1.0]).is_nan());
        assert_eq!(score(&f, &[1.0]), f64::INFINITY);
    }
}
