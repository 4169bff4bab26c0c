//! Dense row-major matrices
//!
//! Only the handful of operations the factorization needs: construction,
//! element access, products and the squared Frobenius norm of a residual.

use alloc::vec;
use alloc::vec::Vec;

use crate::{Error, Result};

/// A dense `rows × cols` matrix of `f64`, stored row-major.
///
/// Deserialization goes through [`Matrix::from_vec`], so a decoded matrix
/// always holds exactly `rows * cols` entries.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(serde::Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = Error;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        Matrix::from_vec(raw.rows, raw.cols, raw.data)
    }
}

impl Matrix {
    /// Create a zero-filled matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap a row-major buffer. Fails if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(Error::Shape {
                expected: rows.saturating_mul(cols),
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from a slice of equally sized rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::Shape {
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Element at `(row, col)`.
    ///
    /// # Panics
    /// If the index is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        self.data[row * self.cols + col] = value;
    }

    /// Row `i` as a slice
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Row-major backing buffer
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// True if every entry is finite and `>= 0`.
    pub fn is_non_negative(&self) -> bool {
        self.data.iter().all(|v| v.is_finite() && *v >= 0.0)
    }

    /// Matrix product `self · rhs`.
    pub fn matmul(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(crate::ConfigError::DimensionMismatch {
                what: "inner dimension of matrix product",
                expected: self.cols,
                actual: rhs.rows,
            }
            .into());
        }
        let mut out = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            let out_row = &mut out.data[i * rhs.cols..(i + 1) * rhs.cols];
            for (p, &a) in self.row(i).iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                for (o, &b) in out_row.iter_mut().zip(rhs.row(p)) {
                    *o += a * b;
                }
            }
        }
        Ok(out)
    }

    /// Sum of squared entries (squared Frobenius norm).
    pub fn squared_norm(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }

    /// Frobenius norm.
    #[cfg(feature = "std")]
    pub fn frobenius_norm(&self) -> f64 {
        self.squared_norm().sqrt()
    }
}

/// `‖x − w·h‖²_F` where `h` is a row-major `k × s` buffer.
///
/// Callers guarantee `w` is `g × k`, `x` is `g × s` and `h.len() == k * s`.
pub(crate) fn squared_residual(w: &Matrix, h: &[f64], x: &Matrix) -> f64 {
    let (k, s) = (w.cols, x.cols);
    debug_assert_eq!(h.len(), k * s);
    let mut total = 0.0;
    for i in 0..x.rows {
        let w_row = w.row(i);
        for (j, &target) in x.row(i).iter().enumerate() {
            let mut approx = 0.0;
            for (p, &wv) in w_row.iter().enumerate() {
                approx += wv * h[p * s + j];
            }
            let r = target - approx;
            total += r * r;
        }
    }
    total
}
