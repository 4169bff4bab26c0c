//! Matrix files.
//!
//! Matrices are stored as JSON arrays of rows: `[[1.0, 2.0], [3.0, 4.0]]`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::{Matrix, RunError};

/// Read a matrix from a JSON array of equally sized rows.
pub fn read_matrix(path: impl AsRef<Path>) -> Result<Matrix, RunError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let rows: Vec<Vec<f64>> =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| RunError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Matrix::from_rows(&rows)?)
}

/// Write a matrix as a pretty JSON array of rows.
pub fn write_matrix(path: impl AsRef<Path>, matrix: &Matrix) -> Result<(), RunError> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, &to_rows(matrix)).map_err(|source| {
        RunError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

pub(crate) fn to_rows(matrix: &Matrix) -> Vec<&[f64]> {
    (0..matrix.rows()).map(|i| matrix.row(i)).collect()
}
