//! Matrix type for 2D numeric data.

use super::Vector;
use crate::error::{CarbonError, Result};
use serde::{Deserialize, Serialize};

/// A 2D matrix of floating-point values (row-major storage).
///
/// # Examples
///
/// ```
/// use carbonsense::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("data length matches rows * cols");
/// assert_eq!(m.shape(), (2, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Matrix<T> {
    /// Creates a new matrix from a vector of data.
    ///
    /// # Errors
    ///
    /// Returns an error if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(CarbonError::DimensionMismatch {
                expected: format!("{rows}x{cols} = {} values", rows * cols),
                actual: format!("{} values", data.len()),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Builds a matrix from equally sized rows.
    ///
    /// # Errors
    ///
    /// Returns an error if any row length differs from `cols`.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R], cols: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(CarbonError::dimension_mismatch("row length", cols, row.len()));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Sets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Borrows a row without copying.
    #[must_use]
    pub fn row_slice(&self, row_idx: usize) -> &[T] {
        let start = row_idx * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Returns a row as a Vector.
    #[must_use]
    pub fn row(&self, row_idx: usize) -> Vector<T> {
        Vector::from_slice(self.row_slice(row_idx))
    }

    /// Returns a column as a Vector.
    #[must_use]
    pub fn column(&self, col_idx: usize) -> Vector<T> {
        let data: Vec<T> = (0..self.rows)
            .map(|row| self.data[row * self.cols + col_idx])
            .collect();
        Vector::from_vec(data)
    }

    /// Copies the selected rows, in order, into a new matrix.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &idx in indices {
            data.extend_from_slice(self.row_slice(idx));
        }
        Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl Matrix<f32> {
    /// Creates a matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Converts `f64` rows into single-precision storage.
    ///
    /// # Errors
    ///
    /// Returns an error if any row length differs from `cols`, or
    /// [`CarbonError::InvalidField`] if a value is not finite once narrowed
    /// to `f32` (NaN, infinities and magnitudes beyond `f32::MAX`).
    pub fn from_f64_rows<R: AsRef<[f64]>>(rows: &[R], cols: usize) -> Result<Self> {
        let mut narrowed = Vec::with_capacity(rows.len());
        for (r, row) in rows.iter().enumerate() {
            let mut out = Vec::with_capacity(row.as_ref().len());
            for (c, &v) in row.as_ref().iter().enumerate() {
                let single = v as f32;
                if !single.is_finite() {
                    return Err(CarbonError::InvalidField {
                        field: format!("row {r}, column {c}"),
                        reason: format!("{v} does not fit in single precision"),
                    });
                }
                out.push(single);
            }
            narrowed.push(out);
        }
        Self::from_rows(&narrowed, cols)
    }
}
