//! Vector type for 1D numeric data.

use serde::{Deserialize, Serialize};
use std::ops::{Index, Sub};

/// A 1D vector of floating-point values.
///
/// # Examples
///
/// ```
/// use carbonsense::primitives::Vector;
///
/// let v = Vector::from_slice(&[3.0_f32, 4.0]);
/// assert_eq!(v.len(), 2);
/// assert!((v.norm_squared() - 25.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector<T> {
    data: Vec<T>,
}

impl<T: Copy> Vector<T> {
    /// Creates a vector by copying a slice.
    #[must_use]
    pub fn from_slice(data: &[T]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    /// Creates a vector taking ownership of `data`.
    #[must_use]
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when the vector holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consumes the vector, returning its storage.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl Vector<f32> {
    /// Arithmetic mean, 0 for an empty vector.
    #[must_use]
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    /// Sum of squared elements.
    #[must_use]
    pub fn norm_squared(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum()
    }
}

impl<T> Index<usize> for Vector<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        &self.data[idx]
    }
}

impl Sub for &Vector<f32> {
    type Output = Vector<f32>;

    fn sub(self, other: &Vector<f32>) -> Vector<f32> {
        assert_eq!(self.len(), other.len(), "Vectors must have same length");
        Vector::from_vec(
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a - b)
                .collect(),
        )
    }
}
