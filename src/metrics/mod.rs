//! Evaluation metrics.
//!
//! Regression quality (R², MSE) for the emission forest and clustering
//! compactness (inertia) for the segmentation engine.

use crate::primitives::{Matrix, Vector};

/// Computes the coefficient of determination (R²).
///
/// R² = 1 - (`SS_res` / `SS_tot`)
///
/// Returns 0 when the targets have no variance.
///
/// # Examples
///
/// ```
/// use carbonsense::metrics::r_squared;
/// use carbonsense::primitives::Vector;
///
/// let y_true = Vector::from_slice(&[3.0, -0.5, 2.0, 7.0]);
/// let y_pred = Vector::from_slice(&[2.5, 0.0, 2.0, 8.0]);
/// let r2 = r_squared(&y_pred, &y_true);
/// assert!(r2 > 0.9);
/// ```
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[must_use]
pub fn r_squared(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");

    let y_mean = y_true.mean();

    let ss_res: f32 = y_true
        .as_slice()
        .iter()
        .zip(y_pred.as_slice().iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    let ss_tot: f32 = y_true.as_slice().iter().map(|t| (t - y_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return 0.0;
    }

    1.0 - (ss_res / ss_tot)
}

/// Mean squared error.
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[must_use]
pub fn mse(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f32 = y_true
        .as_slice()
        .iter()
        .zip(y_pred.as_slice().iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    total / y_true.len() as f32
}

/// Within-cluster sum of squared distances to the assigned centroid.
///
/// # Examples
///
/// ```
/// use carbonsense::metrics::inertia;
/// use carbonsense::primitives::Matrix;
///
/// let data = Matrix::from_vec(2, 1, vec![0.0, 2.0]).expect("valid matrix");
/// let centroids = Matrix::from_vec(1, 1, vec![1.0]).expect("valid matrix");
/// assert!((inertia(&data, &centroids, &[0, 0]) - 2.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn inertia(data: &Matrix<f32>, centroids: &Matrix<f32>, labels: &[usize]) -> f32 {
    let mut total = 0.0;

    for (i, &label) in labels.iter().enumerate() {
        let point = data.row(i);
        let centroid = centroids.row(label);
        let diff = &point - &centroid;
        total += diff.norm_squared();
    }

    total
}
