//! Core traits for estimators and transformers.
//!
//! The emission regressor, the cluster engine and the standardizer all
//! follow the fit/predict (or fit/transform) contract defined here.

use crate::error::Result;
use crate::primitives::{Matrix, Vector};

/// Primary trait for supervised learning estimators.
///
/// # Examples
///
/// ```
/// use carbonsense::prelude::*;
///
/// let x = Matrix::from_vec(6, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("valid matrix");
/// let y = Vector::from_slice(&[1.0, 1.0, 1.0, 9.0, 9.0, 9.0]);
///
/// let mut forest = RandomForestRegressor::new(5).with_random_state(7);
/// forest.fit(&x, &y).expect("fit succeeds");
/// assert_eq!(forest.predict(&x).expect("fitted").len(), 6);
/// ```
pub trait Estimator {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (dimension mismatch, empty data, etc.).
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()>;

    /// Predicts target values for input data.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or `x` has the wrong width.
    fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>>;

    /// Computes the R² score of predictions on `x` against `y`.
    ///
    /// # Errors
    ///
    /// Returns an error if prediction fails.
    fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<f32> {
        let predictions = self.predict(x)?;
        Ok(crate::metrics::r_squared(&predictions, y))
    }
}

/// Trait for unsupervised learning models.
///
/// # Examples
///
/// ```
/// use carbonsense::prelude::*;
///
/// let data = Matrix::from_vec(6, 2, vec![
///     0.0, 0.0, 0.1, 0.1, 0.2, 0.0,
///     10.0, 10.0, 10.1, 10.1, 10.0, 10.2,
/// ]).expect("valid matrix");
///
/// let mut kmeans = KMeans::new(2).with_random_state(42);
/// kmeans.fit(&data).expect("fit succeeds");
/// let labels = kmeans.predict(&data).expect("fitted");
/// assert_eq!(labels.len(), 6);
/// ```
pub trait UnsupervisedEstimator {
    /// The type of labels/clusters produced.
    type Labels;

    /// Fits the model to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (empty data, invalid parameters, etc.).
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Predicts cluster assignments.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted.
    fn predict(&self, x: &Matrix<f32>) -> Result<Self::Labels>;
}

/// Trait for data transformers.
pub trait Transformer {
    /// Fits the transformer to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Transforms data using fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if transformer is not fitted.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.fit(x)?;
        self.transform(x)
    }
}
