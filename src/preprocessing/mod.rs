//! Feature standardization.
//!
//! The clustering path fits a fresh [`StandardScaler`] on every batch; the
//! prediction path persists one next to the emission forest.
//!
//! # Example
//!
//! ```
//! use carbonsense::prelude::*;
//!
//! let data = Matrix::from_vec(4, 2, vec![
//!     1.0, 100.0,
//!     2.0, 200.0,
//!     3.0, 300.0,
//!     4.0, 400.0,
//! ]).expect("valid matrix dimensions");
//!
//! let mut scaler = StandardScaler::new();
//! let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
//! assert!(scaled.get(0, 0) < 0.0 && scaled.get(3, 1) > 0.0);
//! ```

use crate::error::{CarbonError, Result};
use crate::primitives::Matrix;
use crate::serialization::safetensors::{self, TensorMap};
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Standard deviations at or below this are treated as zero variance.
const ZERO_VARIANCE_EPS: f32 = 1e-10;

/// Standardizes features by removing mean and scaling to unit variance.
///
/// The standard score of a sample x is: z = (x - mean) / std, with the
/// population standard deviation (divide by n).
///
/// A column with zero variance is centred but left unscaled, so every
/// value of the fitted batch maps to exactly 0 instead of NaN.
///
/// # Example
///
/// ```
/// use carbonsense::prelude::*;
///
/// let data = Matrix::from_vec(3, 2, vec![
///     0.0, 7.0,
///     1.0, 7.0,
///     2.0, 7.0,
/// ]).expect("valid matrix dimensions");
///
/// let mut scaler = StandardScaler::new();
/// let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
///
/// for i in 0..3 {
///     assert_eq!(scaled.get(i, 1), 0.0);
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean of each feature (computed during fit).
    mean: Option<Vec<f32>>,
    /// Standard deviation of each feature (computed during fit).
    std: Option<Vec<f32>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Creates a new, unfitted `StandardScaler`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
        }
    }

    /// Returns the mean of each feature.
    ///
    /// # Errors
    ///
    /// Returns an error if the scaler is not fitted.
    pub fn mean(&self) -> Result<&[f32]> {
        self.mean
            .as_deref()
            .ok_or(CarbonError::NotFitted("StandardScaler"))
    }

    /// Returns the standard deviation of each feature.
    ///
    /// # Errors
    ///
    /// Returns an error if the scaler is not fitted.
    pub fn std(&self) -> Result<&[f32]> {
        self.std
            .as_deref()
            .ok_or(CarbonError::NotFitted("StandardScaler"))
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    /// Number of features seen during fit, if fitted.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.mean.as_ref().map(Vec::len)
    }

    /// Saves the scaler to a SafeTensors file.
    ///
    /// # Errors
    ///
    /// Returns an error if the scaler is unfitted or if saving fails.
    pub fn save_safetensors<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mean = self.mean()?;
        let std = self.std()?;

        let mut tensors = TensorMap::new();
        tensors.insert("mean".to_string(), (mean.to_vec(), vec![mean.len()]));
        tensors.insert("std".to_string(), (std.to_vec(), vec![std.len()]));

        safetensors::save_safetensors(path, &tensors)
    }

    /// Loads a scaler from a SafeTensors file.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or if the file layout is invalid.
    pub fn load_safetensors<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (metadata, raw_data) = safetensors::load_safetensors(path)?;

        let mean = safetensors::get_tensor(&metadata, &raw_data, "mean")?;
        let std = safetensors::get_tensor(&metadata, &raw_data, "std")?;

        if mean.len() != std.len() {
            return Err(CarbonError::format(
                path,
                format!(
                    "mean has {} values but std has {}",
                    mean.len(),
                    std.len()
                ),
            ));
        }
        if mean.iter().chain(std.iter()).any(|v| !v.is_finite()) {
            return Err(CarbonError::format(path, "non-finite scaling parameters"));
        }

        Ok(Self {
            mean: Some(mean),
            std: Some(std),
        })
    }
}

impl Transformer for StandardScaler {
    /// Computes the mean and standard deviation of each feature.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();

        if n_samples == 0 {
            return Err(CarbonError::empty_input("cannot fit scaler with zero samples"));
        }

        // Accumulate in f64 so large kWh columns don't lose precision
        let mut mean = vec![0.0_f32; n_features];
        for (j, mean_j) in mean.iter_mut().enumerate() {
            let sum: f64 = (0..n_samples).map(|i| f64::from(x.get(i, j))).sum();
            *mean_j = (sum / n_samples as f64) as f32;
        }

        let mut std = vec![0.0_f32; n_features];
        for (j, std_j) in std.iter_mut().enumerate() {
            let m = f64::from(mean[j]);
            let sum_sq: f64 = (0..n_samples)
                .map(|i| {
                    let diff = f64::from(x.get(i, j)) - m;
                    diff * diff
                })
                .sum();
            *std_j = (sum_sq / n_samples as f64).sqrt() as f32;
        }

        self.mean = Some(mean);
        self.std = Some(std);

        Ok(())
    }

    /// Standardizes the data using fitted mean and std.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let mean = self.mean()?;
        let std = self.std()?;

        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(CarbonError::dimension_mismatch(
                "n_features",
                mean.len(),
                n_features,
            ));
        }

        let mut result = vec![0.0; n_samples * n_features];

        for i in 0..n_samples {
            for j in 0..n_features {
                let mut val = x.get(i, j) - mean[j];
                if std[j] > ZERO_VARIANCE_EPS {
                    val /= std[j];
                }
                result[i * n_features + j] = val;
            }
        }

        Matrix::from_vec(n_samples, n_features, result)
    }
}
