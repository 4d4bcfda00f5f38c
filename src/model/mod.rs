//! Emission model lifecycle.
//!
//! The emission model is a matched pair: a [`StandardScaler`] fitted on the
//! six raw inputs and a [`RandomForestRegressor`] trained on the scaled
//! inputs. The pair is trained on a synthetic corpus, persisted through an
//! [`ArtifactStore`] and cached process-wide by a [`ModelManager`].
//!
//! # Example
//!
//! ```
//! use carbonsense::model::{EmissionModel, TrainingParams};
//!
//! let params = TrainingParams {
//!     n_estimators: 5,
//!     max_depth: 6,
//!     training_samples: 120,
//!     ..TrainingParams::default()
//! };
//! let (model, report) = EmissionModel::train(&params).expect("training succeeds");
//! assert_eq!(report.samples, 120);
//!
//! let estimate = model
//!     .predict_one(&[15.5, 120.0, 18.0, 12.0, 6.0, 200.0])
//!     .expect("six inputs");
//! assert!(estimate.is_finite());
//! ```

mod manager;
mod store;

pub use manager::{ModelManager, ModelState};
pub use store::{ArtifactStatus, ArtifactStore};

use crate::config::ModelConfig;
use crate::error::{CarbonError, Result};
use crate::predict::N_INPUTS;
use crate::preprocessing::StandardScaler;
use crate::primitives::Matrix;
use crate::synthetic::SyntheticGenerator;
use crate::traits::{Estimator, Transformer};
use crate::tree::RandomForestRegressor;
use serde::{Deserialize, Serialize};

/// Hyperparameters for one training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Seeds the corpus and the forest
    pub random_state: u64,
    pub training_samples: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for TrainingParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            random_state: config.random_state,
            training_samples: config.training_samples,
        }
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Rows in the synthetic corpus
    pub samples: usize,
    /// Trees in the forest
    pub n_estimators: usize,
    /// R² on the training corpus
    pub r_squared: f32,
}

/// A fitted scaler and forest that always travel together.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionModel {
    scaler: StandardScaler,
    forest: RandomForestRegressor,
}

impl EmissionModel {
    /// Pairs a scaler and forest, checking that both are fitted for six inputs.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::NotFitted`] or [`CarbonError::DimensionMismatch`]
    /// if the pair is unusable.
    pub fn new(scaler: StandardScaler, forest: RandomForestRegressor) -> Result<Self> {
        let scaler_width = scaler
            .n_features()
            .ok_or(CarbonError::NotFitted("StandardScaler"))?;
        if !forest.is_fitted() {
            return Err(CarbonError::NotFitted("RandomForestRegressor"));
        }
        if scaler_width != N_INPUTS {
            return Err(CarbonError::dimension_mismatch(
                "scaler n_features",
                N_INPUTS,
                scaler_width,
            ));
        }
        if forest.n_features() != N_INPUTS {
            return Err(CarbonError::dimension_mismatch(
                "forest n_features",
                N_INPUTS,
                forest.n_features(),
            ));
        }
        Ok(Self { scaler, forest })
    }

    /// Generates the synthetic corpus, fits the scaler and the forest.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are degenerate (zero samples or
    /// trees).
    pub fn train(params: &TrainingParams) -> Result<(Self, TrainingReport)> {
        let corpus = SyntheticGenerator::new(params.training_samples)
            .with_seed(params.random_state)
            .generate()?;

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&corpus.inputs)?;

        let mut forest = RandomForestRegressor::new(params.n_estimators)
            .with_max_depth(params.max_depth)
            .with_min_samples_split(params.min_samples_split)
            .with_min_samples_leaf(params.min_samples_leaf)
            .with_random_state(params.random_state);
        forest.fit(&scaled, &corpus.target)?;

        let report = TrainingReport {
            samples: corpus.len(),
            n_estimators: forest.n_trees(),
            r_squared: forest.score(&scaled, &corpus.target)?,
        };
        Ok((Self::new(scaler, forest)?, report))
    }

    /// Scales one row of raw inputs and predicts its emission.
    ///
    /// # Errors
    ///
    /// Returns an error if prediction fails.
    pub fn predict_one(&self, inputs: &[f64; N_INPUTS]) -> Result<f64> {
        let row = Matrix::from_f64_rows(&[*inputs], N_INPUTS)?;
        let scaled = self.scaler.transform(&row)?;
        let prediction = self.forest.predict(&scaled)?;
        Ok(f64::from(prediction[0]))
    }

    /// Forest importances, one per input, summing to 1.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f32> {
        self.forest
            .feature_importances()
            .unwrap_or_else(|| vec![1.0 / N_INPUTS as f32; N_INPUTS])
    }

    /// The fitted scaler.
    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// The fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForestRegressor {
        &self.forest
    }
}
