//! Random Forest regression.

use super::DecisionTreeRegressor;
use crate::error::{CarbonError, Result};
use crate::primitives::{Matrix, Vector};
use crate::serialization::write_atomic;
use crate::traits::Estimator;
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Random Forest regressor.
///
/// An ensemble of decision trees, each trained on a bootstrap sample of the
/// training rows. Predictions are the mean of the individual trees. Trees are
/// fitted in parallel; tree `i` draws its bootstrap sample from a generator
/// seeded with `random_state + i`, so a fixed `random_state` gives the same
/// forest regardless of scheduling.
///
/// # Examples
///
/// ```
/// use carbonsense::prelude::*;
///
/// let x = Matrix::from_vec(8, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
///     .expect("valid matrix");
/// let y = Vector::from_slice(&[2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0]);
///
/// let mut forest = RandomForestRegressor::new(10)
///     .with_max_depth(5)
///     .with_random_state(42);
/// forest.fit(&x, &y).expect("fit succeeds");
///
/// let importances = forest.feature_importances().expect("fitted");
/// assert!((importances.iter().sum::<f32>() - 1.0).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTreeRegressor>,
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    random_state: Option<u64>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Creates a new Random Forest regressor with `n_estimators` trees.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: None,
            n_features: 0,
        }
    }

    /// Sets the maximum depth of each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the minimum samples required to split a node in each tree.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets the minimum samples required at each leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Sets the random state for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Number of trees the forest will train.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Number of trained trees (0 until fitted).
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of input features seen during fit.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Returns true once the forest holds trained trees.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Mean-decrease-in-impurity importances, one per feature, summing to 1.
    ///
    /// Each tree's importances are normalized, averaged across trees and
    /// renormalized. A forest whose trees never split reports a uniform
    /// distribution.
    ///
    /// Returns `None` if the forest is not fitted.
    #[must_use]
    pub fn feature_importances(&self) -> Option<Vec<f32>> {
        if self.trees.is_empty() || self.n_features == 0 {
            return None;
        }

        let mut totals = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            let raw = tree.raw_importances()?;
            let tree_total: f64 = raw.iter().sum();
            if tree_total > 0.0 {
                for (acc, v) in totals.iter_mut().zip(raw) {
                    *acc += v / tree_total;
                }
            }
        }

        let sum: f64 = totals.iter().sum();
        if sum <= 0.0 {
            let uniform = 1.0 / self.n_features as f32;
            return Some(vec![uniform; self.n_features]);
        }
        Some(totals.iter().map(|v| (v / sum) as f32).collect())
    }

    /// Saves the fitted forest as a bincode blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the forest is unfitted, serialization fails or
    /// the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if !self.is_fitted() {
            return Err(CarbonError::NotFitted("RandomForestRegressor"));
        }
        let bytes = bincode::serialize(self)
            .map_err(|e| CarbonError::Serialization(format!("forest encoding failed: {e}")))?;
        write_atomic(path.as_ref(), &bytes)
    }

    /// Loads a forest previously written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::Io`] if the file cannot be read and
    /// [`CarbonError::Format`] if it does not decode to a fitted forest whose
    /// splits all read features the forest was trained on.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let model: Self = bincode::deserialize(&bytes)
            .map_err(|e| CarbonError::format(path, format!("forest decoding failed: {e}")))?;
        if !model.is_fitted() {
            return Err(CarbonError::format(path, "forest contains no trees"));
        }
        for (i, tree) in model.trees.iter().enumerate() {
            if tree.n_features() != model.n_features {
                return Err(CarbonError::format(
                    path,
                    format!(
                        "tree {i} expects {} features, forest expects {}",
                        tree.n_features(),
                        model.n_features
                    ),
                ));
            }
            tree.check_structure()
                .map_err(|e| CarbonError::format(path, format!("tree {i}: {e}")))?;
        }
        Ok(model)
    }

    #[cfg(test)]
    pub(crate) fn trees_mut(&mut self) -> &mut [DecisionTreeRegressor] {
        &mut self.trees
    }

    fn tree_template(&self) -> DecisionTreeRegressor {
        let tree = DecisionTreeRegressor::new()
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf);
        match self.max_depth {
            Some(depth) => tree.with_max_depth(depth),
            None => tree,
        }
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Estimator for RandomForestRegressor {
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples != y.len() {
            return Err(CarbonError::dimension_mismatch(
                "n_samples",
                n_samples,
                y.len(),
            ));
        }
        if n_samples == 0 {
            return Err(CarbonError::empty_input("cannot fit forest with zero samples"));
        }
        if self.n_estimators == 0 {
            return Err(CarbonError::InvalidHyperparameter {
                param: "n_estimators".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }

        let template = self.tree_template();
        let random_state = self.random_state;

        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let seed = random_state.map(|s| s.wrapping_add(i as u64));
                let indices = bootstrap_sample(n_samples, seed);
                let x_boot = x.select_rows(&indices);
                let y_boot: Vec<f32> = indices.iter().map(|&idx| y[idx]).collect();

                let mut tree = template.clone();
                tree.fit(&x_boot, &Vector::from_vec(y_boot))?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = n_features;
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>> {
        if self.trees.is_empty() {
            return Err(CarbonError::NotFitted("RandomForestRegressor"));
        }
        if x.n_cols() != self.n_features {
            return Err(CarbonError::dimension_mismatch(
                "n_features",
                self.n_features,
                x.n_cols(),
            ));
        }

        let n_trees = self.trees.len() as f64;
        let predictions = (0..x.n_rows())
            .map(|row| {
                let sample = x.row_slice(row);
                let total = self
                    .trees
                    .iter()
                    .map(|tree| tree.predict_one(sample).map(f64::from))
                    .sum::<Result<f64>>()?;
                Ok((total / n_trees) as f32)
            })
            .collect::<Result<Vec<f32>>>()?;

        Ok(Vector::from_vec(predictions))
    }
}

/// Draws `n_samples` row indices with replacement.
fn bootstrap_sample(n_samples: usize, random_state: Option<u64>) -> Vec<usize> {
    let dist = Uniform::from(0..n_samples);

    match random_state {
        Some(seed) => {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            (0..n_samples).map(|_| dist.sample(&mut rng)).collect()
        }
        None => {
            let mut rng = rand::thread_rng();
            (0..n_samples).map(|_| dist.sample(&mut rng)).collect()
        }
    }
}
