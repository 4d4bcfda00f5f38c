//! Regression trees and the random forest ensemble built on them.
//!
//! This module implements:
//! - CART regression trees using the squared-error criterion
//! - Random Forest regression over bootstrap samples
//! - Mean-decrease-in-impurity feature importances
//!
//! # Example
//!
//! ```
//! use carbonsense::prelude::*;
//! use carbonsense::tree::DecisionTreeRegressor;
//!
//! let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).expect("valid matrix");
//! let y = Vector::from_slice(&[1.0, 1.0, 5.0, 5.0]);
//!
//! let mut tree = DecisionTreeRegressor::new().with_max_depth(2);
//! tree.fit(&x, &y).expect("fit should succeed");
//! let predictions = tree.predict(&x).expect("fitted");
//! assert!((predictions[2] - 5.0).abs() < 1e-6);
//! ```

mod random_forest;

pub use random_forest::RandomForestRegressor;

use crate::error::{CarbonError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};

/// Leaf node in a regression tree.
///
/// Contains the predicted value (mean of training samples) and number of
/// training samples that reached this leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionLeaf {
    /// Predicted value for this leaf (mean of y values)
    pub value: f32,
    /// Number of training samples in this leaf
    pub n_samples: usize,
}

/// Internal node in a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionNode {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f32,
    /// Number of training samples reaching this node
    pub n_samples: usize,
    /// Reduction in summed squared error achieved by this split
    pub impurity_decrease: f32,
    /// Left subtree (samples where feature <= threshold)
    pub left: Box<RegressionTreeNode>,
    /// Right subtree (samples where feature > threshold)
    pub right: Box<RegressionTreeNode>,
}

/// A node in a regression tree (either internal node or leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegressionTreeNode {
    /// Internal decision node with split condition
    Node(RegressionNode),
    /// Leaf node with value prediction
    Leaf(RegressionLeaf),
}

impl RegressionTreeNode {
    /// Returns the depth of the tree rooted at this node.
    ///
    /// Leaf nodes have depth 0, internal nodes have depth 1 + max(left, right).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            RegressionTreeNode::Leaf(_) => 0,
            RegressionTreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    /// Number of leaves under this node.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            RegressionTreeNode::Leaf(_) => 1,
            RegressionTreeNode::Node(node) => node.left.n_leaves() + node.right.n_leaves(),
        }
    }

    // None when a split reads past the end of `sample`
    fn predict_one(&self, sample: &[f32]) -> Option<f32> {
        let mut node = self;
        loop {
            match node {
                RegressionTreeNode::Leaf(leaf) => return Some(leaf.value),
                RegressionTreeNode::Node(internal) => {
                    node = if *sample.get(internal.feature_idx)? <= internal.threshold {
                        &internal.left
                    } else {
                        &internal.right
                    };
                }
            }
        }
    }

    /// Checks that every split reads a feature below `n_features` and that
    /// every threshold and leaf value is finite.
    fn check(&self, n_features: usize) -> std::result::Result<(), String> {
        match self {
            RegressionTreeNode::Leaf(leaf) if !leaf.value.is_finite() => {
                Err(format!("leaf value {} is not finite", leaf.value))
            }
            RegressionTreeNode::Leaf(_) => Ok(()),
            RegressionTreeNode::Node(node) => {
                if node.feature_idx >= n_features {
                    return Err(format!(
                        "split on feature {} but the tree has {n_features} features",
                        node.feature_idx
                    ));
                }
                if !node.threshold.is_finite() {
                    return Err(format!("split threshold {} is not finite", node.threshold));
                }
                node.left.check(n_features)?;
                node.right.check(n_features)
            }
        }
    }

    fn accumulate_importances(&self, importances: &mut [f64]) {
        if let RegressionTreeNode::Node(n) = self {
            if let Some(slot) = importances.get_mut(n.feature_idx) {
                *slot += f64::from(n.impurity_decrease);
            }
            n.left.accumulate_importances(importances);
            n.right.accumulate_importances(importances);
        }
    }
}

/// Decision tree regressor using the CART algorithm.
///
/// Uses the squared-error criterion. Candidate thresholds are midpoints
/// between consecutive distinct feature values, scanned with running sums
/// over the sorted samples. Leaf nodes predict the mean of target values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    tree: Option<RegressionTreeNode>,
    n_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

impl DecisionTreeRegressor {
    /// Creates a new decision tree regressor with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: None,
            n_features: 0,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the minimum number of samples required to split an internal node.
    ///
    /// Values below 2 are raised to 2.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets the minimum number of samples required to be at a leaf node.
    ///
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Root of the fitted tree, if any.
    #[must_use]
    pub fn root(&self) -> Option<&RegressionTreeNode> {
        self.tree.as_ref()
    }

    /// Returns true if the tree has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.tree.is_some()
    }

    /// Number of input features seen during fit.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Predicts the value for a single sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree is not fitted or the sample width is wrong.
    pub fn predict_one(&self, sample: &[f32]) -> Result<f32> {
        let tree = self
            .tree
            .as_ref()
            .ok_or(CarbonError::NotFitted("DecisionTreeRegressor"))?;
        if sample.len() != self.n_features {
            return Err(CarbonError::dimension_mismatch(
                "n_features",
                self.n_features,
                sample.len(),
            ));
        }
        tree.predict_one(sample).ok_or_else(|| {
            CarbonError::Other("tree splits on a feature outside the sample".to_string())
        })
    }

    /// Verifies the fitted tree against its recorded feature count.
    ///
    /// Used when a tree arrives from disk rather than from [`fit`](Estimator::fit).
    pub(crate) fn check_structure(&self) -> std::result::Result<(), String> {
        match &self.tree {
            Some(root) => root.check(self.n_features),
            None => Err("tree is not fitted".to_string()),
        }
    }

    #[cfg(test)]
    pub(crate) fn root_mut(&mut self) -> Option<&mut RegressionTreeNode> {
        self.tree.as_mut()
    }

    /// Raw (unnormalized) impurity decrease attributed to each feature.
    #[must_use]
    pub fn raw_importances(&self) -> Option<Vec<f64>> {
        let tree = self.tree.as_ref()?;
        let mut importances = vec![0.0; self.n_features];
        tree.accumulate_importances(&mut importances);
        Some(importances)
    }

    /// Feature importances normalized to sum to 1.0.
    ///
    /// A tree without any split reports all zeros.
    #[must_use]
    pub fn feature_importances(&self) -> Option<Vec<f32>> {
        let raw = self.raw_importances()?;
        let total: f64 = raw.iter().sum();
        Some(
            raw.iter()
                .map(|&v| if total > 0.0 { (v / total) as f32 } else { 0.0 })
                .collect(),
        )
    }
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for DecisionTreeRegressor {
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        let (n_rows, n_cols) = x.shape();
        if n_rows != y.len() {
            return Err(CarbonError::dimension_mismatch("n_samples", n_rows, y.len()));
        }
        if n_rows == 0 {
            return Err(CarbonError::empty_input("cannot fit tree with zero samples"));
        }

        let builder = TreeBuilder {
            x,
            y: y.as_slice(),
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        };
        let indices: Vec<usize> = (0..n_rows).collect();
        self.tree = Some(builder.build(indices, 0));
        self.n_features = n_cols;
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>> {
        let predictions = (0..x.n_rows())
            .map(|row| self.predict_one(x.row_slice(row)))
            .collect::<Result<Vec<f32>>>()?;
        Ok(Vector::from_vec(predictions))
    }
}

/// Best split found for a node.
struct Split {
    feature_idx: usize,
    threshold: f32,
    impurity_decrease: f64,
}

/// Recursive CART builder working on row indices of the training matrix.
struct TreeBuilder<'a> {
    x: &'a Matrix<f32>,
    y: &'a [f32],
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

impl TreeBuilder<'_> {
    fn build(&self, indices: Vec<usize>, depth: usize) -> RegressionTreeNode {
        let n_samples = indices.len();
        let (sum, sum_sq) = self.sums(&indices);
        let parent_sse = sse(sum, sum_sq, n_samples);

        if n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|max_d| depth >= max_d)
            || parent_sse <= 1e-10 * n_samples as f64
        {
            return leaf(sum, n_samples);
        }

        let Some(split) = self.find_best_split(&indices, sum, sum_sq, parent_sse) else {
            return leaf(sum, n_samples);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x.get(i, split.feature_idx) <= split.threshold);

        if left.is_empty() || right.is_empty() {
            return leaf(sum, n_samples);
        }

        RegressionTreeNode::Node(RegressionNode {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            n_samples,
            impurity_decrease: split.impurity_decrease as f32,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        })
    }

    fn sums(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let v = f64::from(self.y[i]);
            (s + v, sq + v * v)
        })
    }

    fn find_best_split(
        &self,
        indices: &[usize],
        sum: f64,
        sum_sq: f64,
        parent_sse: f64,
    ) -> Option<Split> {
        let n = indices.len();
        let mut best: Option<Split> = None;
        let mut sorted = indices.to_vec();

        for feature_idx in 0..self.x.n_cols() {
            sorted.sort_by(|&a, &b| {
                self.x
                    .get(a, feature_idx)
                    .partial_cmp(&self.x.get(b, feature_idx))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let v = f64::from(self.y[sorted[pos]]);
                left_sum += v;
                left_sq += v * v;

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let here = self.x.get(sorted[pos], feature_idx);
                let next = self.x.get(sorted[pos + 1], feature_idx);
                if next <= here {
                    continue;
                }

                let child_sse = sse(left_sum, left_sq, n_left)
                    + sse(sum - left_sum, sum_sq - left_sq, n_right);
                let gain = parent_sse - child_sse;

                if gain > 0.0 && best.as_ref().map_or(true, |b| gain > b.impurity_decrease) {
                    let mid = here + (next - here) / 2.0;
                    // Guard against the midpoint rounding up onto `next`
                    let threshold = if mid < next { mid } else { here };
                    best = Some(Split {
                        feature_idx,
                        threshold,
                        impurity_decrease: gain,
                    });
                }
            }
        }

        best
    }
}

/// Summed squared error around the mean, clamped against rounding below zero.
fn sse(sum: f64, sum_sq: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (sum_sq - sum * sum / n as f64).max(0.0)
}

fn leaf(sum: f64, n_samples: usize) -> RegressionTreeNode {
    let value = if n_samples == 0 {
        0.0
    } else {
        (sum / n_samples as f64) as f32
    };
    RegressionTreeNode::Leaf(RegressionLeaf { value, n_samples })
}
