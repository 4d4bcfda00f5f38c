//! Centroid-based clustering.
//!
//! [`KMeans`] partitions standardized feature rows into `k` groups with
//! Lloyd's algorithm and seeded k-means++ initialization.

use crate::error::{CarbonError, Result};
use crate::metrics::inertia;
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed used when none is configured.
pub const DEFAULT_RANDOM_STATE: u64 = 42;

/// K-Means clustering algorithm.
///
/// # Algorithm
///
/// 1. Initialize centroids using k-means++ driven by the seed
/// 2. Assign each sample to nearest centroid
/// 3. Update centroids as mean of assigned samples (an emptied cluster
///    keeps its previous centroid)
/// 4. Repeat until convergence or max iterations
///
/// # Examples
///
/// ```
/// use carbonsense::prelude::*;
///
/// let data = Matrix::from_vec(6, 2, vec![
///     1.0, 2.0,
///     1.5, 1.8,
///     5.0, 8.0,
///     8.0, 8.0,
///     1.0, 0.6,
///     9.0, 11.0,
/// ]).expect("Valid matrix dimensions and data length");
///
/// let mut kmeans = KMeans::new(2);
/// kmeans.fit(&data).expect("Fit succeeds with valid data");
///
/// let labels = kmeans.labels().expect("fitted");
/// assert_eq!(labels.len(), 6);
/// ```
///
/// # Performance
///
/// - Time complexity: O(nkdi) where n=samples, k=clusters, d=features, i=iterations
/// - Space complexity: O(nk)
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Number of clusters.
    n_clusters: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance.
    tol: f32,
    /// Random seed for initialization.
    random_state: Option<u64>,
    /// Cluster centroids after fitting.
    centroids: Option<Matrix<f32>>,
    /// Labels for training data.
    labels: Option<Vec<usize>>,
    /// Sum of squared distances (inertia).
    inertia: f32,
    /// Number of iterations run.
    n_iter: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(3)
    }
}

impl KMeans {
    /// Creates a new K-Means with the specified number of clusters.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            random_state: None,
            centroids: None,
            labels: None,
            inertia: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Number of clusters requested.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Returns the cluster centroids.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted.
    pub fn centroids(&self) -> Result<&Matrix<f32>> {
        self.centroids
            .as_ref()
            .ok_or(CarbonError::NotFitted("KMeans"))
    }

    /// Returns the labels assigned to the training rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted.
    pub fn labels(&self) -> Result<&[usize]> {
        self.labels
            .as_deref()
            .ok_or(CarbonError::NotFitted("KMeans"))
    }

    /// Returns the inertia (within-cluster sum of squares).
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Returns the number of iterations run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.centroids.is_some()
    }

    fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    /// Initializes centroids using k-means++ (D² weighted sampling).
    fn kmeans_plusplus_init(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let (n_samples, n_features) = x.shape();
        let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or(DEFAULT_RANDOM_STATE));

        let mut chosen: Vec<usize> = Vec::with_capacity(self.n_clusters);
        chosen.push(rng.gen_range(0..n_samples));

        let mut min_distances = vec![f32::INFINITY; n_samples];

        while chosen.len() < self.n_clusters {
            let last = x.row_slice(chosen[chosen.len() - 1]);
            for (i, min_dist) in min_distances.iter_mut().enumerate() {
                let d = Self::squared_distance(x.row_slice(i), last);
                if d < *min_dist {
                    *min_dist = d;
                }
            }

            let total: f64 = min_distances.iter().map(|&d| f64::from(d)).sum();
            let next = if total > 0.0 {
                let mut target = rng.gen::<f64>() * total;
                let mut pick = min_distances
                    .iter()
                    .rposition(|&d| d > 0.0)
                    .unwrap_or(n_samples - 1);
                for (i, &d) in min_distances.iter().enumerate() {
                    target -= f64::from(d);
                    if target <= 0.0 && d > 0.0 {
                        pick = i;
                        break;
                    }
                }
                pick
            } else {
                // Every point already sits on a centroid: take any unused row
                (0..n_samples)
                    .find(|i| !chosen.contains(i))
                    .unwrap_or(0)
            };
            chosen.push(next);
        }

        let mut centroids_data = Vec::with_capacity(self.n_clusters * n_features);
        for &idx in &chosen {
            centroids_data.extend_from_slice(x.row_slice(idx));
        }
        Matrix::from_vec(self.n_clusters, n_features, centroids_data)
    }

    /// Assigns each sample to the nearest centroid.
    fn assign_labels(&self, x: &Matrix<f32>, centroids: &Matrix<f32>) -> Vec<usize> {
        (0..x.n_rows())
            .map(|i| {
                let point = x.row_slice(i);
                let mut min_dist = f32::INFINITY;
                let mut min_cluster = 0;
                for k in 0..centroids.n_rows() {
                    let dist = Self::squared_distance(point, centroids.row_slice(k));
                    if dist < min_dist {
                        min_dist = dist;
                        min_cluster = k;
                    }
                }
                min_cluster
            })
            .collect()
    }

    /// Updates centroids as the mean of assigned samples.
    fn update_centroids(
        &self,
        x: &Matrix<f32>,
        labels: &[usize],
        previous: &Matrix<f32>,
    ) -> Result<Matrix<f32>> {
        let (_, n_features) = x.shape();
        let mut sums = vec![0.0_f64; self.n_clusters * n_features];
        let mut counts = vec![0usize; self.n_clusters];

        for (i, &label) in labels.iter().enumerate() {
            counts[label] += 1;
            for j in 0..n_features {
                sums[label * n_features + j] += f64::from(x.get(i, j));
            }
        }

        let mut new_centroids = Vec::with_capacity(self.n_clusters * n_features);
        for k in 0..self.n_clusters {
            for j in 0..n_features {
                if counts[k] > 0 {
                    new_centroids.push((sums[k * n_features + j] / counts[k] as f64) as f32);
                } else {
                    new_centroids.push(previous.get(k, j));
                }
            }
        }

        Matrix::from_vec(self.n_clusters, n_features, new_centroids)
    }

    /// Checks if centroids have converged.
    fn centroids_converged(&self, old: &Matrix<f32>, new: &Matrix<f32>) -> bool {
        (0..old.n_rows()).all(|k| {
            Self::squared_distance(old.row_slice(k), new.row_slice(k)) <= self.tol * self.tol
        })
    }
}

impl UnsupervisedEstimator for KMeans {
    type Labels = Vec<usize>;

    /// Fits the K-Means model to data.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Data is empty
    /// - `n_clusters` is zero
    /// - Data has fewer samples than clusters
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let n_samples = x.n_rows();

        if n_samples == 0 {
            return Err(CarbonError::empty_input("cannot cluster zero samples"));
        }
        if self.n_clusters == 0 {
            return Err(CarbonError::InvalidHyperparameter {
                param: "n_clusters".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }
        if n_samples < self.n_clusters {
            return Err(CarbonError::InvalidHyperparameter {
                param: "n_clusters".to_string(),
                value: self.n_clusters.to_string(),
                constraint: format!("<= n_samples ({n_samples})"),
            });
        }

        let mut centroids = self.kmeans_plusplus_init(x)?;
        let mut labels = self.assign_labels(x, &centroids);
        self.n_iter = 0;

        for iter in 0..self.max_iter {
            let new_centroids = self.update_centroids(x, &labels, &centroids)?;
            let converged = self.centroids_converged(&centroids, &new_centroids);
            centroids = new_centroids;
            labels = self.assign_labels(x, &centroids);
            self.n_iter = iter + 1;
            if converged {
                break;
            }
        }

        self.inertia = inertia(x, &centroids, &labels);
        self.labels = Some(labels);
        self.centroids = Some(centroids);

        Ok(())
    }

    /// Predicts cluster labels for new data.
    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        let centroids = self.centroids()?;
        if x.n_cols() != centroids.n_cols() {
            return Err(CarbonError::dimension_mismatch(
                "n_features",
                centroids.n_cols(),
                x.n_cols(),
            ));
        }
        Ok(self.assign_labels(x, centroids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> Matrix<f32> {
        // Two well-separated clusters
        Matrix::from_vec(
            6,
            2,
            vec![1.0, 2.0, 1.5, 1.8, 1.0, 0.6, 8.0, 8.0, 9.0, 11.0, 8.5, 9.0],
        )
        .expect("valid matrix")
    }

    #[test]
    fn test_new() {
        let kmeans = KMeans::new(3);
        assert_eq!(kmeans.n_clusters(), 3);
        assert!(!kmeans.is_fitted());
        assert!(kmeans.centroids().is_err());
    }

    #[test]
    fn test_fit_basic() {
        let mut kmeans = KMeans::new(2);
        kmeans.fit(&sample_data()).expect("fit");

        assert!(kmeans.is_fitted());
        assert_eq!(kmeans.centroids().expect("fitted").shape(), (2, 2));
        assert!(kmeans.inertia() >= 0.0);
    }

    #[test]
    fn test_labels_consistency() {
        let data = sample_data();
        let mut kmeans = KMeans::new(2).with_random_state(42);
        kmeans.fit(&data).expect("fit");

        let labels = kmeans.predict(&data).expect("fitted");
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
        assert_eq!(kmeans.labels().expect("fitted"), labels.as_slice());
    }

    #[test]
    fn test_empty_data_error() {
        let mut kmeans = KMeans::new(2);
        let result = kmeans.fit(&Matrix::zeros(0, 2));
        assert!(matches!(result, Err(CarbonError::EmptyInput(_))));
    }

    #[test]
    fn test_zero_clusters_error() {
        let mut kmeans = KMeans::new(0);
        assert!(kmeans.fit(&sample_data()).is_err());
    }

    #[test]
    fn test_too_many_clusters_error() {
        let data = Matrix::from_vec(3, 2, vec![1.0; 6]).expect("valid matrix");
        let mut kmeans = KMeans::new(5);
        assert!(matches!(
            kmeans.fit(&data),
            Err(CarbonError::InvalidHyperparameter { .. })
        ));
    }

    #[test]
    fn test_single_sample_single_cluster() {
        let data = Matrix::from_vec(1, 3, vec![0.0, 0.0, 0.0]).expect("valid matrix");
        let mut kmeans = KMeans::new(1);
        kmeans.fit(&data).expect("fit");
        assert_eq!(kmeans.labels().expect("fitted"), &[0]);
        assert!(kmeans.inertia() < 1e-9);
    }

    #[test]
    fn test_reproducibility() {
        let data = sample_data();

        let mut a = KMeans::new(2).with_random_state(7);
        a.fit(&data).expect("fit");
        let mut b = KMeans::new(2).with_random_state(7);
        b.fit(&data).expect("fit");

        assert_eq!(a.centroids().expect("fitted"), b.centroids().expect("fitted"));
        assert_eq!(a.labels().expect("fitted"), b.labels().expect("fitted"));
    }

    #[test]
    fn test_identical_points_do_not_panic() {
        let data = Matrix::from_vec(5, 2, vec![1.0; 10]).expect("valid matrix");

        let mut kmeans = KMeans::new(3).with_random_state(42);
        kmeans.fit(&data).expect("fit");

        let labels = kmeans.labels().expect("fitted");
        assert!(labels.iter().all(|&l| l == labels[0]));
        assert!(kmeans.inertia() < 1e-6);
    }

    #[test]
    fn test_exact_k_samples() {
        let data = Matrix::from_vec(3, 2, vec![0.0, 0.0, 5.0, 5.0, 10.0, 10.0])
            .expect("valid matrix");

        let mut kmeans = KMeans::new(3).with_random_state(42);
        kmeans.fit(&data).expect("fit");

        let labels = kmeans.labels().expect("fitted");
        assert_ne!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
        assert_ne!(labels[0], labels[2]);
        assert!(kmeans.inertia() < 1e-6);
    }

    #[test]
    fn test_three_clusters() {
        let data = Matrix::from_vec(
            9,
            2,
            vec![
                0.0, 0.0, 0.1, 0.1, 0.2, 0.0, 5.0, 5.0, 5.1, 5.1, 5.0, 5.2, 10.0, 0.0, 10.1, 0.1,
                10.0, 0.2,
            ],
        )
        .expect("valid matrix");

        let mut kmeans = KMeans::new(3).with_random_state(42);
        kmeans.fit(&data).expect("fit");

        let mut unique: Vec<usize> = kmeans.labels().expect("fitted").to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_max_iter_limit() {
        let mut kmeans = KMeans::new(2).with_max_iter(1).with_random_state(42);
        kmeans.fit(&sample_data()).expect("fit");
        assert_eq!(kmeans.n_iter(), 1);
    }

    #[test]
    fn test_inertia_decreases_with_more_clusters() {
        let data = sample_data();
        let mut one = KMeans::new(1).with_random_state(42);
        one.fit(&data).expect("fit");
        let mut two = KMeans::new(2).with_random_state(42);
        two.fit(&data).expect("fit");
        assert!(two.inertia() <= one.inertia());
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let mut kmeans = KMeans::new(2).with_random_state(42);
        kmeans.fit(&sample_data()).expect("fit");
        let wrong = Matrix::from_vec(1, 3, vec![0.0, 0.0, 0.0]).expect("valid matrix");
        assert!(kmeans.predict(&wrong).is_err());
    }
}
