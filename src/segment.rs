//! Batch segmentation of user profiles into lifestyle clusters.
//!
//! The pipeline for one request is:
//!
//! 1. derive a [`FeatureVector`] per profile
//! 2. standardize the batch with a freshly fitted [`StandardScaler`]
//! 3. run [`KMeans`] with `k = min(n_clusters, n)`
//! 4. summarize each non-empty cluster over the raw features
//! 5. label each summary with the first matching lifestyle rule
//!
//! Nothing is cached between calls. The same profile may land in a
//! different cluster when the surrounding cohort changes.

use crate::cluster::{KMeans, DEFAULT_RANDOM_STATE};
use crate::error::{CarbonError, Result};
use crate::features::{FeatureNormalizer, FeatureVector, N_FEATURES};
use crate::preprocessing::StandardScaler;
use crate::primitives::{round_to, Matrix};
use crate::profile::UserProfile;
use crate::rules::{first_match, Rule};
use crate::traits::{Transformer, UnsupervisedEstimator};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Semantic lifestyle category attached to a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifestyleSegment {
    /// Low transport and electricity footprint
    #[serde(rename = "Low-Impact / Eco-conscious")]
    LowImpact,
    /// Moderate transport footprint
    #[serde(rename = "Moderate Lifestyle")]
    Moderate,
    /// Everything else
    #[serde(rename = "High-Impact / Energy Intensive")]
    HighImpact,
}

impl LifestyleSegment {
    /// All segments, from lowest to highest impact.
    pub const ALL: [LifestyleSegment; 3] = [Self::LowImpact, Self::Moderate, Self::HighImpact];

    /// Human-readable label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LowImpact => "Low-Impact / Eco-conscious",
            Self::Moderate => "Moderate Lifestyle",
            Self::HighImpact => "High-Impact / Energy Intensive",
        }
    }

    /// Parses a label produced by [`as_str`](Self::as_str).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl fmt::Display for LifestyleSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labeling cascade over a cluster's mean raw features.
///
/// Thresholds are strict, so boundary values fall through to the next rule.
pub const LIFESTYLE_RULES: &[Rule<FeatureVector, LifestyleSegment>] = &[
    Rule::new(
        "low-transport-low-electricity",
        |m| m.transport_emission < 1.0 && m.electricity < 4.0,
        LifestyleSegment::LowImpact,
    ),
    Rule::new(
        "moderate-transport",
        |m| m.transport_emission < 2.5,
        LifestyleSegment::Moderate,
    ),
    Rule::new("catch-all", |_| true, LifestyleSegment::HighImpact),
];

/// Labels a vector of mean raw features.
#[must_use]
pub fn label_means(means: &FeatureVector) -> LifestyleSegment {
    first_match(LIFESTYLE_RULES, means)
        .copied()
        .unwrap_or(LifestyleSegment::HighImpact)
}

/// Mean raw features and size of one non-empty cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Cluster index within this batch
    pub cluster_label: usize,
    /// Per-feature means, rounded to 2 decimals
    #[serde(flatten)]
    pub means: FeatureVector,
    /// Number of profiles assigned to the cluster
    pub users_in_cluster: usize,
}

impl ClusterSummary {
    /// Lifestyle label for this cluster.
    #[must_use]
    pub fn label(&self) -> LifestyleSegment {
        label_means(&self.means)
    }
}

/// Summarizes each non-empty cluster, ordered by cluster index.
#[must_use]
pub fn summarize(features: &[FeatureVector], assignments: &[usize]) -> Vec<ClusterSummary> {
    let mut groups: BTreeMap<usize, ([f64; N_FEATURES], usize)> = BTreeMap::new();
    for (vector, &cluster) in features.iter().zip(assignments) {
        let entry = groups.entry(cluster).or_insert(([0.0; N_FEATURES], 0));
        for (acc, value) in entry.0.iter_mut().zip(vector.to_array()) {
            *acc += value;
        }
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(cluster_label, (sums, count))| ClusterSummary {
            cluster_label,
            means: FeatureVector::from_array(sums.map(|s| round_to(s / count as f64, 2))),
            users_in_cluster: count,
        })
        .collect()
}

/// Runs the segmentation pipeline.
#[derive(Debug, Clone)]
pub struct SegmentationEngine {
    n_clusters: usize,
    random_state: u64,
    max_iter: usize,
}

impl Default for SegmentationEngine {
    fn default() -> Self {
        Self::new(3)
    }
}

impl SegmentationEngine {
    /// Creates an engine that asks for at most `n_clusters` clusters.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            random_state: DEFAULT_RANDOM_STATE,
            max_iter: 300,
        }
    }

    /// Sets the k-means seed.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Sets the k-means iteration cap.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Configured upper bound on the cluster count.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Segments a batch of profiles.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::EmptyInput`] for an empty batch and
    /// [`CarbonError::InvalidHyperparameter`] if the engine was built with
    /// zero clusters.
    pub fn segment<R: Rng>(
        &self,
        profiles: Vec<UserProfile>,
        normalizer: &mut FeatureNormalizer<R>,
    ) -> Result<ClusterOutcome> {
        let features = normalizer.normalize_batch(&profiles)?;
        let assignments = self.assign(&features)?;
        let summaries = summarize(&features, &assignments);
        let labels = summaries
            .iter()
            .map(|s| (s.cluster_label, s.label()))
            .collect();

        Ok(ClusterOutcome {
            profiles,
            features,
            assignments,
            summaries,
            labels,
        })
    }

    /// Clusters already-derived feature vectors, one index per row.
    ///
    /// # Errors
    ///
    /// See [`segment`](Self::segment).
    pub fn assign(&self, features: &[FeatureVector]) -> Result<Vec<usize>> {
        if features.is_empty() {
            return Err(CarbonError::empty_input("no profiles provided"));
        }
        if self.n_clusters == 0 {
            return Err(CarbonError::InvalidHyperparameter {
                param: "n_clusters".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }

        let n = features.len();
        let k = self.n_clusters.min(n);
        tracing::debug!(n, k, "clustering profile batch");

        let rows: Vec<[f64; N_FEATURES]> = features.iter().map(FeatureVector::to_array).collect();
        let raw = Matrix::from_f64_rows(&rows, N_FEATURES)?;
        let scaled = StandardScaler::new().fit_transform(&raw)?;

        let mut kmeans = KMeans::new(k)
            .with_random_state(self.random_state)
            .with_max_iter(self.max_iter);
        kmeans.fit(&scaled)?;
        Ok(kmeans.labels()?.to_vec())
    }
}

/// Result of segmenting one batch.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    profiles: Vec<UserProfile>,
    features: Vec<FeatureVector>,
    assignments: Vec<usize>,
    summaries: Vec<ClusterSummary>,
    labels: BTreeMap<usize, LifestyleSegment>,
}

impl ClusterOutcome {
    /// Number of profiles in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if the batch was empty (never the case for a built outcome).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Cluster index per profile, in input order.
    #[must_use]
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    /// Derived features per profile, in input order.
    #[must_use]
    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    /// Summaries of the non-empty clusters.
    #[must_use]
    pub fn summaries(&self) -> &[ClusterSummary] {
        &self.summaries
    }

    /// Cluster index to lifestyle label.
    #[must_use]
    pub fn labels(&self) -> &BTreeMap<usize, LifestyleSegment> {
        &self.labels
    }

    /// Lifestyle label of the profile at `index`.
    #[must_use]
    pub fn segment_of(&self, index: usize) -> Option<LifestyleSegment> {
        let cluster = self.assignments.get(index)?;
        self.labels.get(cluster).copied()
    }

    /// Finds the first profile whose `_id` or `userId` renders to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::UserNotFound`] when no profile matches.
    pub fn find_user(&self, user_id: &str) -> Result<(usize, LifestyleSegment)> {
        self.profiles
            .iter()
            .position(|p| p.matches_id(user_id))
            .and_then(|index| self.segment_of(index).map(|segment| (index, segment)))
            .ok_or_else(|| CarbonError::UserNotFound(user_id.to_string()))
    }

    /// Each input profile echoed back with its derived features,
    /// `cluster_label` and `cluster_label_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if a profile cannot be serialized.
    pub fn annotated_profiles(&self) -> Result<Vec<Value>> {
        self.profiles
            .iter()
            .enumerate()
            .map(|(i, profile)| {
                let mut object = match serde_json::to_value(profile)? {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                for (name, value) in self.features[i].named() {
                    object.insert(name.to_string(), Value::from(value));
                }
                let cluster = self.assignments[i];
                object.insert("cluster_label".to_string(), Value::from(cluster));
                object.insert(
                    "cluster_label_name".to_string(),
                    self.labels
                        .get(&cluster)
                        .map_or(Value::Null, |s| Value::from(s.as_str())),
                );
                Ok(Value::Object(object))
            })
            .collect()
    }
}
