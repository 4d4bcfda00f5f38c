//! Request handlers over the core.
//!
//! [`CarbonService`] owns the shared emission model and exposes one method
//! per request kind. Payload shapes are plain serde types so any transport
//! (HTTP, CLI, queue) can pass them through unchanged.
//!
//! # Example
//!
//! ```
//! use carbonsense::config::ServiceConfig;
//! use carbonsense::service::{CarbonService, ClusterRequest};
//! use serde_json::json;
//!
//! let service = CarbonService::new(ServiceConfig::default()).expect("valid config");
//! let request: ClusterRequest = serde_json::from_value(json!({
//!     "profiles": [
//!         {"_id": "a", "avg_daily_travel_km": 2, "avg_electricity_kwh": 1},
//!         {"_id": "b", "avg_daily_travel_km": 40, "avg_electricity_kwh": 300}
//!     ],
//!     "seed": 7
//! })).expect("valid request");
//!
//! let response = service.cluster(request).expect("clustered");
//! assert_eq!(response.profiles.len(), 2);
//! ```

use crate::calculator::{compute_daily_emission, DailyActivity, DailyEmission};
use crate::config::ServiceConfig;
use crate::error::{CarbonError, Result};
use crate::features::FeatureNormalizer;
use crate::model::{ModelManager, TrainingReport};
use crate::predict::{EmissionPredictor, PredictionInput, PredictionResult};
use crate::profile::{ProfileId, UserProfile};
use crate::recommend::segment_recommendations;
use crate::segment::{ClusterOutcome, ClusterSummary, LifestyleSegment, SegmentationEngine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Batch segmentation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterRequest {
    /// Raw profile objects
    #[serde(default)]
    pub profiles: Vec<Value>,
    /// Pins the waste-fallback draw; omitted means a fresh draw per call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Overrides the configured cluster count for this call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_clusters: Option<usize>,
}

/// Batch segmentation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterResponse {
    /// Input profiles with derived features, `cluster_label` and `cluster_label_name`
    pub profiles: Vec<Value>,
    /// Cluster index to label
    pub labels: BTreeMap<usize, LifestyleSegment>,
    /// Per-cluster rounded means and member counts
    pub cluster_summary: Vec<ClusterSummary>,
}

/// Personal recommendation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendRequest {
    /// Identifier matched against each profile's `_id` and `userId`
    #[serde(rename = "userId", default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub profiles: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_clusters: Option<usize>,
}

/// Personal recommendation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendResponse {
    /// The identifier as supplied
    #[serde(rename = "userId")]
    pub user_id: Value,
    /// Lifestyle label of the user's cluster
    pub cluster: LifestyleSegment,
    pub recommendations: Vec<String>,
}

/// Retrain confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrainResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: TrainingReport,
}

/// Error payload for transports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&CarbonError> for ErrorBody {
    fn from(err: &CarbonError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Entry point for all request kinds.
#[derive(Debug, Clone)]
pub struct CarbonService {
    config: ServiceConfig,
    predictor: EmissionPredictor,
}

impl CarbonService {
    /// Builds a service with a model manager for the configured artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::Config`] if the configuration is invalid.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let manager = Arc::new(ModelManager::from_config(&config.model));
        Self::with_manager(config, manager)
    }

    /// Builds a service sharing an existing model manager.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::Config`] if the configuration is invalid.
    pub fn with_manager(config: ServiceConfig, manager: Arc<ModelManager>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            predictor: EmissionPredictor::new(manager),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The shared model manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<ModelManager> {
        self.predictor.manager()
    }

    /// Segments a batch of profiles.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::EmptyInput`] for an empty batch and
    /// [`CarbonError::InvalidField`] for a malformed profile.
    pub fn cluster(&self, request: ClusterRequest) -> Result<ClusterResponse> {
        let outcome = self.segment(request.profiles, request.seed, request.n_clusters)?;
        Ok(ClusterResponse {
            profiles: outcome.annotated_profiles()?,
            labels: outcome.labels().clone(),
            cluster_summary: outcome.summaries().to_vec(),
        })
    }

    /// Segments the batch and returns the advice for one user's cluster.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty batch or missing `userId`, and
    /// [`CarbonError::UserNotFound`] when no profile carries the identifier.
    pub fn recommend(&self, request: RecommendRequest) -> Result<RecommendResponse> {
        let user_value = request
            .user_id
            .filter(|v| !v.is_null())
            .ok_or_else(|| CarbonError::MissingFields(vec!["userId".to_string()]))?;
        let user_id = ProfileId::from_value(&user_value).ok_or_else(|| CarbonError::InvalidField {
            field: "userId".to_string(),
            reason: "expected a string or number".to_string(),
        })?;

        let outcome = self.segment(request.profiles, request.seed, request.n_clusters)?;
        let (_, segment) = outcome.find_user(user_id.as_str())?;

        Ok(RecommendResponse {
            user_id: user_value,
            cluster: segment,
            recommendations: segment_recommendations(segment)
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        })
    }

    /// Predicts next month's emission for one profile.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming missing or invalid fields, or
    /// [`CarbonError::ModelUnavailable`].
    pub fn predict(&self, payload: &Value) -> Result<PredictionResult> {
        let input = PredictionInput::from_json(payload)?;
        self.predictor.predict(&input)
    }

    /// Replaces the emission model with a freshly trained one.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::ModelUnavailable`] if training or persisting fails.
    pub fn retrain(&self) -> Result<RetrainResponse> {
        let report = self.manager().retrain()?;
        Ok(RetrainResponse {
            message: "Model retrained successfully".to_string(),
            report,
        })
    }

    /// Emission of a single logged activity.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::InvalidField`] for a malformed detail.
    pub fn daily_emission(&self, activity: &DailyActivity) -> Result<DailyEmission> {
        compute_daily_emission(activity)
    }

    fn segment(
        &self,
        raw_profiles: Vec<Value>,
        seed: Option<u64>,
        n_clusters: Option<usize>,
    ) -> Result<ClusterOutcome> {
        if raw_profiles.is_empty() {
            return Err(CarbonError::empty_input("no profiles provided"));
        }
        let profiles = raw_profiles
            .into_iter()
            .enumerate()
            .map(|(i, value)| UserProfile::from_value(i, value))
            .collect::<Result<Vec<_>>>()?;

        let clustering = &self.config.clustering;
        let engine = SegmentationEngine::new(n_clusters.unwrap_or(clustering.n_clusters))
            .with_random_state(clustering.random_state)
            .with_max_iter(clustering.max_iter);

        match seed {
            Some(seed) => engine.segment(profiles, &mut FeatureNormalizer::seeded(seed)),
            None => engine.segment(profiles, &mut FeatureNormalizer::from_entropy()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use serde_json::json;

    fn service_in(dir: &std::path::Path) -> CarbonService {
        let config = ServiceConfig {
            model: ModelConfig {
                dir: dir.to_path_buf(),
                n_estimators: 5,
                max_depth: 8,
                training_samples: 150,
                ..ModelConfig::default()
            },
            ..ServiceConfig::default()
        };
        CarbonService::new(config).expect("valid config")
    }

    fn cohort() -> Vec<Value> {
        vec![
            json!({"_id": "eco", "avg_daily_travel_km": 1, "avg_electricity_kwh": 1, "avg_waste_generated_kg": 1}),
            json!({"userId": 7, "avg_daily_travel_km": 9, "avg_electricity_kwh": 200, "avg_waste_generated_kg": 1}),
            json!({"_id": "high", "avg_daily_travel_km": 60, "avg_electricity_kwh": 400, "avg_waste_generated_kg": 1}),
        ]
    }

    #[test]
    fn test_cluster_response_shape() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = service_in(dir.path())
            .cluster(ClusterRequest {
                profiles: cohort(),
                seed: Some(1),
                n_clusters: None,
            })
            .expect("cluster");

        assert_eq!(response.profiles.len(), 3);
        let members: usize = response.cluster_summary.iter().map(|s| s.users_in_cluster).sum();
        assert_eq!(members, 3);
        let json = serde_json::to_value(&response).expect("serialize");
        assert!(json["labels"].is_object());
        assert!(json["profiles"][0]["cluster_label_name"].is_string());
    }

    #[test]
    fn test_cluster_request_k_override() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = service_in(dir.path())
            .cluster(ClusterRequest {
                profiles: cohort(),
                seed: Some(1),
                n_clusters: Some(1),
            })
            .expect("cluster");
        assert_eq!(response.labels.len(), 1);
    }

    #[test]
    fn test_empty_profiles_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = service_in(dir.path())
            .cluster(ClusterRequest::default())
            .expect_err("empty");
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_recommend_numeric_user_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = service_in(dir.path())
            .recommend(RecommendRequest {
                user_id: Some(json!("7")),
                profiles: cohort(),
                seed: Some(3),
                n_clusters: None,
            })
            .expect("recommend");
        assert_eq!(response.recommendations.len(), 3);
        assert_eq!(response.user_id, json!("7"));
    }

    #[test]
    fn test_recommend_unknown_user() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = service_in(dir.path())
            .recommend(RecommendRequest {
                user_id: Some(json!("nobody")),
                profiles: cohort(),
                seed: Some(3),
                n_clusters: None,
            })
            .expect_err("not found");
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn test_recommend_requires_user_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = service_in(dir.path())
            .recommend(RecommendRequest {
                profiles: cohort(),
                ..RecommendRequest::default()
            })
            .expect_err("missing user");
        assert!(matches!(err, CarbonError::MissingFields(_)));
    }

    #[test]
    fn test_malformed_profile_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = service_in(dir.path())
            .cluster(ClusterRequest {
                profiles: vec![json!("not an object")],
                ..ClusterRequest::default()
            })
            .expect_err("malformed");
        assert!(matches!(err, CarbonError::InvalidField { .. }));
    }

    #[test]
    fn test_predict_and_retrain() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(dir.path());
        let result = service
            .predict(&json!({
                "avg_daily_travel_km": 15.5,
                "avg_electricity_kwh": 120,
                "avg_lpg_kg": 18,
                "avg_nonveg_meals": 12,
                "avg_items_purchased": 6,
                "last_month_emission": 200
            }))
            .expect("predict");
        assert_eq!(result.breakdown.transport, 55.8);
        assert_eq!(service.manager().training_runs(), 1);

        let retrained = service.retrain().expect("retrain");
        assert_eq!(retrained.report.samples, 150);
        assert_eq!(service.manager().training_runs(), 2);
        let json = serde_json::to_value(&retrained).expect("serialize");
        assert_eq!(json["samples"], 150);
    }

    #[test]
    fn test_daily_emission_passthrough() {
        let dir = tempfile::tempdir().expect("tempdir");
        let activity = DailyActivity {
            category: Some("Cooking".to_string()),
            ..DailyActivity::default()
        };
        let result = service_in(dir.path()).daily_emission(&activity).expect("daily");
        assert_eq!(result.total_emission_kg_co2, 1.5);
    }

    #[test]
    fn test_error_body() {
        let body = ErrorBody::from(&CarbonError::UserNotFound("u1".to_string()));
        assert!(body.error.contains("u1"));
    }
}
