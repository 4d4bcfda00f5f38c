//! Subcommand handlers. Each reads one JSON document and returns one.

use crate::error::{CliError, Result};
use carbonsense::calculator::DailyActivity;
use carbonsense::service::{CarbonService, ClusterRequest, RecommendRequest};
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Reads JSON from `path`, or from stdin when `path` is `None` or `-`.
pub(crate) fn read_input(path: Option<&Path>) -> Result<Value> {
    let raw = match path {
        Some(p) if p != Path::new("-") => fs::read_to_string(p).map_err(|source| CliError::Input {
            path: p.to_path_buf(),
            source,
        })?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(CliError::Stdin)?;
            buf
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn cluster(
    service: &CarbonService,
    input: Value,
    seed: Option<u64>,
    n_clusters: Option<usize>,
) -> Result<Value> {
    let mut request = cluster_request(input)?;
    request.seed = seed.or(request.seed);
    request.n_clusters = n_clusters.or(request.n_clusters);
    tracing::debug!(profiles = request.profiles.len(), "cluster request");
    Ok(serde_json::to_value(service.cluster(request)?)?)
}

pub(crate) fn recommend(
    service: &CarbonService,
    input: Value,
    user_id: Option<String>,
    seed: Option<u64>,
) -> Result<Value> {
    let mut request: RecommendRequest = match input {
        Value::Array(profiles) => RecommendRequest {
            profiles,
            ..RecommendRequest::default()
        },
        other => serde_json::from_value(other)?,
    };
    if let Some(user_id) = user_id {
        request.user_id = Some(Value::String(user_id));
    }
    request.seed = seed.or(request.seed);
    Ok(serde_json::to_value(service.recommend(request)?)?)
}

pub(crate) fn predict(service: &CarbonService, input: &Value) -> Result<Value> {
    Ok(serde_json::to_value(service.predict(input)?)?)
}

pub(crate) fn retrain(service: &CarbonService) -> Result<Value> {
    Ok(serde_json::to_value(service.retrain()?)?)
}

pub(crate) fn daily(service: &CarbonService, input: Value) -> Result<Value> {
    let activity: DailyActivity = serde_json::from_value(input)?;
    Ok(serde_json::to_value(service.daily_emission(&activity)?)?)
}

/// A bare array is taken as the profile list.
fn cluster_request(input: Value) -> Result<ClusterRequest> {
    match input {
        Value::Array(profiles) => Ok(ClusterRequest {
            profiles,
            ..ClusterRequest::default()
        }),
        other => Ok(serde_json::from_value(other)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonsense::config::ServiceConfig;
    use serde_json::json;

    fn service(dir: &Path) -> CarbonService {
        let mut config = ServiceConfig::default();
        config.model.dir = dir.to_path_buf();
        config.model.n_estimators = 4;
        config.model.training_samples = 120;
        CarbonService::new(config).expect("valid config")
    }

    fn profiles() -> Value {
        json!([
            {"_id": "a", "avg_daily_travel_km": 1, "avg_electricity_kwh": 2},
            {"_id": "b", "avg_daily_travel_km": 50, "avg_electricity_kwh": 300}
        ])
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("in.json");
        fs::write(&path, r#"{"category": "Cooking"}"#).expect("write");
        assert_eq!(
            read_input(Some(&path)).expect("read"),
            json!({"category": "Cooking"})
        );
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(Some(Path::new("/nonexistent/in.json"))).expect_err("missing");
        assert!(matches!(err, CliError::Input { .. }));
    }

    #[test]
    fn test_cluster_accepts_bare_array() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = cluster(&service(dir.path()), profiles(), Some(1), None).expect("cluster");
        assert_eq!(out["profiles"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_recommend_user_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = recommend(&service(dir.path()), profiles(), Some("b".to_string()), Some(1))
            .expect("recommend");
        assert_eq!(out["userId"], "b");
        assert_eq!(out["recommendations"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_daily_rejects_wrong_shape() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = daily(&service(dir.path()), json!([1, 2])).expect_err("shape");
        assert!(matches!(err, CliError::Json(_)));
    }
}
