//! Emission prediction through the public API.
//!
//! Every test trains a small forest inside its own temporary model
//! directory, so no test touches a shared artifact pair.

use carbonsense::config::{ModelConfig, ServiceConfig};
use carbonsense::error::{CarbonError, ErrorKind};
use carbonsense::model::{ArtifactStatus, ArtifactStore, ModelManager, ModelState, TrainingParams};
use carbonsense::predict::{
    EmissionPredictor, PredictionInput, PredictionResult, IMPORTANCE_NAMES,
};
use carbonsense::service::CarbonService;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

fn small_params() -> TrainingParams {
    TrainingParams {
        n_estimators: 8,
        max_depth: 10,
        training_samples: 250,
        ..TrainingParams::default()
    }
}

fn manager_in(dir: &Path) -> Arc<ModelManager> {
    Arc::new(ModelManager::new(ArtifactStore::in_dir(dir), small_params()))
}

fn reference_payload() -> Value {
    json!({
        "avg_daily_travel_km": 15.5,
        "avg_electricity_kwh": 120,
        "avg_lpg_kg": 18,
        "avg_nonveg_meals": 12,
        "avg_items_purchased": 6,
        "last_month_emission": 200
    })
}

fn predict(manager: &Arc<ModelManager>, payload: &Value) -> carbonsense::Result<PredictionResult> {
    let input = PredictionInput::from_json(payload)?;
    EmissionPredictor::new(Arc::clone(manager)).predict(&input)
}

// ========================================================================
// Reference scenario
// ========================================================================

#[test]
fn test_reference_breakdown_is_exact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = predict(&manager_in(dir.path()), &reference_payload()).expect("predict");

    assert_eq!(result.breakdown.transport, 55.8);
    assert_eq!(result.breakdown.electricity, 110.4);
    assert_eq!(result.breakdown.lpg, 54.0);
    assert_eq!(result.breakdown.food, 120.0);
    assert_eq!(result.breakdown.shopping, 120.0);
}

#[test]
fn test_reference_comparison_to_last_month() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = predict(&manager_in(dir.path()), &reference_payload()).expect("predict");

    let expected = result.predicted_emission_kg_co2 - 200.0;
    assert!((result.comparison_to_last_month - expected).abs() < 1e-9);
    assert!(result.predicted_emission_kg_co2.is_finite());
    assert!(result.predicted_emission_kg_co2 > 0.0);
}

#[test]
fn test_reference_recommendations_follow_ranking() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = predict(&manager_in(dir.path()), &reference_payload()).expect("predict");

    // food and shopping tie at 120 and keep canonical order, electricity third
    assert_eq!(result.recommendations.len(), 3);
    assert!(result.recommendations[0].contains("plant-based"));
    assert!(result.recommendations[1].contains("Buy less"));
    assert!(result.recommendations[2].contains("LED"));
}

#[test]
fn test_low_footprint_gets_positive_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let payload = json!({
        "avg_daily_travel_km": 1,
        "avg_electricity_kwh": 10,
        "avg_lpg_kg": 1,
        "avg_nonveg_meals": 0,
        "avg_items_purchased": 0,
        "last_month_emission": 50
    });
    let result = predict(&manager_in(dir.path()), &payload).expect("predict");
    assert_eq!(result.recommendations.len(), 1);
}

#[test]
fn test_response_json_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = predict(&manager_in(dir.path()), &reference_payload()).expect("predict");
    let value = serde_json::to_value(&result).expect("serialize");

    assert!(value["predicted_emission_kgCO2"].is_number());
    assert!(value["comparison_to_last_month"].is_number());
    let importance = value["feature_importance"].as_object().expect("object");
    for name in IMPORTANCE_NAMES {
        assert!(importance.contains_key(name), "missing {name}");
    }
}

// ========================================================================
// Validation
// ========================================================================

#[test]
fn test_missing_last_month_named_exactly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut payload = reference_payload();
    payload
        .as_object_mut()
        .expect("object")
        .remove("last_month_emission");

    let err = predict(&manager_in(dir.path()), &payload).expect_err("missing field");
    match err {
        CarbonError::MissingFields(fields) => {
            assert_eq!(fields, vec!["last_month_emission".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_validation_happens_before_training() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_in(dir.path());
    let err = predict(&manager, &json!({})).expect_err("empty");

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(manager.training_runs(), 0);
    assert_eq!(manager.state(), ModelState::Unloaded);
}

#[test]
fn test_non_numeric_field_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut payload = reference_payload();
    payload["avg_lpg_kg"] = json!("lots");
    let err = predict(&manager_in(dir.path()), &payload).expect_err("invalid");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// ========================================================================
// Model lifecycle
// ========================================================================

#[test]
fn test_importances_sum_to_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = predict(&manager_in(dir.path()), &reference_payload()).expect("predict");
    // rounded to 4 decimals, so allow the rounding slack of six entries
    assert!((result.feature_importance.total() - 1.0).abs() < 1e-3);
}

#[test]
fn test_persisted_pair_predicts_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = manager_in(dir.path());
    let before = predict(&first, &reference_payload()).expect("predict");
    assert_eq!(first.store().status(), ArtifactStatus::Complete);

    let reloaded = manager_in(dir.path());
    let after = predict(&reloaded, &reference_payload()).expect("predict");

    assert_eq!(reloaded.training_runs(), 0);
    assert!((before.predicted_emission_kg_co2 - after.predicted_emission_kg_co2).abs() < 1e-6);
}

#[test]
fn test_partial_pair_recovered_by_retraining() {
    let dir = tempfile::tempdir().expect("tempdir");
    let seed = manager_in(dir.path());
    predict(&seed, &reference_payload()).expect("seed artifacts");
    fs::remove_file(seed.store().model_path()).expect("remove model");

    let recovering = manager_in(dir.path());
    predict(&recovering, &reference_payload()).expect("recovered");
    assert_eq!(recovering.training_runs(), 1);
    assert_eq!(recovering.store().status(), ArtifactStatus::Complete);
}

#[test]
fn test_concurrent_cold_start_trains_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager_in(dir.path());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                predict(&manager, &reference_payload()).map(|r| r.predicted_emission_kg_co2)
            })
        })
        .collect();

    let predictions: Vec<f64> = handles
        .into_iter()
        .map(|h| h.join().expect("thread").expect("predict"))
        .collect();

    assert_eq!(manager.training_runs(), 1);
    assert!(predictions.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_retrain_through_service() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ServiceConfig {
        model: ModelConfig {
            dir: dir.path().to_path_buf(),
            n_estimators: 6,
            max_depth: 8,
            training_samples: 180,
            ..ModelConfig::default()
        },
        ..ServiceConfig::default()
    };
    let service = CarbonService::new(config).expect("service");

    let response = service.retrain().expect("retrain");
    assert_eq!(response.report.samples, 180);
    assert_eq!(response.report.n_estimators, 6);
    assert_eq!(service.manager().state(), ModelState::Ready);

    // retrain already cached a model, so prediction does not train again
    service.predict(&reference_payload()).expect("predict");
    assert_eq!(service.manager().training_runs(), 1);
}
