//! Process-wide cache of the emission model.

use super::{ArtifactStatus, ArtifactStore, EmissionModel, TrainingParams, TrainingReport};
use crate::config::ModelConfig;
use crate::error::{CarbonError, Result};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lifecycle of the cached model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Nothing cached yet
    Unloaded,
    /// First load or train in progress
    Loading,
    /// A model is cached and serving
    Ready,
    /// A replacement is being trained; the previous model keeps serving
    Retraining,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Retraining => "retraining",
        };
        f.write_str(name)
    }
}

/// Lazily loads or trains the emission model and shares it.
///
/// Readers clone an `Arc` out of a read lock and never block on training.
/// Cold-start initialization and retraining are serialized by a separate
/// mutex, so concurrent first requests train and write at most once.
/// Retraining builds and persists a complete new pair before swapping it in.
pub struct ModelManager {
    store: ArtifactStore,
    params: TrainingParams,
    cached: RwLock<Option<Arc<EmissionModel>>>,
    transition: Mutex<()>,
    state: RwLock<ModelState>,
    training_runs: AtomicUsize,
}

impl fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelManager")
            .field("store", &self.store)
            .field("params", &self.params)
            .field("state", &self.state())
            .field("training_runs", &self.training_runs())
            .finish_non_exhaustive()
    }
}

impl ModelManager {
    /// Creates a manager; nothing is loaded until first use.
    #[must_use]
    pub fn new(store: ArtifactStore, params: TrainingParams) -> Self {
        Self {
            store,
            params,
            cached: RwLock::new(None),
            transition: Mutex::new(()),
            state: RwLock::new(ModelState::Unloaded),
            training_runs: AtomicUsize::new(0),
        }
    }

    /// Manager for the configured artifact locations and hyperparameters.
    #[must_use]
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(ArtifactStore::from_config(config), TrainingParams::from(config))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ModelState {
        *self.state.read()
    }

    /// Number of training runs completed by this manager.
    #[must_use]
    pub fn training_runs(&self) -> usize {
        self.training_runs.load(Ordering::SeqCst)
    }

    /// Artifact locations.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The cached model, if any, without triggering a load.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<EmissionModel>> {
        self.cached.read().clone()
    }

    /// Returns the cached model, loading or training it on first use.
    ///
    /// A missing, partial or unreadable artifact pair is replaced by a
    /// freshly trained one.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::ModelUnavailable`] if training or persisting
    /// the replacement fails.
    pub fn get(&self) -> Result<Arc<EmissionModel>> {
        if let Some(model) = self.cached() {
            return Ok(model);
        }

        let _guard = self.transition.lock();
        if let Some(model) = self.cached() {
            return Ok(model);
        }

        self.set_state(ModelState::Loading);
        match self.load_or_train() {
            Ok(model) => {
                let model = Arc::new(model);
                *self.cached.write() = Some(Arc::clone(&model));
                self.set_state(ModelState::Ready);
                Ok(model)
            }
            Err(e) => {
                self.set_state(ModelState::Unloaded);
                Err(unavailable(e))
            }
        }
    }

    /// Discards the current model and trains a new one from fresh synthetic
    /// data, persisting it before swapping it in.
    ///
    /// In-flight predictions keep using the model they already hold.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::ModelUnavailable`] if training or persisting
    /// fails; the previous model, if any, stays cached.
    pub fn retrain(&self) -> Result<TrainingReport> {
        let _guard = self.transition.lock();
        self.set_state(ModelState::Retraining);

        match self.train_and_persist() {
            Ok((model, report)) => {
                *self.cached.write() = Some(Arc::new(model));
                self.set_state(ModelState::Ready);
                Ok(report)
            }
            Err(e) => {
                let restored = if self.cached.read().is_some() {
                    ModelState::Ready
                } else {
                    ModelState::Unloaded
                };
                self.set_state(restored);
                Err(unavailable(e))
            }
        }
    }

    fn load_or_train(&self) -> Result<EmissionModel> {
        match self.store.status() {
            ArtifactStatus::Complete => match self.store.load() {
                Ok(model) => {
                    tracing::info!(
                        path = %self.store.model_path().display(),
                        "loaded emission model"
                    );
                    return Ok(model);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "persisted emission model unreadable, retraining");
                }
            },
            ArtifactStatus::Partial => {
                tracing::warn!(
                    model = %self.store.model_path().display(),
                    scaler = %self.store.scaler_path().display(),
                    "emission model artifact pair incomplete, retraining"
                );
            }
            ArtifactStatus::Missing => {
                tracing::info!("no persisted emission model found, training");
            }
        }

        self.train_and_persist().map(|(model, _)| model)
    }

    fn train_and_persist(&self) -> Result<(EmissionModel, TrainingReport)> {
        let (model, report) = EmissionModel::train(&self.params)?;
        self.training_runs.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            samples = report.samples,
            n_estimators = report.n_estimators,
            r_squared = report.r_squared,
            "trained emission model"
        );

        self.store.save(&model)?;
        tracing::info!(
            model = %self.store.model_path().display(),
            scaler = %self.store.scaler_path().display(),
            "persisted emission model"
        );
        Ok((model, report))
    }

    fn set_state(&self, state: ModelState) {
        *self.state.write() = state;
    }
}

fn unavailable(err: CarbonError) -> CarbonError {
    match err {
        CarbonError::ModelUnavailable(_) => err,
        other => CarbonError::ModelUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::small_params;
    use crate::tree::{RandomForestRegressor, RegressionTreeNode};
    use std::fs;

    fn manager_in(dir: &std::path::Path) -> ModelManager {
        ModelManager::new(ArtifactStore::in_dir(dir), small_params())
    }

    #[test]
    fn test_cold_start_trains_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager_in(dir.path());
        assert_eq!(manager.state(), ModelState::Unloaded);
        assert!(manager.cached().is_none());

        manager.get().expect("model");
        assert_eq!(manager.state(), ModelState::Ready);
        assert_eq!(manager.training_runs(), 1);
        assert_eq!(manager.store().status(), ArtifactStatus::Complete);
    }

    #[test]
    fn test_second_get_reuses_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager_in(dir.path());
        let a = manager.get().expect("first");
        let b = manager.get().expect("second");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.training_runs(), 1);
    }

    #[test]
    fn test_existing_pair_loaded_without_training() {
        let dir = tempfile::tempdir().expect("tempdir");
        manager_in(dir.path()).get().expect("seed artifacts");

        let fresh = manager_in(dir.path());
        fresh.get().expect("load");
        assert_eq!(fresh.training_runs(), 0);
    }

    #[test]
    fn test_partial_pair_triggers_training() {
        let dir = tempfile::tempdir().expect("tempdir");
        let seed = manager_in(dir.path());
        seed.get().expect("seed artifacts");
        fs::remove_file(seed.store().scaler_path()).expect("remove scaler");

        let fresh = manager_in(dir.path());
        fresh.get().expect("recovered");
        assert_eq!(fresh.training_runs(), 1);
        assert_eq!(fresh.store().status(), ArtifactStatus::Complete);
    }

    #[test]
    fn test_corrupt_model_recovered_by_training() {
        let dir = tempfile::tempdir().expect("tempdir");
        let seed = manager_in(dir.path());
        seed.get().expect("seed artifacts");
        fs::write(seed.store().model_path(), b"garbage").expect("corrupt");

        let fresh = manager_in(dir.path());
        fresh.get().expect("recovered");
        assert_eq!(fresh.training_runs(), 1);
        fresh.store().load().expect("rewritten pair loads");
    }

    #[test]
    fn test_decodable_forest_with_bad_split_recovered_by_training() {
        let dir = tempfile::tempdir().expect("tempdir");
        let seed = manager_in(dir.path());
        seed.get().expect("seed artifacts");

        let path = seed.store().model_path().to_path_buf();
        let mut forest = RandomForestRegressor::load(&path).expect("seeded forest");
        match forest.trees_mut()[0].root_mut().expect("fitted") {
            RegressionTreeNode::Node(n) => n.feature_idx = 99,
            RegressionTreeNode::Leaf(_) => panic!("expected a split"),
        }
        fs::write(&path, bincode::serialize(&forest).expect("encode")).expect("corrupt");

        let fresh = manager_in(dir.path());
        let model = fresh.get().expect("recovered");
        assert_eq!(fresh.training_runs(), 1);
        let prediction = model
            .predict_one(&[15.5, 120.0, 18.0, 12.0, 6.0, 200.0])
            .expect("predict");
        assert!(prediction.is_finite());
        fresh.store().load().expect("rewritten pair loads");
    }

    #[test]
    fn test_retrain_swaps_model() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager_in(dir.path());
        let before = manager.get().expect("model");

        let report = manager.retrain().expect("retrain");
        assert_eq!(report.samples, small_params().training_samples);
        assert_eq!(manager.state(), ModelState::Ready);
        assert_eq!(manager.training_runs(), 2);

        let after = manager.get().expect("model");
        assert!(!Arc::ptr_eq(&before, &after));
        // same seed, same forest
        assert_eq!(*before, *after);
    }

    #[test]
    fn test_training_failure_reports_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let params = TrainingParams {
            training_samples: 0,
            ..small_params()
        };
        let manager = ModelManager::new(ArtifactStore::in_dir(dir.path()), params);
        assert!(matches!(
            manager.get(),
            Err(CarbonError::ModelUnavailable(_))
        ));
        assert_eq!(manager.state(), ModelState::Unloaded);
        assert!(manager.retrain().is_err());
        assert_eq!(manager.state(), ModelState::Unloaded);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ModelState::Retraining.to_string(), "retraining");
    }
}
