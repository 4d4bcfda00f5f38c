//! On-disk artifact pair.

use super::EmissionModel;
use crate::config::ModelConfig;
use crate::error::Result;
use crate::preprocessing::StandardScaler;
use crate::tree::RandomForestRegressor;
use std::path::{Path, PathBuf};

/// Which halves of the pair exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Neither file exists
    Missing,
    /// Exactly one file exists
    Partial,
    /// Both files exist
    Complete,
}

/// Fixed locations of the forest and scaler artifacts.
///
/// The forest is a bincode blob; the scaler uses the SafeTensors layout.
/// Writes go model first, then scaler, each through an atomic rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    model_path: PathBuf,
    scaler_path: PathBuf,
}

impl ArtifactStore {
    /// Store with explicit paths.
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>, scaler_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            scaler_path: scaler_path.into(),
        }
    }

    /// Store at the configured directory and file names.
    #[must_use]
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.model_path(), config.scaler_path())
    }

    /// Store using the default file names inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let defaults = ModelConfig::default();
        let dir = dir.as_ref();
        Self::new(dir.join(defaults.model_file), dir.join(defaults.scaler_file))
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn scaler_path(&self) -> &Path {
        &self.scaler_path
    }

    /// Checks which files are present.
    #[must_use]
    pub fn status(&self) -> ArtifactStatus {
        match (self.model_path.is_file(), self.scaler_path.is_file()) {
            (true, true) => ArtifactStatus::Complete,
            (false, false) => ArtifactStatus::Missing,
            _ => ArtifactStatus::Partial,
        }
    }

    /// Reads and validates both artifacts.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a file is missing and a format or dimension
    /// error if either file is corrupt or the two do not match.
    pub fn load(&self) -> Result<EmissionModel> {
        let forest = RandomForestRegressor::load(&self.model_path)?;
        let scaler = StandardScaler::load_safetensors(&self.scaler_path)?;
        EmissionModel::new(scaler, forest)
    }

    /// Writes both artifacts, replacing any previous pair.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails.
    pub fn save(&self, model: &EmissionModel) -> Result<()> {
        model.forest().save(&self.model_path)?;
        model.scaler().save_safetensors(&self.scaler_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CarbonError;
    use crate::model::tests::small_params;
    use std::fs;

    #[test]
    fn test_status_transitions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::in_dir(dir.path());
        assert_eq!(store.status(), ArtifactStatus::Missing);

        fs::write(store.model_path(), b"x").expect("write");
        assert_eq!(store.status(), ArtifactStatus::Partial);

        fs::write(store.scaler_path(), b"y").expect("write");
        assert_eq!(store.status(), ArtifactStatus::Complete);
    }

    #[test]
    fn test_save_then_load_same_model() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::in_dir(dir.path().join("models"));
        let (model, _) = EmissionModel::train(&small_params()).expect("train");

        store.save(&model).expect("save");
        assert_eq!(store.status(), ArtifactStatus::Complete);

        let loaded = store.load().expect("load");
        let input = [15.5, 120.0, 18.0, 12.0, 6.0, 200.0];
        let before = model.predict_one(&input).expect("predict");
        let after = loaded.predict_one(&input).expect("predict");
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn test_corrupt_scaler_is_format_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::in_dir(dir.path());
        let (model, _) = EmissionModel::train(&small_params()).expect("train");
        store.save(&model).expect("save");

        fs::write(store.scaler_path(), b"\x01\x02").expect("corrupt");
        assert!(matches!(store.load(), Err(CarbonError::Format { .. })));
    }

    #[test]
    fn test_default_file_names() {
        let store = ArtifactStore::in_dir("models");
        assert_eq!(store.model_path(), Path::new("models/carbon_rf_model.bin"));
        assert_eq!(
            store.scaler_path(),
            Path::new("models/carbon_scaler.safetensors")
        );
    }
}
