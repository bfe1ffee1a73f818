//! Model artifact persistence
//!
//! The artifact is the bincode (serde, standard config) encoding of a
//! [`Model`]. Saves go through `<artifact>.tmp` and a rename so readers never
//! see a partially written file. The training report lives beside it as
//! `<artifact>.report.json`.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::features::NUM_FEATURES;
use super::models::{Model, ProbabilisticClassifier};
use super::training::TrainingReport;
use crate::error::{PipelineError, Result};

/// Upper bound on decoded artifact size
const MAX_ARTIFACT_BYTES: usize = 256 * 1024 * 1024;

/// Reads and writes one model artifact. Single writer only.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the JSON training report
    pub fn report_path(&self) -> PathBuf {
        with_suffix(&self.path, ".report.json")
    }

    fn temp_path(&self) -> PathBuf {
        with_suffix(&self.path, ".tmp")
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Save model to disk, replacing any previous artifact
    pub fn save(&self, model: &Model) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.temp_path();
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            bincode::serde::encode_into_std_write(model, &mut writer, bincode::config::standard())?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!("Saved {} model to {}", model.name(), self.path.display());
        Ok(())
    }

    /// Load model from disk. Every failure is reported as `ModelLoad`.
    pub fn load(&self) -> Result<Model> {
        let bytes = fs::read(&self.path).map_err(|e| PipelineError::model_load(&self.path, e))?;

        let config = bincode::config::standard().with_limit::<MAX_ARTIFACT_BYTES>();
        let (model, consumed): (Model, usize) = bincode::serde::decode_from_slice(&bytes, config)
            .map_err(|e| PipelineError::model_load(&self.path, e))?;

        if consumed != bytes.len() {
            return Err(PipelineError::model_load(
                &self.path,
                format!("{} trailing bytes after model", bytes.len() - consumed),
            ));
        }
        if !model.is_trained() {
            return Err(PipelineError::model_load(&self.path, "artifact holds an untrained model"));
        }
        if model.n_features() != NUM_FEATURES {
            return Err(PipelineError::model_load(
                &self.path,
                format!(
                    "model expects {} features, extractor produces {}",
                    model.n_features(),
                    NUM_FEATURES
                ),
            ));
        }

        debug!("Decoded {} bytes from {}", bytes.len(), self.path.display());
        info!("Loaded {} model from {}", model.name(), self.path.display());
        Ok(model)
    }

    pub fn save_report(&self, report: &TrainingReport) -> Result<()> {
        let path = self.report_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        info!("Saved training report to {}", path.display());
        Ok(())
    }

    pub fn load_report(&self) -> Result<TrainingReport> {
        let content = fs::read_to_string(self.report_path())?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::dataset::DatasetStats;
    use crate::ml::models::test_support::toy_dataset;
    use crate::ml::{GradientBoostConfig, GradientBoosting, LogisticRegression, ModelTrainer};
    use tempfile::tempdir;

    fn trained_model() -> Model {
        let (rows, labels) = toy_dataset(15);
        let mut model = Model::GradientBoosting(GradientBoosting::new(
            GradientBoostConfig {
                n_estimators: 10,
                ..Default::default()
            },
            42,
        ));
        model.fit(&rows, &labels).unwrap();
        model
    }

    #[test]
    fn test_round_trip_bit_identical() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("nested/model.bin"));
        let model = trained_model();

        store.save(&model).unwrap();
        assert!(store.exists());
        assert!(!store.temp_path().exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.name(), model.name());
        let (rows, _) = toy_dataset(15);
        for row in &rows {
            assert_eq!(loaded.predict_proba(row).to_bits(), model.predict_proba(row).to_bits());
        }
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("absent.bin"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(PipelineError::ModelLoad { .. })));
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        fs::write(&path, b"definitely not a model").unwrap();
        assert!(matches!(ModelStore::new(&path).load(), Err(PipelineError::ModelLoad { .. })));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("model.bin"));
        store.save(&trained_model()).unwrap();

        let mut bytes = fs::read(store.path()).unwrap();
        bytes.extend_from_slice(&[0, 1, 2, 3]);
        fs::write(store.path(), bytes).unwrap();

        assert!(matches!(store.load(), Err(PipelineError::ModelLoad { .. })));
    }

    #[test]
    fn test_untrained_artifact_rejected() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("model.bin"));
        store.save(&Model::LogisticRegression(LogisticRegression::default())).unwrap();
        assert!(matches!(store.load(), Err(PipelineError::ModelLoad { .. })));
    }

    #[test]
    fn test_report_sidecar() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("model.bin"));
        assert_eq!(store.report_path(), dir.path().join("model.bin.report.json"));

        let (rows, labels) = toy_dataset(20);
        let mut config = crate::ml::TrainingConfig::default();
        config.random_forest.n_estimators = 10;
        config.gradient_boosting.n_estimators = 10;
        let selection = ModelTrainer::new(config).train(&rows, &labels).unwrap();
        let report = TrainingReport::new(&selection, DatasetStats::default(), 20, 42);

        store.save_report(&report).unwrap();
        let loaded = store.load_report().unwrap();
        assert_eq!(loaded.winner, report.winner);
        assert_eq!(loaded.candidates.len(), 3);
    }
}
