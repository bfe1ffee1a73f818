use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::ml::{FeatureConfig, Thresholds, TrainingConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub features: FeatureConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load config from default locations or create default
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/phishguard/config.toml"),
            dirs_next::config_dir()
                .map(|p| p.join("phishguard/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("phishguard.toml"),
        ];

        for path in &paths {
            if path.is_file() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> crate::error::Result<()> {
        self.thresholds.validate()?;

        let training = &self.training;
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            return Err(invalid(format!(
                "training.test_fraction must be in (0, 1), got {}",
                training.test_fraction
            )));
        }
        if training.random_forest.n_estimators == 0 {
            return Err(invalid("training.random_forest.n_estimators must be at least 1"));
        }
        if training.gradient_boosting.n_estimators == 0 {
            return Err(invalid("training.gradient_boosting.n_estimators must be at least 1"));
        }
        if !(training.gradient_boosting.subsample > 0.0 && training.gradient_boosting.subsample <= 1.0) {
            return Err(invalid("training.gradient_boosting.subsample must be in (0, 1]"));
        }
        if training.logistic.learning_rate <= 0.0 || training.gradient_boosting.learning_rate <= 0.0 {
            return Err(invalid("learning rates must be positive"));
        }
        if self.features.max_url_length == 0 {
            return Err(invalid("features.max_url_length must be at least 1"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig(message.into())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Labeled training CSV
    #[serde(default = "default_dataset_path")]
    pub dataset: PathBuf,

    /// Model artifact written by training and loaded for serving
    #[serde(default = "default_model_path")]
    pub model: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset_path(),
            model: default_model_path(),
        }
    }
}

// Default value functions
fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/sample_urls.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model/phishing_model.bin")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.model, PathBuf::from("model/phishing_model.bin"));
        assert_eq!(config.thresholds.phishing, 0.60);
        assert_eq!(config.thresholds.suspicious, 0.30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.features.keywords, config.features.keywords);
        assert_eq!(parsed.training.random_forest.n_estimators, 300);
        assert_eq!(parsed.paths.dataset, config.paths.dataset);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [thresholds]
            phishing = 0.8

            [training.gradient_boosting]
            n_estimators = 50
            "#,
        )
        .unwrap();

        assert_eq!(parsed.thresholds.phishing, 0.8);
        assert_eq!(parsed.thresholds.suspicious, 0.30);
        assert_eq!(parsed.training.gradient_boosting.n_estimators, 50);
        assert_eq!(parsed.training.gradient_boosting.max_depth, 3);
        assert_eq!(parsed.training.seed, 42);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.thresholds.suspicious = 0.9;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let mut config = Config::default();
        config.training.test_fraction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("phishguard.toml");

        let mut config = Config::default();
        config.training.seed = 7;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.training.seed, 7);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[thresholds]\nphishing = 0.1\nsuspicious = 0.5\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
