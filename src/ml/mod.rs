//! URL phishing classification pipeline
//!
//! # Training path
//! dataset CSV -> [`DatasetPreparer`] -> [`ClassBalancer`] -> [`ModelTrainer`]
//! -> [`ModelStore`]
//!
//! # Serving path
//! URL -> [`FeatureExtractor`] -> [`InferenceClassifier`] (owned by a
//! [`UrlScanner`]) -> [`ScanResult`] -> [`ScanSink`]
//!
//! Both paths use the same [`FeatureExtractor`], so a model always sees the
//! feature layout it was trained on.
//!
//! # Example
//! ```ignore
//! use phishguard::ml::{FeatureExtractor, Thresholds, UrlScanner};
//!
//! let scanner = UrlScanner::new(FeatureExtractor::default(), Thresholds::default())?;
//! scanner.load_from("model/phishing_model.bin");
//! let result = scanner.scan("http://secure-login.bank-update.com/verify")?;
//! println!("{} ({:.1}%)", result.label, result.phishing_probability * 100.0);
//! ```

pub mod balance;
pub mod dataset;
pub mod features;
pub mod inference;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod scanner;
pub mod storage;
pub mod training;

use serde::{Deserialize, Serialize};

pub use balance::{Balanced, ClassBalancer};
pub use dataset::{DatasetPreparer, DatasetStats, PreparedDataset};
pub use features::{FeatureExtractor, FeatureVector, DEFAULT_KEYWORDS, FEATURE_NAMES, NUM_FEATURES};
pub use inference::{Classification, InferenceClassifier, RiskLevel, Thresholds, Verdict};
pub use metrics::{ConfusionMatrix, Metrics};
pub use models::{
    GradientBoostConfig, GradientBoosting, LogisticConfig, LogisticRegression, Model,
    ProbabilisticClassifier, RandomForest, RandomForestConfig,
};
pub use pipeline::{TrainingOutcome, TrainingPhase, TrainingPipeline};
pub use scanner::{validate_url, MemorySink, ScanResult, ScanSink, TracingSink, UrlScanner};
pub use storage::ModelStore;
pub use training::{stratified_split, CandidateResult, ModelTrainer, Selection, Split, TrainingReport};

/// Label value for benign URLs
pub const LABEL_BENIGN: u8 = 0;
/// Label value for phishing URLs
pub const LABEL_PHISHING: u8 = 1;

/// Feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Keywords counted by the keyword features, matched case-insensitively
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// URLs longer than this are reported as unusually long
    #[serde(default = "default_long_url_threshold")]
    pub long_url_threshold: usize,
    /// URLs with more dots than this are reported as having many subdomains
    #[serde(default = "default_dot_threshold")]
    pub dot_threshold: usize,
    /// Training rows with longer URLs are skipped
    #[serde(default = "default_max_url_length")]
    pub max_url_length: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            long_url_threshold: default_long_url_threshold(),
            dot_threshold: default_dot_threshold(),
            max_url_length: default_max_url_length(),
        }
    }
}

/// Training and model selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed for balancing, splitting and every seeded model
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fraction of rows held out for scoring candidates
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default)]
    pub logistic: LogisticConfig,
    #[serde(default)]
    pub random_forest: RandomForestConfig,
    #[serde(default)]
    pub gradient_boosting: GradientBoostConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            test_fraction: default_test_fraction(),
            logistic: LogisticConfig::default(),
            random_forest: RandomForestConfig::default(),
            gradient_boosting: GradientBoostConfig::default(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_long_url_threshold() -> usize {
    75
}

fn default_dot_threshold() -> usize {
    3
}

fn default_max_url_length() -> usize {
    2083
}

fn default_seed() -> u64 {
    42
}

fn default_test_fraction() -> f64 {
    0.2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_config_defaults() {
        let config = FeatureConfig::default();
        assert_eq!(config.keywords.len(), 6);
        assert_eq!(config.long_url_threshold, 75);
        assert_eq!(config.dot_threshold, 3);
    }

    #[test]
    fn test_training_config_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.random_forest.n_estimators, 300);
    }
}
