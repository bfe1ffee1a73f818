//! Probabilistic classifiers for URL feature vectors
//!
//! Every candidate family implements [`ProbabilisticClassifier`]; model
//! selection depends only on the trait. [`Model`] is the closed, serializable
//! set of families that can be persisted as an artifact.

pub mod gradient_boost;
pub mod logistic;
pub mod random_forest;
mod tree;

pub use gradient_boost::{GradientBoostConfig, GradientBoosting};
pub use logistic::{LogisticConfig, LogisticRegression};
pub use random_forest::{RandomForest, RandomForestConfig};

use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, FEATURE_NAMES, NUM_FEATURES};
use crate::error::{PipelineError, Result};

/// Binary classifier that can estimate P(phishing)
pub trait ProbabilisticClassifier: Send + Sync {
    /// Get model name
    fn name(&self) -> &str;

    /// Train on labeled rows (labels are 0 or 1)
    fn fit(&mut self, rows: &[FeatureVector], labels: &[u8]) -> Result<()>;

    /// Probability of the positive (phishing) class
    fn predict_proba(&self, row: &FeatureVector) -> f64;

    /// Hard 0/1 prediction
    fn predict(&self, row: &FeatureVector) -> u8 {
        u8::from(self.predict_proba(row) >= 0.5)
    }

    /// Whether `predict_proba` yields a real probability estimate
    fn supports_probability(&self) -> bool {
        true
    }

    /// Check if model is trained
    fn is_trained(&self) -> bool;
}

/// A fitted (or fittable) model from one of the supported families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl Model {
    /// Number of features the model was fit on (0 if untrained)
    pub fn n_features(&self) -> usize {
        match self {
            Model::LogisticRegression(m) => m.n_features(),
            Model::RandomForest(m) => m.n_features(),
            Model::GradientBoosting(m) => m.n_features(),
        }
    }

    /// Relative feature importance, normalized to sum to 1
    pub fn feature_importance(&self) -> [f64; NUM_FEATURES] {
        let mut importance = match self {
            Model::LogisticRegression(m) => m.feature_importance(),
            Model::RandomForest(m) => m.feature_importance(),
            Model::GradientBoosting(m) => m.feature_importance(),
        };
        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for v in importance.iter_mut() {
                *v /= total;
            }
        }
        importance
    }

    /// Get top N important features by name
    pub fn top_features(&self, n: usize) -> Vec<(String, f64)> {
        let mut indexed: Vec<(String, f64)> = FEATURE_NAMES
            .iter()
            .zip(self.feature_importance())
            .map(|(name, v)| (name.to_string(), v))
            .collect();

        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(n);
        indexed
    }

    fn inner(&self) -> &dyn ProbabilisticClassifier {
        match self {
            Model::LogisticRegression(m) => m,
            Model::RandomForest(m) => m,
            Model::GradientBoosting(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ProbabilisticClassifier {
        match self {
            Model::LogisticRegression(m) => m,
            Model::RandomForest(m) => m,
            Model::GradientBoosting(m) => m,
        }
    }
}

impl ProbabilisticClassifier for Model {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn fit(&mut self, rows: &[FeatureVector], labels: &[u8]) -> Result<()> {
        self.inner_mut().fit(rows, labels)
    }

    fn predict_proba(&self, row: &FeatureVector) -> f64 {
        self.inner().predict_proba(row)
    }

    fn supports_probability(&self) -> bool {
        self.inner().supports_probability()
    }

    fn is_trained(&self) -> bool {
        self.inner().is_trained()
    }
}

/// Validate a labeled training set before fitting
pub(crate) fn check_training_set(rows: &[FeatureVector], labels: &[u8]) -> Result<()> {
    if rows.is_empty() {
        return Err(PipelineError::InsufficientData("no training rows".to_string()));
    }
    if rows.len() != labels.len() {
        return Err(PipelineError::InsufficientData(format!(
            "{} rows but {} labels",
            rows.len(),
            labels.len()
        )));
    }
    if let Some(bad) = labels.iter().find(|&&l| l > 1) {
        return Err(PipelineError::Schema(format!("label must be 0 or 1, got {}", bad)));
    }
    Ok(())
}

/// Numerically stable logistic function
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
