//! Gradient boosting classifier
//!
//! Boosts shallow regression trees on binary log loss.
//!
//! # Algorithm
//! 1. Start every row at the training log-odds
//! 2. For each boosting round:
//!    - Compute gradient `y - p` and hessian `p(1 - p)` per row
//!    - Fit a regression tree with Newton leaf values
//!    - Add the tree, scaled by the learning rate, to the raw score
//! 3. Probability is `sigmoid(raw score)`
//!
//! # Usage
//! ```ignore
//! use phishguard::ml::{GradientBoostConfig, GradientBoosting, ProbabilisticClassifier};
//!
//! let mut model = GradientBoosting::new(GradientBoostConfig::default(), 42);
//! model.fit(&rows, &labels)?;
//! let p = model.predict_proba(&rows[0]);
//! ```

use rand::prelude::*;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use super::{check_training_set, sigmoid, ProbabilisticClassifier};
use crate::error::Result;
use crate::ml::features::{FeatureVector, NUM_FEATURES};

/// Clamp applied to the base rate before taking log-odds
const BASE_RATE_EPS: f64 = 1e-6;

/// Gradient boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostConfig {
    /// Number of boosting rounds (trees)
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Maximum depth of each tree
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Minimum samples to split a node
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    /// Fraction of rows drawn (without replacement) for each tree
    #[serde(default = "default_subsample")]
    pub subsample: f64,
}

impl Default for GradientBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            learning_rate: default_learning_rate(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            subsample: default_subsample(),
        }
    }
}

fn default_n_estimators() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_max_depth() -> usize {
    3
}

fn default_min_samples_split() -> usize {
    2
}

fn default_subsample() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    config: GradientBoostConfig,
    seed: u64,
    trees: Vec<RegressionTree>,
    /// Initial raw score (training log-odds)
    base_score: f64,
    n_features: usize,
    trained: bool,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(GradientBoostConfig::default(), 42)
    }
}

impl GradientBoosting {
    pub fn new(config: GradientBoostConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
            trained: false,
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Get configuration
    pub fn config(&self) -> &GradientBoostConfig {
        &self.config
    }

    /// Accumulated split gain per feature
    pub fn feature_importance(&self) -> [f64; NUM_FEATURES] {
        let mut importance = [0.0; NUM_FEATURES];
        for tree in &self.trees {
            tree.accumulate_importance(&mut importance);
        }
        importance
    }

    fn raw_score(&self, row: &FeatureVector) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, t| acc + self.config.learning_rate * t.predict(row))
    }

    fn round_sample(&self, n: usize, rng: &mut StdRng) -> Vec<usize> {
        let fraction = self.config.subsample.clamp(0.0, 1.0);
        if fraction >= 1.0 {
            return (0..n).collect();
        }
        let amount = ((n as f64 * fraction).round() as usize).clamp(1, n);
        let mut picked = index::sample(rng, n, amount).into_vec();
        picked.sort_unstable();
        picked
    }
}

impl ProbabilisticClassifier for GradientBoosting {
    fn name(&self) -> &str {
        "GradientBoosting"
    }

    fn fit(&mut self, rows: &[FeatureVector], labels: &[u8]) -> Result<()> {
        check_training_set(rows, labels)?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: 1,
            max_features: None,
        };

        let positives = labels.iter().filter(|&&l| l == 1).count();
        let rate = (positives as f64 / labels.len() as f64).clamp(BASE_RATE_EPS, 1.0 - BASE_RATE_EPS);
        self.base_score = (rate / (1.0 - rate)).ln();
        self.trees.clear();

        let mut raw = vec![self.base_score; rows.len()];
        let mut grad = vec![0.0; rows.len()];
        let mut hess = vec![0.0; rows.len()];

        for _ in 0..self.config.n_estimators {
            for (i, &y) in labels.iter().enumerate() {
                let p = sigmoid(raw[i]);
                grad[i] = f64::from(y) - p;
                hess[i] = p * (1.0 - p);
            }

            let sample = self.round_sample(rows.len(), &mut rng);
            let tree = RegressionTree::fit(rows, &grad, &hess, sample, &params, &mut rng);

            for (r, row) in raw.iter_mut().zip(rows) {
                *r += self.config.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);
        }

        self.n_features = NUM_FEATURES;
        self.trained = true;
        Ok(())
    }

    fn predict_proba(&self, row: &FeatureVector) -> f64 {
        if !self.trained {
            return 0.5;
        }
        sigmoid(self.raw_score(row))
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::test_support::toy_dataset;

    #[test]
    fn test_model_creation() {
        let model = GradientBoosting::default();
        assert!(!model.is_trained());
        assert_eq!(model.config().n_estimators, 100);
        assert_eq!(model.config().max_depth, 3);
    }

    #[test]
    fn test_fit_and_predict() {
        let (rows, labels) = toy_dataset(30);
        let mut model = GradientBoosting::new(
            GradientBoostConfig {
                n_estimators: 20,
                ..Default::default()
            },
            42,
        );
        model.fit(&rows, &labels).unwrap();

        assert_eq!(model.n_trees(), 20);
        assert!(model.predict_proba(&rows[1]) > 0.8);
        assert!(model.predict_proba(&rows[0]) < 0.2);
    }

    #[test]
    fn test_base_score_is_log_odds() {
        let (mut rows, mut labels) = toy_dataset(10);
        // 3:1 phishing to benign after dropping benign rows
        rows.truncate(8);
        labels.truncate(8);
        rows.extend(toy_dataset(4).0.into_iter().skip(1).step_by(2));
        labels.extend([1, 1, 1, 1]);

        let mut model = GradientBoosting::new(
            GradientBoostConfig {
                n_estimators: 0,
                ..Default::default()
            },
            1,
        );
        model.fit(&rows, &labels).unwrap();

        let rate = 8.0 / 12.0;
        assert!((model.predict_proba(&rows[0]) - rate).abs() < 1e-9);
    }

    #[test]
    fn test_subsample_reproducible() {
        let (rows, labels) = toy_dataset(20);
        let config = GradientBoostConfig {
            n_estimators: 15,
            subsample: 0.7,
            ..Default::default()
        };
        let mut a = GradientBoosting::new(config.clone(), 3);
        let mut b = GradientBoosting::new(config, 3);
        a.fit(&rows, &labels).unwrap();
        b.fit(&rows, &labels).unwrap();

        for row in &rows {
            assert_eq!(a.predict_proba(row).to_bits(), b.predict_proba(row).to_bits());
        }
    }

    #[test]
    fn test_importance_tracks_splits() {
        let (rows, labels) = toy_dataset(20);
        let mut model = GradientBoosting::new(
            GradientBoostConfig {
                n_estimators: 5,
                ..Default::default()
            },
            42,
        );
        model.fit(&rows, &labels).unwrap();
        assert!(model.feature_importance().iter().any(|&v| v > 0.0));
    }
}
