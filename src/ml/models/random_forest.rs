//! Random forest classifier
//!
//! Bagged regression trees fit on 0/1 targets. Each tree sees a bootstrap
//! sample and considers a random subset of features at every split; the
//! forest probability is the mean tree output.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use super::{check_training_set, ProbabilisticClassifier};
use crate::error::Result;
use crate::ml::features::{FeatureVector, NUM_FEATURES};

/// Random forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestConfig {
    /// Number of trees
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Features considered per split (unset = sqrt of the feature count)
    #[serde(default)]
    pub max_features: Option<usize>,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: None,
        }
    }
}

fn default_n_estimators() -> usize {
    300
}

fn default_max_depth() -> usize {
    12
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: RandomForestConfig,
    seed: u64,
    trees: Vec<RegressionTree>,
    n_features: usize,
    trained: bool,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(RandomForestConfig::default(), 42)
    }
}

impl RandomForest {
    pub fn new(config: RandomForestConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            trees: Vec::new(),
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

    /// Total split gain per feature across all trees
    pub fn feature_importance(&self) -> [f64; NUM_FEATURES] {
        let mut importance = [0.0; NUM_FEATURES];
        for tree in &self.trees {
            tree.accumulate_importance(&mut importance);
        }
        importance
    }

    fn tree_params(&self) -> TreeParams {
        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| (NUM_FEATURES as f64).sqrt().round() as usize);

        TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: Some(max_features.clamp(1, NUM_FEATURES)),
        }
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn name(&self) -> &str {
        "RandomForest"
    }

    fn fit(&mut self, rows: &[FeatureVector], labels: &[u8]) -> Result<()> {
        check_training_set(rows, labels)?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let params = self.tree_params();
        let targets: Vec<f64> = labels.iter().map(|&l| f64::from(l)).collect();
        let hess = vec![1.0; rows.len()];
        let n = rows.len();

        self.trees = (0..self.config.n_estimators)
            .map(|_| {
                // Bootstrap: sample with replacement
                let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::fit(rows, &targets, &hess, sample, &params, &mut rng)
            })
            .collect();

        self.n_features = NUM_FEATURES;
        self.trained = true;
        Ok(())
    }

    fn predict_proba(&self, row: &FeatureVector) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        (total / self.trees.len() as f64).clamp(0.0, 1.0)
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}
