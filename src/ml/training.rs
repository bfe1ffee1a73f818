//! Candidate training and model selection
//!
//! Splits the balanced rows into stratified train/test partitions, fits every
//! candidate, scores each on the held-out rows and keeps the best by F1 on
//! the phishing class.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::dataset::DatasetStats;
use super::features::FeatureVector;
use super::metrics::Metrics;
use super::models::{GradientBoosting, LogisticRegression, Model, ProbabilisticClassifier, RandomForest};
use super::TrainingConfig;
use crate::error::{PipelineError, Result};

/// Row indices of a train/test partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified train/test split.
///
/// Each class contributes `round(n * test_fraction)` test rows, clamped so a
/// class with at least two rows keeps one row on each side. A single-row
/// class goes to the training side. Both partitions are shuffled.
pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split::default();

    for (class, mut rows) in by_class {
        rows.shuffle(&mut rng);
        let n = rows.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1)
        };
        debug!("Class {}: {} train, {} test", class, n - n_test, n_test);

        split.test.extend_from_slice(&rows[..n_test]);
        split.train.extend_from_slice(&rows[n_test..]);
    }

    split.train.shuffle(&mut rng);
    split.test.shuffle(&mut rng);
    Ok(split)
}

/// Held-out evaluation of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    pub metrics: Metrics,
    pub supports_probability: bool,
}

/// Outcome of model selection
#[derive(Debug, Clone)]
pub struct Selection<C> {
    /// The fitted winning model
    pub model: C,
    pub winner: String,
    /// Every candidate, in declaration order
    pub results: Vec<CandidateResult>,
    pub train_size: usize,
    pub test_size: usize,
}

/// Trains the candidate families and selects the best
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Unfitted candidates in declaration (tie-break) order
    pub fn candidates(&self) -> Vec<Model> {
        let seed = self.config.seed;
        vec![
            Model::LogisticRegression(LogisticRegression::new(self.config.logistic.clone())),
            Model::RandomForest(RandomForest::new(self.config.random_forest.clone(), seed)),
            Model::GradientBoosting(GradientBoosting::new(self.config.gradient_boosting.clone(), seed)),
        ]
    }

    /// Fit and select among the built-in candidate families
    pub fn train(&self, features: &[FeatureVector], labels: &[u8]) -> Result<Selection<Model>> {
        self.select(self.candidates(), features, labels)
    }

    /// Fit every candidate and keep the one with the highest F1.
    ///
    /// Ties go to the earlier candidate. The winner must produce probability
    /// estimates.
    pub fn select<C: ProbabilisticClassifier>(
        &self,
        candidates: Vec<C>,
        features: &[FeatureVector],
        labels: &[u8],
    ) -> Result<Selection<C>> {
        if candidates.is_empty() {
            return Err(PipelineError::InsufficientData("no candidate models".to_string()));
        }
        if features.len() != labels.len() {
            return Err(PipelineError::InsufficientData(format!(
                "{} rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let split = stratified_split(labels, self.config.test_fraction, self.config.seed)?;
        if split.train.is_empty() || split.test.is_empty() {
            return Err(PipelineError::InsufficientData(format!(
                "need rows on both sides of the split ({} train, {} test)",
                split.train.len(),
                split.test.len()
            )));
        }

        let train_x: Vec<FeatureVector> = split.train.iter().map(|&i| features[i]).collect();
        let train_y: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();
        let test_x: Vec<FeatureVector> = split.test.iter().map(|&i| features[i]).collect();
        let test_y: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();

        info!(
            "Training {} candidates on {} rows, evaluating on {}",
            candidates.len(),
            train_x.len(),
            test_x.len()
        );

        let mut fitted = Vec::with_capacity(candidates.len());
        let mut results = Vec::with_capacity(candidates.len());

        for mut candidate in candidates {
            candidate.fit(&train_x, &train_y)?;
            let predicted: Vec<u8> = test_x.iter().map(|row| candidate.predict(row)).collect();
            let metrics = Metrics::from_predictions(&test_y, &predicted);

            info!("{}: {}", candidate.name(), metrics);
            results.push(CandidateResult {
                name: candidate.name().to_string(),
                metrics,
                supports_probability: candidate.supports_probability(),
            });
            fitted.push(candidate);
        }

        let mut best = 0;
        for (i, result) in results.iter().enumerate().skip(1) {
            if result.metrics.f1 > results[best].metrics.f1 {
                best = i;
            }
        }

        let winner = results[best].name.clone();
        if !results[best].supports_probability {
            return Err(PipelineError::NoProbabilisticModel { name: winner });
        }
        info!("Best model selected: {} (F1 {:.4})", winner, results[best].metrics.f1);

        let model = fitted.swap_remove(best);
        Ok(Selection {
            model,
            winner,
            results,
            train_size: train_x.len(),
            test_size: test_x.len(),
        })
    }
}

/// Summary of a training run, stored as JSON beside the model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub winner: String,
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    /// Every candidate, in declaration order
    pub candidates: Vec<CandidateResult>,
    pub dataset: DatasetStats,
    /// Rows kept per class after balancing
    pub balanced_per_class: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// Most important features of the winner, normalized
    pub top_features: Vec<(String, f64)>,
    pub version: String,
}

impl TrainingReport {
    pub fn new(
        selection: &Selection<Model>,
        dataset: DatasetStats,
        balanced_per_class: usize,
        seed: u64,
    ) -> Self {
        Self {
            winner: selection.winner.clone(),
            trained_at: Utc::now(),
            seed,
            candidates: selection.results.clone(),
            dataset,
            balanced_per_class,
            train_size: selection.train_size,
            test_size: selection.test_size,
            top_features: selection.model.top_features(5),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Metrics of the winning candidate
    pub fn winner_metrics(&self) -> Option<&Metrics> {
        self.candidates
            .iter()
            .find(|c| c.name == self.winner)
            .map(|c| &c.metrics)
    }
}
