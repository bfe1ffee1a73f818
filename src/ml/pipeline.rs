//! End-to-end training run
//!
//! prepare dataset -> balance -> train and select -> save artifact -> save report

use serde::{Deserialize, Serialize};
use tracing::info;

use super::balance::ClassBalancer;
use super::dataset::DatasetPreparer;
use super::features::FeatureExtractor;
use super::models::Model;
use super::storage::ModelStore;
use super::training::{ModelTrainer, TrainingReport};
use crate::config::Config;
use crate::error::Result;

/// Training phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingPhase {
    /// Not started
    Idle,
    /// Loading and cleaning the dataset
    Preparing,
    /// Downsampling to equal class sizes
    Balancing,
    /// Fitting and scoring candidates
    Training,
    /// Writing the artifact and report
    Saving,
    /// Training complete
    Complete,
}

/// Products of a successful run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: Model,
    pub report: TrainingReport,
}

pub struct TrainingPipeline {
    config: Config,
    phase: TrainingPhase,
}

impl TrainingPipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            phase: TrainingPhase::Idle,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    fn enter(&mut self, phase: TrainingPhase) {
        info!("Training phase: {:?}", phase);
        self.phase = phase;
    }

    /// Run every phase. Any error aborts the run and leaves an existing
    /// artifact untouched.
    pub fn run(&mut self) -> Result<TrainingOutcome> {
        self.config.validate()?;

        let extractor = FeatureExtractor::new(&self.config.features);
        let training = self.config.training.clone();

        self.enter(TrainingPhase::Preparing);
        let dataset = DatasetPreparer::new(&extractor).load(&self.config.paths.dataset)?;

        self.enter(TrainingPhase::Balancing);
        let balanced = ClassBalancer::new(training.seed).balance(&dataset.features, &dataset.labels)?;

        self.enter(TrainingPhase::Training);
        let selection = ModelTrainer::new(training.clone()).train(&balanced.features, &balanced.labels)?;
        let report = TrainingReport::new(&selection, dataset.stats, balanced.per_class, training.seed);

        self.enter(TrainingPhase::Saving);
        let store = ModelStore::new(&self.config.paths.model);
        store.save(&selection.model)?;
        store.save_report(&report)?;

        self.enter(TrainingPhase::Complete);
        info!(
            "Training complete: {} saved to {}",
            report.winner,
            self.config.paths.model.display()
        );

        Ok(TrainingOutcome {
            model: selection.model,
            report,
        })
    }
}
