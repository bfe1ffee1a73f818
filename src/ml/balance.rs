//! Class balancing by seeded downsampling
//!
//! Every class is reduced to the size of the smallest one. Each class is
//! sampled without replacement, then the combined index list is shuffled with
//! the same RNG, so the output depends only on the seed and the input.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand::seq::index;
use tracing::info;

use super::features::FeatureVector;
use super::{LABEL_BENIGN, LABEL_PHISHING};
use crate::error::{PipelineError, Result};

/// Balanced training rows
#[derive(Debug, Clone)]
pub struct Balanced {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<u8>,
    /// Rows kept per class
    pub per_class: usize,
}

impl Balanced {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ClassBalancer {
    seed: u64,
    classes: Vec<u8>,
}

impl ClassBalancer {
    /// Balancer over the benign and phishing classes
    pub fn new(seed: u64) -> Self {
        Self::with_classes(seed, vec![LABEL_BENIGN, LABEL_PHISHING])
    }

    pub fn with_classes(seed: u64, mut classes: Vec<u8>) -> Self {
        classes.sort_unstable();
        classes.dedup();
        Self { seed, classes }
    }

    pub fn balance(&self, features: &[FeatureVector], labels: &[u8]) -> Result<Balanced> {
        if features.len() != labels.len() {
            return Err(PipelineError::InsufficientData(format!(
                "{} rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let mut by_class: BTreeMap<u8, Vec<usize>> =
            self.classes.iter().map(|&c| (c, Vec::new())).collect();
        for (i, label) in labels.iter().enumerate() {
            if let Some(rows) = by_class.get_mut(label) {
                rows.push(i);
            }
        }

        if let Some((&class, _)) = by_class.iter().find(|(_, rows)| rows.is_empty()) {
            return Err(PipelineError::EmptyClass { class });
        }

        let per_class = by_class.values().map(Vec::len).min().unwrap_or(0);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut picked = Vec::with_capacity(per_class * by_class.len());
        for rows in by_class.values() {
            let sample = index::sample(&mut rng, rows.len(), per_class);
            picked.extend(sample.iter().map(|i| rows[i]));
        }
        picked.shuffle(&mut rng);

        info!(
            "Balanced dataset: {} rows per class, {} total (seed {})",
            per_class,
            picked.len(),
            self.seed
        );

        Ok(Balanced {
            features: picked.iter().map(|&i| features[i]).collect(),
            labels: picked.iter().map(|&i| labels[i]).collect(),
            per_class,
        })
    }
}
