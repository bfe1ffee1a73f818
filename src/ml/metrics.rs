//! Binary classification metrics, positive class = phishing

use std::fmt;

use serde::{Deserialize, Serialize};

use super::LABEL_PHISHING;

/// Confusion matrix counts for a binary classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: u64,
    pub false_positives: u64,
    pub true_negatives: u64,
    pub false_negatives: u64,
}

impl ConfusionMatrix {
    /// Tally predictions against ground truth
    pub fn from_predictions(actual: &[u8], predicted: &[u8]) -> Self {
        let mut cm = Self::default();
        for (&y, &p) in actual.iter().zip(predicted) {
            cm.record(y, p);
        }
        cm
    }

    pub fn record(&mut self, actual: u8, predicted: u8) {
        match (actual == LABEL_PHISHING, predicted == LABEL_PHISHING) {
            (true, true) => self.true_positives += 1,
            (false, true) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (true, false) => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Scores derived from a confusion matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    /// TP / (TP + FP)
    pub precision: f64,
    /// TP / (TP + FN)
    pub recall: f64,
    /// F1 score: 2 * (precision * recall) / (precision + recall)
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

impl Metrics {
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let accuracy = ratio(confusion.true_positives + confusion.true_negatives, confusion.total());
        let precision = ratio(
            confusion.true_positives,
            confusion.true_positives + confusion.false_positives,
        );
        let recall = ratio(
            confusion.true_positives,
            confusion.true_positives + confusion.false_negatives,
        );
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1,
            confusion,
        }
    }

    pub fn from_predictions(actual: &[u8], predicted: &[u8]) -> Self {
        Self::from_confusion(ConfusionMatrix::from_predictions(actual, predicted))
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accuracy={:.4} precision={:.4} recall={:.4} f1={:.4}",
            self.accuracy, self.precision, self.recall, self.f1
        )
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
