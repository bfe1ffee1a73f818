//! Logistic regression
//!
//! Inputs are standardized with the training means and deviations, then
//! weights are fit by L2-regularised batch gradient descent on log loss.

use serde::{Deserialize, Serialize};

use super::{check_training_set, sigmoid, ProbabilisticClassifier};
use crate::error::Result;
use crate::ml::features::{FeatureVector, NUM_FEATURES};

/// Logistic regression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Gradient descent step size
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Maximum number of full-batch iterations
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// L2 penalty on the weights (not the bias)
    #[serde(default = "default_l2")]
    pub l2: f64,
    /// Stop once every gradient component is below this
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            max_iter: default_max_iter(),
            l2: default_l2(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_max_iter() -> usize {
    1000
}

fn default_l2() -> f64 {
    1e-3
}

fn default_tolerance() -> f64 {
    1e-6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticConfig,
    means: [f64; NUM_FEATURES],
    scales: [f64; NUM_FEATURES],
    weights: [f64; NUM_FEATURES],
    bias: f64,
    /// Iterations actually run by the last fit
    iterations: usize,
    n_features: usize,
    trained: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticConfig::default())
    }
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            means: [0.0; NUM_FEATURES],
            scales: [1.0; NUM_FEATURES],
            weights: [0.0; NUM_FEATURES],
            bias: 0.0,
            iterations: 0,
            n_features: 0,
            trained: false,
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Absolute standardized weights
    pub fn feature_importance(&self) -> [f64; NUM_FEATURES] {
        self.weights.map(f64::abs)
    }

    fn standardize(&self, row: &FeatureVector) -> [f64; NUM_FEATURES] {
        let mut out = [0.0; NUM_FEATURES];
        for (j, v) in out.iter_mut().enumerate() {
            *v = (row[j] - self.means[j]) / self.scales[j];
        }
        out
    }

    fn decision(&self, x: &[f64; NUM_FEATURES]) -> f64 {
        self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.bias
    }

    fn fit_scaler(&mut self, rows: &[FeatureVector]) {
        let n = rows.len() as f64;
        let mut means = [0.0; NUM_FEATURES];
        for row in rows {
            for (j, m) in means.iter_mut().enumerate() {
                *m += row[j];
            }
        }
        for m in means.iter_mut() {
            *m /= n;
        }

        let mut scales = [0.0; NUM_FEATURES];
        for row in rows {
            for (j, s) in scales.iter_mut().enumerate() {
                *s += (row[j] - means[j]).powi(2);
            }
        }
        for s in scales.iter_mut() {
            *s = (*s / n).sqrt();
            if *s < 1e-12 {
                *s = 1.0;
            }
        }

        self.means = means;
        self.scales = scales;
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn name(&self) -> &str {
        "LogisticRegression"
    }

    fn fit(&mut self, rows: &[FeatureVector], labels: &[u8]) -> Result<()> {
        check_training_set(rows, labels)?;
        self.fit_scaler(rows);

        let xs: Vec<[f64; NUM_FEATURES]> = rows.iter().map(|r| self.standardize(r)).collect();
        let n = xs.len() as f64;

        self.weights = [0.0; NUM_FEATURES];
        self.bias = 0.0;
        self.iterations = 0;

        for _ in 0..self.config.max_iter {
            let mut grad_w = [0.0; NUM_FEATURES];
            let mut grad_b = 0.0;

            for (x, &y) in xs.iter().zip(labels) {
                let error = sigmoid(self.decision(x)) - f64::from(y);
                for (g, v) in grad_w.iter_mut().zip(x) {
                    *g += error * v;
                }
                grad_b += error;
            }

            let mut max_grad = (grad_b / n).abs();
            for (j, g) in grad_w.iter_mut().enumerate() {
                *g = *g / n + self.config.l2 * self.weights[j];
                max_grad = max_grad.max(g.abs());
            }

            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= self.config.learning_rate * g;
            }
            self.bias -= self.config.learning_rate * grad_b / n;
            self.iterations += 1;

            if max_grad < self.config.tolerance {
                break;
            }
        }

        self.n_features = NUM_FEATURES;
        self.trained = true;
        Ok(())
    }

    fn predict_proba(&self, row: &FeatureVector) -> f64 {
        if !self.trained {
            return 0.5;
        }
        sigmoid(self.decision(&self.standardize(row)))
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}
