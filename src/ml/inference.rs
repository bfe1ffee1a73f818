//! Probability to risk label policy
//!
//! A phishing probability is mapped onto three bands:
//!
//! | probability            | label      | risk   |
//! |------------------------|------------|--------|
//! | `p >= phishing`        | PHISHING   | High   |
//! | `p >= suspicious`      | SUSPICIOUS | Medium |
//! | otherwise              | LEGITIMATE | Low    |

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::features::FeatureVector;
use super::models::{Model, ProbabilisticClassifier};
use crate::error::{PipelineError, Result};

/// Band boundaries (inclusive lower edge of each upper band)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_phishing")]
    pub phishing: f64,
    #[serde(default = "default_suspicious")]
    pub suspicious: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            phishing: default_phishing(),
            suspicious: default_suspicious(),
        }
    }
}

fn default_phishing() -> f64 {
    0.60
}

fn default_suspicious() -> f64 {
    0.30
}

impl Thresholds {
    pub fn new(phishing: f64, suspicious: f64) -> Result<Self> {
        let thresholds = Self {
            phishing,
            suspicious,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Require `0 <= suspicious <= phishing <= 1`
    pub fn validate(&self) -> Result<()> {
        let ordered = 0.0 <= self.suspicious && self.suspicious <= self.phishing && self.phishing <= 1.0;
        if !ordered {
            return Err(PipelineError::InvalidConfig(format!(
                "thresholds must satisfy 0 <= suspicious ({}) <= phishing ({}) <= 1",
                self.suspicious, self.phishing
            )));
        }
        Ok(())
    }

    /// Band a probability
    pub fn classify(&self, probability: f64) -> (Verdict, RiskLevel) {
        if probability >= self.phishing {
            (Verdict::Phishing, RiskLevel::High)
        } else if probability >= self.suspicious {
            (Verdict::Suspicious, RiskLevel::Medium)
        } else {
            (Verdict::Legitimate, RiskLevel::Low)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Phishing,
    Suspicious,
    Legitimate,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Phishing => "PHISHING",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Legitimate => "LEGITIMATE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub phishing_probability: f64,
    pub label: Verdict,
    pub risk_level: RiskLevel,
}

/// Owns a trained model and applies the threshold policy
#[derive(Debug, Clone)]
pub struct InferenceClassifier<C = Model> {
    model: C,
    thresholds: Thresholds,
}

impl<C: ProbabilisticClassifier> InferenceClassifier<C> {
    pub fn new(model: C, thresholds: Thresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { model, thresholds })
    }

    pub fn model(&self) -> &C {
        &self.model
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// P(phishing), clamped to [0, 1]. Non-finite model output becomes 0.5.
    pub fn probability(&self, features: &FeatureVector) -> f64 {
        let p = self.model.predict_proba(features);
        if !p.is_finite() {
            warn!("{} returned non-finite probability {}, using 0.5", self.model.name(), p);
            return 0.5;
        }
        p.clamp(0.0, 1.0)
    }

    pub fn classify(&self, features: &FeatureVector) -> Classification {
        let phishing_probability = self.probability(features);
        let (label, risk_level) = self.thresholds.classify(phishing_probability);
        Classification {
            phishing_probability,
            label,
            risk_level,
        }
    }
}
