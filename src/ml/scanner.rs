//! Serving boundary for URL classification
//!
//! [`UrlScanner`] holds the process-wide model handle. The model is loaded
//! once and shared as an immutable `Arc`; a reload builds a new classifier
//! and swaps the reference, so callers already holding the old one finish
//! on it undisturbed. A failed load leaves the scanner unavailable instead of
//! failing startup.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::features::FeatureExtractor;
use super::inference::{InferenceClassifier, RiskLevel, Thresholds, Verdict};
use super::models::{Model, ProbabilisticClassifier};
use super::storage::ModelStore;
use crate::config::Config;
use crate::error::{PipelineError, Result};

/// Classification of one URL, as handed to the web layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub url: String,
    pub label: Verdict,
    pub phishing_probability: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
}

/// Receives every scan result
pub trait ScanSink: Send + Sync {
    fn report(&self, result: &ScanResult);
}

/// Emits one structured `info` event per scan
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ScanSink for TracingSink {
    fn report(&self, result: &ScanResult) {
        info!(
            url = %result.url,
            label = %result.label,
            probability = result.phishing_probability,
            risk_level = %result.risk_level,
            risk_factors = result.risk_factors.len(),
            "URL scanned"
        );
    }
}

/// Keeps scan results in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<ScanResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<ScanResult> {
        self.results.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    pub fn clear(&self) {
        self.results.lock().clear();
    }
}

impl ScanSink for MemorySink {
    fn report(&self, result: &ScanResult) {
        self.results.lock().push(result.clone());
    }
}

/// Trim a user-supplied URL and require an http(s) scheme
pub fn validate_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(PipelineError::InvalidUrl("URL is required".to_string()));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(PipelineError::InvalidUrl(
            "URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(url)
}

pub struct UrlScanner {
    extractor: FeatureExtractor,
    thresholds: Thresholds,
    classifier: RwLock<Option<Arc<InferenceClassifier>>>,
}

impl UrlScanner {
    /// Create a scanner with no model installed
    pub fn new(extractor: FeatureExtractor, thresholds: Thresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self {
            extractor,
            thresholds,
            classifier: RwLock::new(None),
        })
    }

    /// Build from configuration and try to load the configured artifact
    pub fn from_config(config: &Config) -> Result<Self> {
        let scanner = Self::new(FeatureExtractor::new(&config.features), config.thresholds)?;
        scanner.load_from(&config.paths.model);
        Ok(scanner)
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Load an artifact, logging and staying unavailable on failure.
    /// Returns whether a model is now installed.
    pub fn load_from(&self, path: impl AsRef<Path>) -> bool {
        match self.reload(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Model unavailable: {}", e);
                self.is_available()
            }
        }
    }

    /// Load an artifact and swap it in. On error the current model stays.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<()> {
        let model = ModelStore::new(path.as_ref()).load()?;
        self.install(model)
    }

    /// Install an already-trained model
    pub fn install(&self, model: Model) -> Result<()> {
        let name = model.name().to_string();
        let classifier = Arc::new(InferenceClassifier::new(model, self.thresholds)?);
        *self.classifier.write() = Some(classifier);
        info!("Serving model {}", name);
        Ok(())
    }

    /// Drop the current model
    pub fn unload(&self) {
        *self.classifier.write() = None;
    }

    pub fn is_available(&self) -> bool {
        self.classifier.read().is_some()
    }

    /// Current classifier handle, if any
    pub fn classifier(&self) -> Option<Arc<InferenceClassifier>> {
        self.classifier.read().clone()
    }

    pub fn scan(&self, url: &str) -> Result<ScanResult> {
        let classifier = self.classifier().ok_or(PipelineError::ServingUnavailable)?;

        let features = self.extractor.extract(url);
        let classification = classifier.classify(&features);

        Ok(ScanResult {
            url: url.to_string(),
            label: classification.label,
            phishing_probability: classification.phishing_probability,
            risk_level: classification.risk_level,
            risk_factors: self.extractor.explain(url),
        })
    }

    /// Scan and hand the result to a sink
    pub fn scan_and_report(&self, url: &str, sink: &dyn ScanSink) -> Result<ScanResult> {
        let result = self.scan(url)?;
        sink.report(&result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::test_support::toy_dataset;
    use crate::ml::{GradientBoostConfig, GradientBoosting, LogisticRegression};
    use tempfile::tempdir;

    fn trained() -> Model {
        let (rows, labels) = toy_dataset(20);
        let mut model = Model::LogisticRegression(LogisticRegression::default());
        model.fit(&rows, &labels).unwrap();
        model
    }

    fn scanner() -> UrlScanner {
        UrlScanner::new(FeatureExtractor::default(), Thresholds::default()).unwrap()
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(validate_url("  https://example.com ").unwrap(), "https://example.com");
        assert!(validate_url("http://example.com").is_ok());
        assert!(matches!(validate_url(""), Err(PipelineError::InvalidUrl(_))));
        assert!(matches!(validate_url("ftp://example.com"), Err(PipelineError::InvalidUrl(_))));
        assert!(validate_url("example.com").is_err());
    }

    #[test]
    fn test_unavailable_without_model() {
        let scanner = scanner();
        assert!(!scanner.is_available());
        assert!(matches!(
            scanner.scan("https://example.com"),
            Err(PipelineError::ServingUnavailable)
        ));
    }

    #[test]
    fn test_load_from_missing_fails_soft() {
        let dir = tempdir().unwrap();
        let scanner = scanner();
        assert!(!scanner.load_from(dir.path().join("missing.bin")));
        assert!(!scanner.is_available());
    }

    #[test]
    fn test_scan_reports_to_sink() {
        let scanner = scanner();
        scanner.install(trained()).unwrap();

        let sink = MemorySink::new();
        let result = scanner
            .scan_and_report("http://secure-login.bank-update.com/verify", &sink)
            .unwrap();

        assert!((0.0..=1.0).contains(&result.phishing_probability));
        assert!(!result.risk_factors.is_empty());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.results()[0], result);
    }

    #[test]
    fn test_reload_swaps_without_touching_old_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");

        let (rows, labels) = toy_dataset(20);
        let mut boosted = Model::GradientBoosting(GradientBoosting::new(
            GradientBoostConfig {
                n_estimators: 5,
                ..Default::default()
            },
            1,
        ));
        boosted.fit(&rows, &labels).unwrap();
        ModelStore::new(&path).save(&boosted).unwrap();

        let scanner = scanner();
        scanner.install(trained()).unwrap();
        let old = scanner.classifier().unwrap();

        scanner.reload(&path).unwrap();
        let new = scanner.classifier().unwrap();

        assert_eq!(old.model().name(), "LogisticRegression");
        assert_eq!(new.model().name(), "GradientBoosting");
        assert!(!Arc::ptr_eq(&old, &new));
    }

    #[test]
    fn test_failed_reload_keeps_current_model() {
        let dir = tempdir().unwrap();
        let scanner = scanner();
        scanner.install(trained()).unwrap();

        assert!(scanner.reload(dir.path().join("missing.bin")).is_err());
        assert!(scanner.is_available());

        scanner.unload();
        assert!(!scanner.is_available());
    }

    #[test]
    fn test_scanner_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UrlScanner>();
        assert_send_sync::<MemorySink>();
    }
}
