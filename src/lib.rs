//! phishguard: URL phishing classification
//!
//! Lexical URL features feed a model selected at training time from several
//! candidate families. At serving time a [`UrlScanner`] turns the model's
//! phishing probability into a three-tier verdict with human-readable risk
//! factors.
//!
//! ```ignore
//! use phishguard::{Config, UrlScanner};
//!
//! let config = Config::load_or_default()?;
//! let scanner = UrlScanner::from_config(&config)?;
//! if scanner.is_available() {
//!     let result = scanner.scan("http://192.168.0.1/login")?;
//!     println!("{} {:.2}", result.label, result.phishing_probability);
//! }
//! ```

pub mod config;
pub mod error;
pub mod ml;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use ml::{
    FeatureExtractor, FeatureVector, InferenceClassifier, Model, ModelStore, ScanResult, ScanSink,
    Thresholds, TrainingPipeline, UrlScanner,
};
