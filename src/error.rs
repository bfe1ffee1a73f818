use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dataset not found at: {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("dataset schema error: {0}")]
    Schema(String),

    #[error("class {class} has no samples")]
    EmptyClass { class: u8 },

    #[error("selected model '{name}' does not support probability output")]
    NoProbabilisticModel { name: String },

    #[error("failed to load model from {}: {source}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("feature extraction failed: {0}")]
    FeatureExtraction(String),

    #[error("insufficient training data: {0}")]
    InsufficientData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("model not loaded")]
    ServingUnavailable,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("model encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn model_load<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::ModelLoad {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
