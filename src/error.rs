//! Error types for the academic stress engine

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while assembling features or producing a prediction
#[derive(Debug, Error)]
pub enum PredictionError {
    /// The assembled vector holds a NaN or infinite value. Maps to a client input error.
    #[error("Feature {index} ({name}) is not finite: {value}")]
    FeatureValidation {
        index: usize,
        name: &'static str,
        value: f64,
    },

    /// The transform or scorer failed. Maps to a server-side error.
    #[error("Scoring failed: {0}")]
    Scoring(#[source] ArtifactError),

    #[error("Invalid institution configuration: {0}")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Failed to load artifact {}: {}", .path.display(), .source)]
    ArtifactLoad {
        path: PathBuf,
        #[source]
        source: ArtifactError,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a feature transform or a scorer
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Expected {expected} inputs, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed artifact: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
