//! Model artifacts
//!
//! The engine treats the fitted transform and the trained scorer as injected
//! capabilities. Any implementation of [`FeatureTransform`] and [`Scorer`] can
//! back a prediction context; the JSON artifacts in this module are the ones
//! loaded from the artifact directory at startup.

mod logistic;
mod scaler;

pub use logistic::{LogisticHead, LogisticScorer};
pub use scaler::{IdentityTransform, StandardScaler};

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{ArtifactError, PredictionError};
use crate::features::FeatureVector;

/// Fitted transform turning a raw feature vector into model-ready inputs
pub trait FeatureTransform: Send + Sync {
    fn transform(&self, features: &FeatureVector) -> Result<Vec<f64>, ArtifactError>;
}

/// Trained scorer returning `(stress, dropout)` probabilities
pub trait Scorer: Send + Sync {
    fn score(&self, inputs: &[f64]) -> Result<(f64, f64), ArtifactError>;
}

/// Read and decode a JSON artifact, naming the path on failure
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, PredictionError> {
    let load = || -> Result<T, ArtifactError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    };

    let artifact = load().map_err(|source| PredictionError::ArtifactLoad {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loaded artifact");
    Ok(artifact)
}
