//! Pipeline orchestration
//!
//! This module provides the public prediction API. A [`PredictionContext`] is
//! built once at startup from the fitted transform and trained scorer and is
//! shared read-only across requests.
//!
//! Pipeline stages:
//! 1. Feature assembly (with optional institution scaling) and validation
//! 2. Transform + scorer inference
//! 3. Risk-factor explanation

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::artifacts::{read_artifact, FeatureTransform, LogisticScorer, Scorer, StandardScaler};
use crate::config::{ArtifactSettings, InstitutionConfig};
use crate::encoder::PredictionEncoder;
use crate::error::{ArtifactError, PredictionError};
use crate::features::{assemble_features, recent_history, FeatureVector};
use crate::risk::explain;
use crate::types::{
    AcademicEvent, AcademicSnapshot, PersonalProfile, PredictionRequest, PredictionResponse,
    PredictionResult,
};

/// Immutable prediction context holding the loaded artifacts
#[derive(Clone)]
pub struct PredictionContext {
    transform: Arc<dyn FeatureTransform>,
    scorer: Arc<dyn Scorer>,
    encoder: PredictionEncoder,
    history_window: Option<usize>,
}

impl fmt::Debug for PredictionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionContext")
            .field("encoder", &self.encoder)
            .field("history_window", &self.history_window)
            .finish_non_exhaustive()
    }
}

impl PredictionContext {
    /// Create a context from injected artifacts
    pub fn new(transform: Arc<dyn FeatureTransform>, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            transform,
            scorer,
            encoder: PredictionEncoder::new(),
            history_window: None,
        }
    }

    /// Load the JSON transform and scorer named by `settings`
    pub fn load(settings: &ArtifactSettings) -> Result<Self, PredictionError> {
        info!(dir = %settings.dir.display(), "loading prediction artifacts");
        let scaler: StandardScaler = read_artifact(&settings.preprocessor_path())?;
        let scorer: LogisticScorer = read_artifact(&settings.model_path())?;
        Ok(Self::new(Arc::new(scaler), Arc::new(scorer)))
    }

    /// Keep only the `window` most recent history entries in [`Self::predict_request`].
    ///
    /// Without a window the request history is used as given.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = Some(window);
        self
    }

    pub fn with_encoder(mut self, encoder: PredictionEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Run the transform and scorer. Failures surface unchanged as `Scoring`.
    pub fn score(&self, features: &FeatureVector) -> Result<(f64, f64), PredictionError> {
        let inputs = self
            .transform
            .transform(features)
            .map_err(PredictionError::Scoring)?;
        let (stress, dropout) = self
            .scorer
            .score(&inputs)
            .map_err(PredictionError::Scoring)?;

        debug!(stress, dropout, "scored features");
        Ok((stress, dropout))
    }

    /// Predict stress and dropout likelihood and explain the triggered risk factors
    pub fn predict(
        &self,
        academic: &AcademicSnapshot,
        personal: &PersonalProfile,
        history: &[AcademicEvent],
        config: Option<&InstitutionConfig>,
    ) -> Result<PredictionResult, PredictionError> {
        let features = assemble_features(academic, personal, history, config)?;
        let (stress, dropout) = self.score(&features)?;
        check_probability("stress", stress)?;
        check_probability("dropout", dropout)?;

        Ok(PredictionResult {
            stress,
            dropout,
            risk_factors: explain(academic, personal, history, config),
        })
    }

    /// Handle a full request: parse the institution configuration, validate the
    /// profile, apply the history window if one is set and encode the response
    pub fn predict_request(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, PredictionError> {
        let config = InstitutionConfig::from_optional(request.institution_config.as_ref())?;
        request.personal.validate()?;
        let windowed;
        let history = match self.history_window {
            Some(window) => {
                windowed = recent_history(&request.history, window);
                windowed.as_slice()
            }
            None => request.history.as_slice(),
        };

        let result = self.predict(&request.academic, &request.personal, history, config.as_ref())?;
        info!(
            student_id = request.student_id,
            stress = result.stress,
            dropout = result.dropout,
            factors = result.risk_factors.len(),
            "prediction complete"
        );
        Ok(self.encoder.encode(request.student_id, &result))
    }

    /// Decode a JSON request and return the JSON response
    pub fn predict_json(&self, raw_json: &str) -> Result<String, PredictionError> {
        let request: PredictionRequest = serde_json::from_str(raw_json)?;
        let response = self.predict_request(&request)?;
        Ok(serde_json::to_string_pretty(&response)?)
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), PredictionError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PredictionError::Scoring(ArtifactError::InvalidOutput(format!(
            "{name} probability {value} is outside [0, 1]"
        ))))
    }
}
