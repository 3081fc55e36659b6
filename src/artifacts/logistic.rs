//! Logistic scorer with independent stress and dropout heads

use serde::{Deserialize, Serialize};

use super::Scorer;
use crate::error::ArtifactError;

/// One linear head followed by a sigmoid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticHead {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticHead {
    pub fn probability(&self, inputs: &[f64]) -> Result<f64, ArtifactError> {
        if self.weights.len() != inputs.len() {
            return Err(ArtifactError::ShapeMismatch {
                expected: self.weights.len(),
                actual: inputs.len(),
            });
        }

        let logit = self
            .weights
            .iter()
            .zip(inputs)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        Ok(sigmoid(logit))
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Trained scorer: `stress` and `dropout` heads over the transformed inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticScorer {
    pub stress: LogisticHead,
    pub dropout: LogisticHead,
}

impl Scorer for LogisticScorer {
    fn score(&self, inputs: &[f64]) -> Result<(f64, f64), ArtifactError> {
        Ok((
            self.stress.probability(inputs)?,
            self.dropout.probability(inputs)?,
        ))
    }
}
