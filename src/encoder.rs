//! Prediction encoding
//!
//! This module turns a pipeline result into the stored prediction record and
//! the response payload returned to callers.

use chrono::Utc;
use uuid::Uuid;

use crate::error::PredictionError;
use crate::types::{PredictionRecord, PredictionResponse, PredictionResult, Producer};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Encoder for prediction responses
#[derive(Debug, Clone)]
pub struct PredictionEncoder {
    instance_id: String,
}

impl Default for PredictionEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Build the record stored for this prediction
    pub fn record(&self, student_id: i64, result: &PredictionResult) -> PredictionRecord {
        PredictionRecord {
            id: Uuid::new_v4().to_string(),
            student_id,
            predicted_at: Utc::now(),
            stress: result.stress,
            dropout: result.dropout,
            risk_factors: result.risk_factors.clone(),
        }
    }

    /// Encode a result into a response payload
    pub fn encode(&self, student_id: i64, result: &PredictionResult) -> PredictionResponse {
        PredictionResponse {
            prediction: self.record(student_id, result),
            probabilities: vec![result.stress, result.dropout],
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        student_id: i64,
        result: &PredictionResult,
    ) -> Result<String, PredictionError> {
        let response = self.encode(student_id, result);
        Ok(serde_json::to_string_pretty(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result() -> PredictionResult {
        PredictionResult {
            stress: 0.7,
            dropout: 0.2,
            risk_factors: vec!["Alta carga académica".to_string()],
        }
    }

    #[test]
    fn test_encode_response() {
        let encoder = PredictionEncoder::with_instance_id("instance-1".to_string());
        let response = encoder.encode(42, &result());

        assert_eq!(response.probabilities, vec![0.7, 0.2]);
        assert_eq!(response.prediction.student_id, 42);
        assert_eq!(response.prediction.risk_factors, result().risk_factors);
        assert_eq!(response.producer.instance_id, "instance-1");
        assert_eq!(response.producer.name, PRODUCER_NAME);
        assert!(Uuid::parse_str(&response.prediction.id).is_ok());
    }

    #[test]
    fn test_records_get_distinct_ids() {
        let encoder = PredictionEncoder::new();
        let first = encoder.record(1, &result());
        let second = encoder.record(1, &result());

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_encode_to_json_wire_names() {
        let encoder = PredictionEncoder::new();
        let json = encoder.encode_to_json(7, &result()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["prediccion"]["estudiante_id"], 7);
        assert_eq!(payload["prediccion"]["nivel_estres"], 0.7);
        assert_eq!(payload["probabilidades"][1], 0.2);
        assert!(payload["prediccion"]["fecha_prediccion"].is_string());
    }
}
