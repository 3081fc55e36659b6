//! Feature assembly
//!
//! This module builds the fixed-order model input for one student:
//! - Academic block: load, averages, failed/withdrawn courses, attendance, study hours
//! - Personal block: age, family situation, commute mode, enrollment year
//! - History block: average mean/spread and failed/passed event counts
//!
//! The transform and scorer were fit against this exact positional layout.

use serde::Serialize;
use tracing::debug;

use crate::config::InstitutionConfig;
use crate::error::PredictionError;
use crate::types::{AcademicEvent, AcademicSnapshot, PersonalProfile};

/// Length of the assembled feature vector
pub const FEATURE_COUNT: usize = 14;

/// Number of most recent history entries read per prediction
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Positional feature names
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "creditos_actuales",
    "promedio_actual",
    "materias_reprobadas",
    "materias_retiradas",
    "asistencia_promedio",
    "horas_estudio_semanal",
    "edad",
    "situacion_familiar_separados",
    "medio_transporte_publico",
    "año_inscripcion",
    "promedio_historico",
    "desviacion_promedio_historico",
    "eventos_reprobado",
    "eventos_aprobado",
];

const FAILED_MARKER: &str = "reprobado";
const PASSED_MARKER: &str = "aprobado";

/// Assembled model input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        self.0
    }

    /// Values paired with their positional names
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

/// Assemble, scale and validate the feature vector for one student.
///
/// Scale factors from the institution configuration are applied index-wise
/// over the overlapping prefix. The result is guaranteed to be finite.
pub fn assemble_features(
    academic: &AcademicSnapshot,
    personal: &PersonalProfile,
    history: &[AcademicEvent],
    config: Option<&InstitutionConfig>,
) -> Result<FeatureVector, PredictionError> {
    let mut values = [0.0; FEATURE_COUNT];
    values[0..6].copy_from_slice(&academic.values());
    values[6..10].copy_from_slice(&personal_block(personal));
    values[10..14].copy_from_slice(&history_block(history));

    if let Some(factors) = config.and_then(|c| c.scale_factors.as_deref()) {
        apply_scale_factors(&mut values, factors);
    }

    let features = FeatureVector(values);
    validate_features(&features)?;

    debug!(features = ?features.as_slice(), "assembled feature vector");
    Ok(features)
}

/// Age, separated-family flag, public-transport flag, enrollment year
pub fn personal_block(personal: &PersonalProfile) -> [f64; 4] {
    [
        f64::from(personal.age),
        if personal.is_family_separated() { 1.0 } else { 0.0 },
        if personal.uses_public_transport() { 1.0 } else { 0.0 },
        f64::from(personal.enrollment_year),
    ]
}

/// Mean and population std of recorded averages, failed and passed event counts
pub fn history_block(history: &[AcademicEvent]) -> [f64; 4] {
    if history.is_empty() {
        return [0.0; 4];
    }

    let averages: Vec<f64> = history.iter().filter_map(|e| e.average).collect();
    let (mean, std_dev) = mean_and_std(&averages);

    let mut failed = 0usize;
    let mut passed = 0usize;
    for event in history {
        let label = event.label.to_lowercase();
        if label.contains(FAILED_MARKER) {
            failed += 1;
        }
        // "reprobado" contains "aprobado", so a failed event also counts here
        if label.contains(PASSED_MARKER) {
            passed += 1;
        }
    }

    [mean, std_dev, failed as f64, passed as f64]
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Multiply each value by the factor at the same index; extra values stay unscaled
pub fn apply_scale_factors(values: &mut [f64], factors: &[f64]) {
    for (value, factor) in values.iter_mut().zip(factors) {
        *value *= factor;
    }
}

/// Reject vectors holding NaN or infinite values, naming the first offender
pub fn validate_features(features: &FeatureVector) -> Result<(), PredictionError> {
    match features.0.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(PredictionError::FeatureValidation {
            index,
            name: FEATURE_NAMES[index],
            value: features.0[index],
        }),
        None => Ok(()),
    }
}

/// Most recent `limit` events, newest first
pub fn recent_history(history: &[AcademicEvent], limit: usize) -> Vec<AcademicEvent> {
    let mut events = history.to_vec();
    events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    events.truncate(limit);
    events
}
