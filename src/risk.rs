//! Risk-factor explanation
//!
//! Threshold rules that turn a student's inputs into human-readable labels
//! surfaced alongside the numeric prediction. Rules run in a fixed order and
//! every triggered rule appends its label; labels are not deduplicated.

use tracing::debug;

use crate::config::{InstitutionConfig, DEFAULT_FAILURE_THRESHOLD, DEFAULT_LOAD_THRESHOLD};
use crate::types::{AcademicEvent, AcademicSnapshot, PersonalProfile};

pub const HIGH_ACADEMIC_LOAD: &str = "Alta carga académica";
pub const FAILURE_HISTORY: &str = "Historial de reprobación";
pub const COMPLEX_FAMILY_SITUATION: &str = "Situación familiar compleja";

/// History averages below this count as failing
pub const FAILING_AVERAGE: f64 = 6.0;

/// Evaluate the built-in rules, then any institution rules, in order
pub fn explain(
    academic: &AcademicSnapshot,
    personal: &PersonalProfile,
    history: &[AcademicEvent],
    config: Option<&InstitutionConfig>,
) -> Vec<String> {
    let load_threshold = config.map_or(DEFAULT_LOAD_THRESHOLD, |c| c.load_threshold);
    let failure_threshold = config.map_or(DEFAULT_FAILURE_THRESHOLD, |c| c.failure_threshold);

    let mut factors = Vec::new();

    if academic.credit_load.unwrap_or(0.0) > load_threshold {
        factors.push(HIGH_ACADEMIC_LOAD.to_string());
    }

    if !history.is_empty() && failing_entries(history) as f64 > failure_threshold {
        factors.push(FAILURE_HISTORY.to_string());
    }

    if personal.is_family_separated() {
        factors.push(COMPLEX_FAMILY_SITUATION.to_string());
    }

    if let Some(config) = config {
        for rule in &config.custom_rules {
            if rule.evaluate(academic, personal) {
                factors.push(rule.label.clone());
            }
        }
    }

    debug!(?factors, "evaluated risk factors");
    factors
}

/// History entries with a recorded average below [`FAILING_AVERAGE`]
fn failing_entries(history: &[AcademicEvent]) -> usize {
    history
        .iter()
        .filter(|e| e.average.is_some_and(|avg| avg < FAILING_AVERAGE))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn academic(credit_load: f64) -> AcademicSnapshot {
        AcademicSnapshot {
            credit_load: Some(credit_load),
            ..Default::default()
        }
    }

    fn personal(family_situation: &str) -> PersonalProfile {
        PersonalProfile {
            name: "Ana Torres".to_string(),
            age: 20,
            birth_date: None,
            enrollment_year: 2022,
            program: "Ingeniería".to_string(),
            semester: 4,
            commute_mode: "publico".to_string(),
            family_situation: family_situation.to_string(),
            contact: None,
        }
    }

    fn history(averages: &[Option<f64>]) -> Vec<AcademicEvent> {
        averages
            .iter()
            .map(|average| AcademicEvent {
                occurred_at: Utc::now(),
                label: "Calificación final".to_string(),
                details: None,
                average: *average,
            })
            .collect()
    }

    #[test]
    fn test_load_threshold_is_strict() {
        let factors = explain(&academic(19.0), &personal("casados"), &[], None);
        assert_eq!(factors, vec![HIGH_ACADEMIC_LOAD.to_string()]);

        let factors = explain(&academic(18.0), &personal("casados"), &[], None);
        assert!(factors.is_empty());
    }

    #[test]
    fn test_missing_credit_load_reads_as_zero() {
        let factors = explain(&AcademicSnapshot::default(), &personal("casados"), &[], None);
        assert!(factors.is_empty());
    }

    #[test]
    fn test_two_failing_entries_do_not_trigger() {
        let events = history(&[Some(5.0), Some(5.5), Some(6.0)]);
        let factors = explain(&academic(12.0), &personal("casados"), &events, None);
        assert!(factors.is_empty());
    }

    #[test]
    fn test_three_failing_entries_trigger() {
        let events = history(&[Some(4.0), Some(5.0), Some(5.5)]);
        let factors = explain(&academic(12.0), &personal("casados"), &events, None);
        assert_eq!(factors, vec![FAILURE_HISTORY.to_string()]);
    }

    #[test]
    fn test_null_averages_are_not_failing() {
        let events = history(&[None, None, None, Some(3.0)]);
        let factors = explain(&academic(12.0), &personal("casados"), &events, None);
        assert!(factors.is_empty());
    }

    #[test]
    fn test_family_situation() {
        let factors = explain(&academic(12.0), &personal("separados"), &[], None);
        assert_eq!(factors, vec![COMPLEX_FAMILY_SITUATION.to_string()]);
    }

    #[test]
    fn test_thresholds_from_config() {
        let config = InstitutionConfig::from_value(&json!({
            "umbral_carga_academica": 15,
            "umbral_reprobacion": 0
        }))
        .unwrap();
        let events = history(&[Some(5.0)]);

        let factors = explain(&academic(16.0), &personal("casados"), &events, Some(&config));
        assert_eq!(
            factors,
            vec![HIGH_ACADEMIC_LOAD.to_string(), FAILURE_HISTORY.to_string()]
        );
    }

    #[test]
    fn test_evaluation_order_and_duplicates() {
        let config = InstitutionConfig::from_value(&json!({
            "factores_adicionales": [
                {"campo": "edad", "tipo": "personal", "operador": "<", "valor": 21, "nombre": "Estudiante joven"},
                {"campo": "bogus", "tipo": "personal", "operador": "==", "valor": 1, "nombre": "Nunca"},
                {"campo": "creditos_actuales", "tipo": "academico", "operador": ">", "valor": 18, "nombre": "Alta carga académica"}
            ]
        }))
        .unwrap();
        let events = history(&[Some(1.0), Some(2.0), Some(3.0)]);

        let factors = explain(&academic(25.0), &personal("separados"), &events, Some(&config));
        assert_eq!(
            factors,
            vec![
                HIGH_ACADEMIC_LOAD.to_string(),
                FAILURE_HISTORY.to_string(),
                COMPLEX_FAMILY_SITUATION.to_string(),
                "Estudiante joven".to_string(),
                HIGH_ACADEMIC_LOAD.to_string(),
            ]
        );
    }
}
