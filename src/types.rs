//! Core types for the academic stress engine
//!
//! This module defines the records that flow through the prediction pipeline:
//! the per-request student inputs, the prediction result, and the persisted
//! prediction record returned to callers.
//!
//! Wire names follow the JSON keys used by the surrounding service, so a
//! request body can be decoded directly into these types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::PredictionError;

/// Family situation category treated as a risk signal
pub const FAMILY_SEPARATED: &str = "separados";

/// Commute mode category encoded by the model
pub const COMMUTE_PUBLIC: &str = "publico";

/// Current academic load and performance for one student.
///
/// Every field is optional on the wire and reads as `0.0` when absent or null.
/// Unrecognized keys are retained in `extra` so institution rules can reference them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcademicSnapshot {
    /// Credits currently enrolled
    #[serde(
        rename = "creditos_actuales",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub credit_load: Option<f64>,
    /// Current grade average
    #[serde(
        rename = "promedio_actual",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_average: Option<f64>,
    /// Courses failed
    #[serde(
        rename = "materias_reprobadas",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub failed_courses: Option<f64>,
    /// Courses withdrawn
    #[serde(
        rename = "materias_retiradas",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub withdrawn_courses: Option<f64>,
    /// Average attendance
    #[serde(
        rename = "asistencia_promedio",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub attendance: Option<f64>,
    /// Weekly study hours
    #[serde(
        rename = "horas_estudio_semanal",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub weekly_study_hours: Option<f64>,
    /// Any other fields supplied by the caller
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl AcademicSnapshot {
    /// The six academic model inputs in positional order, missing values as `0.0`
    pub fn values(&self) -> [f64; 6] {
        [
            self.credit_load.unwrap_or(0.0),
            self.current_average.unwrap_or(0.0),
            self.failed_courses.unwrap_or(0.0),
            self.withdrawn_courses.unwrap_or(0.0),
            self.attendance.unwrap_or(0.0),
            self.weekly_study_hours.unwrap_or(0.0),
        ]
    }

    /// Resolve a field by its wire name
    pub fn field(&self, name: &str) -> Option<Value> {
        let known = match name {
            "creditos_actuales" => self.credit_load,
            "promedio_actual" => self.current_average,
            "materias_reprobadas" => self.failed_courses,
            "materias_retiradas" => self.withdrawn_courses,
            "asistencia_promedio" => self.attendance,
            "horas_estudio_semanal" => self.weekly_study_hours,
            other => return self.extra.get(other).filter(|v| !v.is_null()).cloned(),
        };
        known.map(Value::from)
    }
}

/// Contact details attached to a personal profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "direccion")]
    pub address: String,
}

/// Personal profile of a student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalProfile {
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "edad")]
    pub age: u32,
    /// Accepts a plain date or a timestamp, keeping only the date
    #[serde(
        rename = "fecha_nacimiento",
        default,
        deserialize_with = "calendar_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "año_inscripcion")]
    pub enrollment_year: i32,
    #[serde(rename = "carrera", default)]
    pub program: String,
    #[serde(rename = "semestre")]
    pub semester: u32,
    /// Commute mode category (e.g. "publico")
    #[serde(rename = "medio_transporte", default)]
    pub commute_mode: String,
    /// Family situation category (e.g. "separados")
    #[serde(rename = "situacion_familiar", default)]
    pub family_situation: String,
    #[serde(rename = "contacto", default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
}

impl PersonalProfile {
    pub fn is_family_separated(&self) -> bool {
        self.family_situation == FAMILY_SEPARATED
    }

    pub fn uses_public_transport(&self) -> bool {
        self.commute_mode == COMMUTE_PUBLIC
    }

    /// Check the constraints a profile must satisfy before it is scored
    pub fn validate(&self) -> Result<(), PredictionError> {
        if self.enrollment_year < 1900 {
            return Err(PredictionError::InvalidInput(format!(
                "año_inscripcion must be >= 1900, got {}",
                self.enrollment_year
            )));
        }
        if !(1..=10).contains(&self.semester) {
            return Err(PredictionError::InvalidInput(format!(
                "semestre must be between 1 and 10, got {}",
                self.semester
            )));
        }
        Ok(())
    }

    /// Resolve a field by its wire name
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "nombre" => Some(Value::from(self.name.as_str())),
            "edad" => Some(Value::from(self.age)),
            "fecha_nacimiento" => self.birth_date.map(|d| Value::from(d.to_string())),
            "año_inscripcion" => Some(Value::from(self.enrollment_year)),
            "carrera" => Some(Value::from(self.program.as_str())),
            "semestre" => Some(Value::from(self.semester)),
            "medio_transporte" => Some(Value::from(self.commute_mode.as_str())),
            "situacion_familiar" => Some(Value::from(self.family_situation.as_str())),
            _ => None,
        }
    }
}

/// One entry of a student's academic history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicEvent {
    /// RFC 3339, or a naive timestamp read as UTC
    #[serde(rename = "fecha", deserialize_with = "utc_timestamp")]
    pub occurred_at: DateTime<Utc>,
    /// Free-text label, inspected for "reprobado" / "aprobado"
    #[serde(rename = "evento")]
    pub label: String,
    #[serde(rename = "detalles", default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Grade average recorded with the event, if any
    #[serde(rename = "promedio", default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
}

/// Number, numeric string or null
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn utc_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(raw.trim())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw:?}")))
}

fn calendar_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) => raw,
        None => return Ok(None),
    };
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(trimmed).map(|ts| ts.date_naive()))
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw:?}")))
}

/// A prediction request as received from the surrounding service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "estudiante_id")]
    pub student_id: i64,
    #[serde(rename = "datos_academicos", default)]
    pub academic: AcademicSnapshot,
    #[serde(rename = "datos_personales")]
    pub personal: PersonalProfile,
    #[serde(rename = "historial_academico", default)]
    pub history: Vec<AcademicEvent>,
    /// Raw institution configuration blob, parsed on use
    #[serde(rename = "configuracion", default, skip_serializing_if = "Option::is_none")]
    pub institution_config: Option<Value>,
}

/// Output of the prediction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Stress likelihood (0-1)
    #[serde(rename = "nivel_estres")]
    pub stress: f64,
    /// Dropout likelihood (0-1)
    #[serde(rename = "probabilidad_abandono")]
    pub dropout: f64,
    /// Triggered risk factors in evaluation order
    #[serde(rename = "factores_riesgo")]
    pub risk_factors: Vec<String>,
}

/// A stored stress prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    #[serde(rename = "estudiante_id")]
    pub student_id: i64,
    #[serde(rename = "fecha_prediccion")]
    pub predicted_at: DateTime<Utc>,
    #[serde(rename = "nivel_estres")]
    pub stress: f64,
    #[serde(rename = "probabilidad_abandono")]
    pub dropout: f64,
    #[serde(rename = "factores_riesgo")]
    pub risk_factors: Vec<String>,
}

/// Engine producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Response payload for a prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(rename = "prediccion")]
    pub prediction: PredictionRecord,
    /// `[stress, dropout]`
    #[serde(rename = "probabilidades")]
    pub probabilities: Vec<f64>,
    pub producer: Producer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample_profile() -> PersonalProfile {
        PersonalProfile {
            name: "Ana Torres".to_string(),
            age: 20,
            birth_date: None,
            enrollment_year: 2022,
            program: "Ingeniería".to_string(),
            semester: 4,
            commute_mode: "publico".to_string(),
            family_situation: "separados".to_string(),
            contact: None,
        }
    }

    #[test]
    fn test_academic_snapshot_defaults_missing_to_zero() {
        let snapshot: AcademicSnapshot =
            serde_json::from_str(r#"{"creditos_actuales": 20, "promedio_actual": null}"#).unwrap();

        assert_eq!(snapshot.values(), [20.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_academic_snapshot_keeps_extra_fields() {
        let snapshot: AcademicSnapshot =
            serde_json::from_str(r#"{"horas_trabajo": 30, "creditos_actuales": 12}"#).unwrap();

        assert_eq!(snapshot.field("horas_trabajo"), Some(Value::from(30)));
        assert_eq!(snapshot.field("creditos_actuales"), Some(Value::from(12.0)));
        assert_eq!(snapshot.field("materias_retiradas"), None);
    }

    #[test]
    fn test_personal_profile_wire_names() {
        let json = r#"{
            "nombre": "Ana Torres",
            "edad": 20,
            "fecha_nacimiento": "2004-03-01",
            "año_inscripcion": 2022,
            "carrera": "Ingeniería",
            "semestre": 4,
            "medio_transporte": "publico",
            "situacion_familiar": "separados",
            "contacto": {"email": "ana@example.edu", "telefono": "555-0100", "direccion": "Calle 1"}
        }"#;
        let profile: PersonalProfile = serde_json::from_str(json).unwrap();

        assert!(profile.is_family_separated());
        assert!(profile.uses_public_transport());
        assert_eq!(profile.field("semestre"), Some(Value::from(4)));
        assert_eq!(profile.field("fecha_nacimiento"), Some(Value::from("2004-03-01")));
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_profile_validation_rejects_semester_out_of_range() {
        let mut profile = sample_profile();
        profile.semester = 0;
        assert!(matches!(profile.validate(), Err(PredictionError::InvalidInput(_))));

        profile.semester = 11;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_profile_validation_rejects_old_enrollment_year() {
        let mut profile = sample_profile();
        profile.enrollment_year = 1899;
        assert!(matches!(profile.validate(), Err(PredictionError::InvalidInput(_))));
    }

    #[test]
    fn test_negative_age_is_rejected_on_decode() {
        let json = r#"{"edad": -1, "año_inscripcion": 2022, "semestre": 2}"#;
        assert!(serde_json::from_str::<PersonalProfile>(json).is_err());
    }

    #[test]
    fn test_academic_snapshot_accepts_numeric_strings() {
        let snapshot: AcademicSnapshot = serde_json::from_str(
            r#"{"creditos_actuales": "20", "promedio_actual": " 7.5 ", "materias_reprobadas": null}"#,
        )
        .unwrap();

        assert_eq!(snapshot.values(), [20.0, 7.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_academic_snapshot_rejects_non_numeric_text() {
        let result = serde_json::from_str::<AcademicSnapshot>(r#"{"creditos_actuales": "veinte"}"#);
        assert!(result.is_err());

        let result = serde_json::from_str::<AcademicSnapshot>(r#"{"creditos_actuales": true}"#);
        assert!(result.is_err());

        let result = serde_json::from_str::<AcademicSnapshot>(r#"{"creditos_actuales": ""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_event_accepts_naive_timestamp_and_null_details() {
        let event: AcademicEvent = serde_json::from_str(
            r#"{"fecha": "2024-06-01T12:00:00", "evento": "Examen reprobado", "detalles": null, "promedio": 4.5}"#,
        )
        .unwrap();

        assert_eq!(
            event.occurred_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(event.details, None);
        assert_eq!(event.average, Some(4.5));
    }

    #[test]
    fn test_event_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        for raw in [
            "2024-06-01T10:00:00Z",
            "2024-06-01T12:00:00+02:00",
            "2024-06-01T10:00:00.000000",
            "2024-06-01 10:00:00",
        ] {
            let json = serde_json::json!({"fecha": raw, "evento": "Inscripción"});
            let event: AcademicEvent = serde_json::from_value(json).unwrap();
            assert_eq!(event.occurred_at, expected, "parsing {raw}");
        }

        let json = serde_json::json!({"fecha": "ayer", "evento": "Inscripción"});
        assert!(serde_json::from_value::<AcademicEvent>(json).is_err());
    }

    #[test]
    fn test_birth_date_accepts_date_or_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2004, 3, 1);
        for raw in ["2004-03-01", "2004-03-01T00:00:00"] {
            let json = serde_json::json!({
                "edad": 20, "fecha_nacimiento": raw, "año_inscripcion": 2022, "semestre": 2
            });
            let profile: PersonalProfile = serde_json::from_value(json).unwrap();
            assert_eq!(profile.birth_date, expected);
        }

        let json = serde_json::json!({
            "edad": 20, "fecha_nacimiento": null, "año_inscripcion": 2022, "semestre": 2
        });
        let profile: PersonalProfile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.birth_date, None);
    }

    #[test]
    fn test_prediction_result_serializes_wire_names() {
        let result = PredictionResult {
            stress: 0.5,
            dropout: 0.25,
            risk_factors: vec!["Alta carga académica".to_string()],
        };
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["nivel_estres"], 0.5);
        assert_eq!(value["probabilidad_abandono"], 0.25);
        assert_eq!(value["factores_riesgo"][0], "Alta carga académica");
    }
}
