//! Configuration
//!
//! Two kinds of configuration feed the engine:
//! - the optional per-institution blob (scale factors, thresholds, custom rules),
//!   decoded from JSON on each request
//! - the artifact location, resolved once at startup

use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::warn;

use crate::error::PredictionError;
use crate::types::{AcademicSnapshot, PersonalProfile};

/// Credit load above which "high academic load" is flagged
pub const DEFAULT_LOAD_THRESHOLD: f64 = 18.0;

/// Number of failing history entries above which "failure history" is flagged
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 2.0;

/// Default artifact directory, relative to the working directory
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Default fitted transform file name
pub const DEFAULT_PREPROCESSOR_FILE: &str = "preprocessor_final.json";

/// Default trained scorer file name
pub const DEFAULT_MODEL_FILE: &str = "model_final_pred.json";

pub const ENV_ARTIFACTS_DIR: &str = "STRESS_ARTIFACTS_PATH";
pub const ENV_PREPROCESSOR_FILE: &str = "STRESS_PREPROCESSOR_NAME";
pub const ENV_MODEL_FILE: &str = "STRESS_MODEL_NAME";

const KEY_SCALE_FACTORS: &str = "factores_escala";
const KEY_LOAD_THRESHOLD: &str = "umbral_carga_academica";
const KEY_FAILURE_THRESHOLD: &str = "umbral_reprobacion";
const KEY_CUSTOM_RULES: &str = "factores_adicionales";

/// Per-institution tuning of feature scaling and risk rules
#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionConfig {
    /// Per-feature multipliers, aligned positionally with the feature vector
    pub scale_factors: Option<Vec<f64>>,
    pub load_threshold: f64,
    pub failure_threshold: f64,
    pub custom_rules: Vec<CustomRule>,
}

impl Default for InstitutionConfig {
    fn default() -> Self {
        Self {
            scale_factors: None,
            load_threshold: DEFAULT_LOAD_THRESHOLD,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            custom_rules: Vec::new(),
        }
    }
}

impl InstitutionConfig {
    /// Decode an institution configuration blob.
    ///
    /// Malformed scale factors or thresholds abort. A malformed custom rule is
    /// skipped so the remaining rules still apply.
    pub fn from_value(value: &Value) -> Result<Self, PredictionError> {
        let object = value.as_object().ok_or_else(|| {
            PredictionError::Configuration("configuration must be a JSON object".to_string())
        })?;

        let scale_factors = parse_scale_factors(object)?;
        let load_threshold =
            parse_threshold(object, KEY_LOAD_THRESHOLD)?.unwrap_or(DEFAULT_LOAD_THRESHOLD);
        let failure_threshold =
            parse_threshold(object, KEY_FAILURE_THRESHOLD)?.unwrap_or(DEFAULT_FAILURE_THRESHOLD);
        let custom_rules = parse_custom_rules(object);

        Ok(Self {
            scale_factors,
            load_threshold,
            failure_threshold,
            custom_rules,
        })
    }

    /// Decode an optional blob, treating JSON `null` like an absent configuration
    pub fn from_optional(value: Option<&Value>) -> Result<Option<Self>, PredictionError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Self::from_value(value).map(Some),
        }
    }
}

fn parse_scale_factors(object: &Map<String, Value>) -> Result<Option<Vec<f64>>, PredictionError> {
    let raw = match object.get(KEY_SCALE_FACTORS) {
        None | Some(Value::Null) => return Ok(None),
        Some(raw) => raw,
    };

    let entries = raw.as_array().ok_or_else(|| {
        PredictionError::Configuration(format!("{KEY_SCALE_FACTORS} must be an array"))
    })?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry.as_f64().ok_or_else(|| {
                PredictionError::Configuration(format!(
                    "{KEY_SCALE_FACTORS}[{i}] is not a number: {entry}"
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn parse_threshold(object: &Map<String, Value>, key: &str) -> Result<Option<f64>, PredictionError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => raw.as_f64().map(Some).ok_or_else(|| {
            PredictionError::Configuration(format!("{key} is not a number: {raw}"))
        }),
    }
}

fn parse_custom_rules(object: &Map<String, Value>) -> Vec<CustomRule> {
    let entries = match object.get(KEY_CUSTOM_RULES) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            warn!(value = %other, "{KEY_CUSTOM_RULES} is not an array, ignoring custom rules");
            return Vec::new();
        }
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| match CustomRule::from_value(entry) {
            Ok(rule) => Some(rule),
            Err(reason) => {
                warn!(index = i, %reason, "skipping malformed custom rule");
                None
            }
        })
        .collect()
}

/// Where a custom rule reads its field from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    Academic,
    Personal,
    Unsupported(String),
}

impl From<&str> for RuleSource {
    fn from(raw: &str) -> Self {
        match raw {
            "academico" | "académico" => RuleSource::Academic,
            "personal" => RuleSource::Personal,
            other => RuleSource::Unsupported(other.to_string()),
        }
    }
}

/// Comparison applied by a custom rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    Equal,
    Unsupported(String),
}

impl From<&str> for Comparison {
    fn from(raw: &str) -> Self {
        match raw {
            ">" => Comparison::Greater,
            "<" => Comparison::Less,
            "==" => Comparison::Equal,
            other => Comparison::Unsupported(other.to_string()),
        }
    }
}

impl Comparison {
    /// Apply the comparison. Mismatched or unsupported operands never match.
    pub fn matches(&self, actual: &Value, expected: &Value) -> bool {
        match self {
            Comparison::Greater => compare(actual, expected) == Some(std::cmp::Ordering::Greater),
            Comparison::Less => compare(actual, expected) == Some(std::cmp::Ordering::Less),
            Comparison::Equal => match (actual.as_f64(), expected.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => actual == expected,
            },
            Comparison::Unsupported(_) => false,
        }
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<std::cmp::Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Institution-defined risk rule
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRule {
    /// Wire name of the field to inspect
    pub field: String,
    pub source: RuleSource,
    pub comparison: Comparison,
    pub value: Value,
    /// Label appended when the rule triggers
    pub label: String,
}

impl CustomRule {
    /// Decode a rule definition (`campo`, `tipo`, `operador`, `valor`, `nombre`)
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| "rule must be a JSON object".to_string())?;

        let field = text_key(object, "campo")?.to_string();
        let source = RuleSource::from(text_key(object, "tipo")?);
        let comparison = Comparison::from(text_key(object, "operador")?);
        let label = text_key(object, "nombre")?.to_string();
        let value = object
            .get("valor")
            .cloned()
            .ok_or_else(|| "missing key 'valor'".to_string())?;

        Ok(Self {
            field,
            source,
            comparison,
            value,
            label,
        })
    }

    /// Whether the rule fires for this student
    pub fn evaluate(&self, academic: &AcademicSnapshot, personal: &PersonalProfile) -> bool {
        let actual = match &self.source {
            RuleSource::Academic => academic.field(&self.field),
            RuleSource::Personal => personal.field(&self.field),
            RuleSource::Unsupported(_) => None,
        };

        actual.is_some_and(|actual| self.comparison.matches(&actual, &self.value))
    }
}

fn text_key<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing or non-string key '{key}'"))
}

/// Location of the fitted transform and trained scorer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSettings {
    pub dir: PathBuf,
    pub preprocessor: String,
    pub model: String,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            preprocessor: DEFAULT_PREPROCESSOR_FILE.to_string(),
            model: DEFAULT_MODEL_FILE.to_string(),
        }
    }
}

impl ArtifactSettings {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Resolve settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            dir: lookup(ENV_ARTIFACTS_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.dir),
            preprocessor: lookup(ENV_PREPROCESSOR_FILE).unwrap_or(defaults.preprocessor),
            model: lookup(ENV_MODEL_FILE).unwrap_or(defaults.model),
        }
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.dir.join(&self.preprocessor)
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model)
    }
}
