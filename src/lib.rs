//! Academic Stress - Risk prediction engine for student academic stress
//!
//! The engine turns one student's academic snapshot, personal profile and
//! recent academic history into stress and dropout likelihoods through a
//! deterministic pipeline: feature assembly → fitted transform → scorer
//! → risk-factor explanation.
//!
//! ## Modules
//!
//! - **Features**: Fixed-order 14-value feature vector with institution scaling
//! - **Artifacts**: Injected transform/scorer capability and JSON artifacts
//! - **Risk**: Threshold and institution-defined risk-factor rules
//! - **Pipeline**: Immutable prediction context shared across requests

pub mod artifacts;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod risk;
pub mod types;

pub use artifacts::{FeatureTransform, Scorer};
pub use config::{ArtifactSettings, InstitutionConfig};
pub use error::{ArtifactError, PredictionError};
pub use features::{assemble_features, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use pipeline::PredictionContext;
pub use risk::explain;
pub use types::{
    AcademicEvent, AcademicSnapshot, PersonalProfile, PredictionRequest, PredictionResponse,
    PredictionResult,
};

/// Engine version embedded in all prediction responses
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for prediction responses
pub const PRODUCER_NAME: &str = "academic-stress";
