//! Stress CLI - Command-line interface for the academic stress engine
//!
//! Commands:
//! - predict: Score a prediction request with the loaded artifacts
//! - features: Print the assembled feature vector for a request
//! - explain: Print the triggered risk factors for a request
//! - doctor: Diagnose artifact availability and configuration

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use academic_stress::config::ArtifactSettings;
use academic_stress::features::assemble_features;
use academic_stress::{
    explain, InstitutionConfig, PredictionContext, PredictionError, PredictionRequest,
    ENGINE_VERSION, PRODUCER_NAME,
};

/// Stress - Academic stress and dropout risk prediction
#[derive(Parser)]
#[command(name = "stress")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Predict academic stress risk for students", long_about = None)]
struct Cli {
    /// Default log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: Level,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a prediction request
    Predict {
        /// Request file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Response file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Artifact directory
        #[arg(long, env = "STRESS_ARTIFACTS_PATH")]
        artifacts: Option<PathBuf>,

        /// Keep only this many of the most recent history entries
        #[arg(long)]
        history_window: Option<usize>,
    },

    /// Print the assembled feature vector
    Features {
        /// Request file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the triggered risk factors
    Explain {
        /// Request file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Diagnose artifacts and configuration
    Doctor {
        /// Artifact directory
        #[arg(long, env = "STRESS_ARTIFACTS_PATH")]
        artifacts: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Install the global subscriber; `RUST_LOG` takes precedence over `level`
fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(io::stderr).with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}

fn run(cli: Cli) -> Result<(), StressCliError> {
    match cli.command {
        Commands::Predict {
            input,
            output,
            artifacts,
            history_window,
        } => cmd_predict(&input, &output, artifacts, history_window),

        Commands::Features { input } => cmd_features(&input),

        Commands::Explain { input } => cmd_explain(&input),

        Commands::Doctor { artifacts, json } => cmd_doctor(artifacts, json),
    }
}

/// File names still come from the environment; the directory comes from `--artifacts`
fn artifact_settings(artifacts: Option<PathBuf>) -> ArtifactSettings {
    let settings = ArtifactSettings::from_env();
    match artifacts {
        Some(dir) => ArtifactSettings { dir, ..settings },
        None => settings,
    }
}

fn read_input(input: &Path) -> Result<String, StressCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_request(input: &Path) -> Result<PredictionRequest, StressCliError> {
    let raw = read_input(input)?;
    Ok(serde_json::from_str(&raw)?)
}

fn cmd_predict(
    input: &Path,
    output: &Path,
    artifacts: Option<PathBuf>,
    history_window: Option<usize>,
) -> Result<(), StressCliError> {
    let settings = artifact_settings(artifacts);
    let mut context = PredictionContext::load(&settings)?;
    if let Some(window) = history_window {
        context = context.with_history_window(window);
    }

    let raw = read_input(input)?;
    let response = context.predict_json(&raw)?;

    if output.to_string_lossy() == "-" {
        println!("{}", response);
    } else {
        fs::write(output, response)?;
    }

    Ok(())
}

fn cmd_features(input: &Path) -> Result<(), StressCliError> {
    let request = read_request(input)?;
    let rows = feature_rows(&request)?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn feature_rows(request: &PredictionRequest) -> Result<Vec<serde_json::Value>, StressCliError> {
    let config = InstitutionConfig::from_optional(request.institution_config.as_ref())?;
    request.personal.validate()?;

    let features = assemble_features(
        &request.academic,
        &request.personal,
        &request.history,
        config.as_ref(),
    )?;
    // positional order matters, so emit a list rather than a map
    Ok(features
        .named()
        .enumerate()
        .map(|(index, (name, value))| {
            serde_json::json!({ "index": index, "name": name, "value": value })
        })
        .collect())
}

fn cmd_explain(input: &Path) -> Result<(), StressCliError> {
    let request = read_request(input)?;
    let factors = explain_request(&request)?;
    println!("{}", serde_json::to_string_pretty(&factors)?);
    Ok(())
}

fn explain_request(request: &PredictionRequest) -> Result<Vec<String>, StressCliError> {
    let config = InstitutionConfig::from_optional(request.institution_config.as_ref())?;
    request.personal.validate()?;

    Ok(explain(
        &request.academic,
        &request.personal,
        &request.history,
        config.as_ref(),
    ))
}

fn cmd_doctor(artifacts: Option<PathBuf>, json: bool) -> Result<(), StressCliError> {
    let settings = artifact_settings(artifacts);
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    if settings.dir.is_dir() {
        checks.push(DoctorCheck {
            name: "artifacts_dir".to_string(),
            status: CheckStatus::Ok,
            message: format!("Artifact directory {}", settings.dir.display()),
        });
    } else {
        checks.push(DoctorCheck {
            name: "artifacts_dir".to_string(),
            status: CheckStatus::Error,
            message: format!("Artifact directory {} does not exist", settings.dir.display()),
        });
    }

    for (name, path) in [
        ("preprocessor", settings.preprocessor_path()),
        ("model", settings.model_path()),
    ] {
        let check = if path.is_file() {
            DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Ok,
                message: format!("Found {}", path.display()),
            }
        } else {
            DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Error,
                message: format!("Missing {}", path.display()),
            }
        };
        checks.push(check);
    }

    // Only attempt a full load when both files exist
    if checks.iter().all(|c| matches!(c.status, CheckStatus::Ok)) {
        let check = match PredictionContext::load(&settings) {
            Ok(_) => DoctorCheck {
                name: "artifacts_load".to_string(),
                status: CheckStatus::Ok,
                message: "Transform and scorer decoded".to_string(),
            },
            Err(e) => DoctorCheck {
                name: "artifacts_load".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass requests with --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Stress Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(StressCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum StressCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Prediction(PredictionError),
    DoctorFailed,
}

impl From<io::Error> for StressCliError {
    fn from(e: io::Error) -> Self {
        StressCliError::Io(e)
    }
}

impl From<serde_json::Error> for StressCliError {
    fn from(e: serde_json::Error) -> Self {
        StressCliError::Json(e)
    }
}

impl From<PredictionError> for StressCliError {
    fn from(e: PredictionError) -> Self {
        StressCliError::Prediction(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StressCliError> for CliError {
    fn from(e: StressCliError) -> Self {
        match e {
            StressCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StressCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax and request field names".to_string()),
            },
            StressCliError::Prediction(e) => prediction_error(e),
            StressCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn prediction_error(e: PredictionError) -> CliError {
    let (code, hint) = match &e {
        PredictionError::FeatureValidation { .. } => {
            ("INVALID_FEATURES", "Check the request for NaN or infinite values")
        }
        PredictionError::InvalidInput(_) => ("INVALID_INPUT", "Fix the personal profile fields"),
        PredictionError::Configuration(_) => {
            ("INVALID_CONFIGURATION", "Fix the institution configuration blob")
        }
        PredictionError::Scoring(_) => (
            "SCORING_FAILED",
            "Check that the artifacts match the feature layout",
        ),
        PredictionError::ArtifactLoad { .. } => {
            ("ARTIFACT_LOAD_FAILED", "Run 'stress doctor' for details")
        }
        PredictionError::Json(_) => ("JSON_ERROR", "Check JSON syntax and request field names"),
    };

    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint.to_string()),
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Error,
}
