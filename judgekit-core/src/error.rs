//! Error types for the judgekit evaluation engine.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering configuration, generation backend, judge protocol, and report
//! persistence failures.

use std::path::PathBuf;

use crate::report::EvaluationReport;
use crate::runner::RunStage;

/// Top-level error type for the judgekit core library.
#[derive(Debug, thiserror::Error)]
pub enum JudgeKitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation error: {0}")]
    Llm(#[from] LlmError),

    #[error("Judge error: {0}")]
    Judge(#[from] JudgeError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Evaluation was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from generation backend interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Unsupported provider: {provider}")]
    UnsupportedProvider { provider: String },
}

/// Errors from a judge call or from the judge's structured output.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("Strategy '{strategy}' has no judge attached")]
    MissingJudge { strategy: String },

    #[error("Judge call failed: {0}")]
    Backend(#[from] LlmError),

    #[error("Malformed judge output: {reason}")]
    MalformedOutput { reason: String, raw: String },
}

impl JudgeError {
    /// Raw judge output attached to a protocol error, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            JudgeError::MalformedOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Errors from evaluation configuration and input documents.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Unknown evaluation mode '{name}'. Available modes: {}", .valid.join(", "))]
    UnknownMode { name: String, valid: Vec<String> },

    #[error("Evaluation mode '{mode}' has no registered implementation. Registered modes: {}", .registered.join(", "))]
    ModeNotRegistered { mode: String, registered: Vec<String> },

    #[error("No value provided for prompt variable '{name}'")]
    MissingVariable { name: String },

    #[error("Multiple files for '{field}' are not supported")]
    UnsupportedFileList { field: String },
}

/// Errors from report persistence.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Could not save results to {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    #[error("Could not read report {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },
}

/// Failure of an evaluation run, naming the stage that failed.
///
/// When the run fails while persisting, the fully computed report is kept in
/// `report` so the caller can still surface it.
#[derive(Debug, thiserror::Error)]
#[error("Evaluation execution failed while {}: {source}", .stage.describe())]
pub struct ExecutionError {
    pub stage: RunStage,
    #[source]
    pub source: JudgeKitError,
    pub report: Option<Box<EvaluationReport>>,
}

impl ExecutionError {
    pub fn new(stage: RunStage, source: impl Into<JudgeKitError>) -> Self {
        Self {
            stage,
            source: source.into(),
            report: None,
        }
    }

    pub fn with_report(mut self, report: EvaluationReport) -> Self {
        self.report = Some(Box::new(report));
        self
    }
}

/// A type alias for results using the top-level `JudgeKitError`.
pub type Result<T> = std::result::Result<T, JudgeKitError>;
