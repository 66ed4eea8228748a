//! # judgekit Core
//!
//! Core library for judgekit, an LLM-as-a-judge evaluation engine.
//! Generates candidate responses concurrently, scores them with a judge model
//! through pluggable evaluation modes, and writes JSON reports.

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod loader;
pub mod models;
pub mod modes;
pub mod providers;
pub mod report;
pub mod runner;
pub mod strategy;
pub mod trace;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{BackendConfig, EvaluationSettings, ReportConfig, Settings, load_settings};
pub use error::{
    ConfigError, ExecutionError, JudgeError, JudgeKitError, LlmError, ReportError, Result,
};
pub use generation::ResponseGenerator;
pub use loader::{PromptVariables, VariableResolver, load_evaluation_config};
pub use models::{CandidateModel, JudgeModel, JudgeReply};
pub use modes::{EvaluationMode, GroundTruthMode, ModeKind, ModeRegistry, ReferenceFreeMode};
pub use providers::{GenerationBackend, MockBackend, create_backend};
pub use report::{EvaluationReport, load_report, write_report};
pub use runner::{EvaluationRunner, RunOutcome, RunStage};
pub use strategy::{RubricStrategy, ScoringStrategy};
pub use trace::{EvalTrace, GenerationTrace, StructuredVerdict, TraceResponse, TraceRole};
pub use types::{
    CandidateSpec, Criterion, CriterionType, EvaluationConfig, ExpectedOutput, JudgeSpec,
    LlmParams, ModelSpec, Prompt, Quality, ReasoningEffort, SummaryMode,
};
