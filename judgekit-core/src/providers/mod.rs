//! Generation backend implementations.
//!
//! Provides concrete implementations of the [`GenerationBackend`] trait for:
//! - the OpenAI Responses API (and compatible gateways)
//! - a scripted in-memory backend used by tests and dry runs
//!
//! Use [`create_backend()`] to instantiate the backend named in the settings.

pub mod mock;
pub mod openai_responses;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::LlmError;
use crate::types::LlmParams;

pub use mock::MockBackend;
pub use openai_responses::OpenAiResponsesBackend;

/// Name of the structured-output schema requested from judges.
pub const EVAL_RESULT_FORMAT: &str = "eval_result";

/// A JSON-schema constraint on the backend's output text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFormat {
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

impl TextFormat {
    /// The `{scores: [float], reasons: [string]}` verdict schema.
    pub fn eval_result() -> Self {
        Self {
            name: EVAL_RESULT_FORMAT.to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "scores": { "type": "array", "items": { "type": "number" } },
                    "reasons": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["scores", "reasons"],
                "additionalProperties": false
            }),
            strict: true,
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRequest {
    pub model_id: String,
    pub instructions: String,
    pub input_text: String,
    pub params: LlmParams,
    pub text_format: Option<TextFormat>,
}

/// What the backend returned, with the time spent waiting on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseOutput {
    pub output_text: String,
    pub elapsed: Duration,
}

/// Boundary to an external text-generation service.
///
/// Implementations make exactly one call per `respond` and never retry.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issue one generation call.
    async fn respond(&self, request: ResponseRequest) -> Result<ResponseOutput, LlmError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Create the backend described by the configuration.
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn GenerationBackend>, LlmError> {
    match config.provider.as_str() {
        "openai" | "openai_compat" | "azure" => {
            Ok(Arc::new(OpenAiResponsesBackend::new(config)?))
        }
        other => Err(LlmError::UnsupportedProvider {
            provider: other.to_string(),
        }),
    }
}
