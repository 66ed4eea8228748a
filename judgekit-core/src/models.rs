//! Candidate and judge model clients.
//!
//! Each client wraps a [`ModelSpec`] and a shared [`GenerationBackend`] and
//! turns exactly one backend call into one [`GenerationTrace`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{JudgeError, LlmError};
use crate::providers::{GenerationBackend, ResponseRequest, TextFormat};
use crate::trace::{GenerationTrace, StructuredVerdict, TraceResponse, TraceRole};
use crate::types::ModelSpec;

/// A model whose output is under evaluation.
#[derive(Clone)]
pub struct CandidateModel {
    spec: ModelSpec,
    backend: Arc<dyn GenerationBackend>,
}

impl CandidateModel {
    pub fn new(spec: ModelSpec, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { spec, backend }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Generate one response. Latency is the backend's measured call time.
    pub async fn generate(
        &self,
        system_text: &str,
        user_text: &str,
    ) -> Result<GenerationTrace, LlmError> {
        let request = ResponseRequest {
            model_id: self.spec.model_id.clone(),
            instructions: system_text.to_string(),
            input_text: user_text.to_string(),
            params: self.spec.params,
            text_format: None,
        };

        let output = self.backend.respond(request).await.inspect_err(|e| {
            warn!(model = %self.spec.model_id, error = %e, "Candidate generation failed");
        })?;

        debug!(
            model = %self.spec.model_id,
            latency_ms = output.elapsed.as_millis() as u64,
            "Candidate response received"
        );

        Ok(GenerationTrace {
            model_id: self.spec.model_id.clone(),
            role: TraceRole::Candidate,
            system_text: system_text.to_string(),
            user_text: user_text.to_string(),
            response: TraceResponse::Text(output.output_text),
            latency_seconds: Some(output.elapsed.as_secs_f64()),
            params: self.spec.params,
            metadata: None,
        })
    }
}

impl fmt::Debug for CandidateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with params: {:?}", self.spec.model_id, self.spec.params)
    }
}

/// A model used to score candidate outputs.
/// A parsed judge verdict together with the text the backend returned.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeReply {
    pub trace: GenerationTrace,
    pub raw_output: String,
}

#[derive(Clone)]
pub struct JudgeModel {
    spec: ModelSpec,
    backend: Arc<dyn GenerationBackend>,
}

impl JudgeModel {
    pub fn new(spec: ModelSpec, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { spec, backend }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn model_id(&self) -> &str {
        &self.spec.model_id
    }

    /// Request a schema-constrained verdict.
    ///
    /// The reply's trace carries a [`TraceResponse::Verdict`] and no latency.
    /// Output that does not parse as a verdict is a protocol error with the
    /// raw text attached.
    pub async fn judge(
        &self,
        system_text: &str,
        user_text: &str,
    ) -> Result<JudgeReply, JudgeError> {
        let request = ResponseRequest {
            model_id: self.spec.model_id.clone(),
            instructions: system_text.to_string(),
            input_text: user_text.to_string(),
            params: self.spec.params,
            text_format: Some(TextFormat::eval_result()),
        };

        let output = self.backend.respond(request).await?;
        let verdict = parse_verdict(&output.output_text)?;

        let trace = GenerationTrace {
            model_id: self.spec.model_id.clone(),
            role: TraceRole::Judge,
            system_text: system_text.to_string(),
            user_text: user_text.to_string(),
            response: TraceResponse::Verdict(verdict),
            latency_seconds: None,
            params: self.spec.params,
            metadata: None,
        };
        Ok(JudgeReply {
            trace,
            raw_output: output.output_text,
        })
    }
}

impl fmt::Debug for JudgeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with params: {:?}", self.spec.model_id, self.spec.params)
    }
}

/// Parse judge output text into a verdict.
pub fn parse_verdict(raw: &str) -> Result<StructuredVerdict, JudgeError> {
    serde_json::from_str::<StructuredVerdict>(raw.trim()).map_err(|e| {
        JudgeError::MalformedOutput {
            reason: format!("output does not match the verdict schema: {}", e),
            raw: raw.to_string(),
        }
    })
}
