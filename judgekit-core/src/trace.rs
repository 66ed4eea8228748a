//! Immutable records of individual model calls.

use serde::{Deserialize, Serialize};

use crate::types::LlmParams;

/// Which side of the evaluation made the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceRole {
    Candidate,
    Judge,
}

impl TraceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceRole::Candidate => "candidate",
            TraceRole::Judge => "judge",
        }
    }
}

/// Schema-constrained judge output: `scores[i]` and `reasons[i]` belong to
/// the i-th candidate passed to the judge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuredVerdict {
    pub scores: Vec<f64>,
    pub reasons: Vec<String>,
}

impl StructuredVerdict {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// What a model call returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceResponse {
    Text(String),
    Verdict(StructuredVerdict),
    Empty,
}

impl TraceResponse {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TraceResponse::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_verdict(&self) -> Option<&StructuredVerdict> {
        match self {
            TraceResponse::Verdict(verdict) => Some(verdict),
            _ => None,
        }
    }
}

/// One model call, candidate or judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTrace {
    pub model_id: String,
    pub role: TraceRole,
    pub system_text: String,
    pub user_text: String,
    pub response: TraceResponse,
    /// Wall-clock seconds around the backend call. `None` for judge calls.
    pub latency_seconds: Option<f64>,
    pub params: LlmParams,
    pub metadata: Option<serde_json::Value>,
}

/// A judge trace labelled with the criterion it graded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalTrace {
    #[serde(flatten)]
    pub generation: GenerationTrace,
    pub criterion_name: String,
    pub question: String,
}

impl EvalTrace {
    pub fn new(
        generation: GenerationTrace,
        criterion_name: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            generation,
            criterion_name: criterion_name.into(),
            question: question.into(),
        }
    }

    pub fn verdict(&self) -> Option<&StructuredVerdict> {
        self.generation.response.as_verdict()
    }
}

impl std::ops::Deref for EvalTrace {
    type Target = GenerationTrace;

    fn deref(&self) -> &Self::Target {
        &self.generation
    }
}

/// Text responses from a list of candidate traces, in order.
///
/// Traces without a text response are skipped.
pub fn candidate_texts(traces: &[GenerationTrace]) -> Vec<String> {
    traces
        .iter()
        .filter_map(|t| t.response.as_text().map(str::to_string))
        .collect()
}
