//! Core data model for an evaluation run.
//!
//! An [`EvaluationConfig`] is built once per run through
//! [`EvaluationConfigBuilder`], which enforces the mode invariants, and is
//! read-only afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;
use crate::modes::ModeKind;

/// A system/user prompt pair with a stable identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub system_text: String,
    pub user_text: String,
}

impl Prompt {
    pub fn new(
        id: impl Into<String>,
        system_text: impl Into<String>,
        user_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            system_text: system_text.into(),
            user_text: user_text.into(),
        }
    }
}

/// The kind of check a criterion describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionType {
    Rubric,
    Comparison,
    Similarity,
    Structure,
}

impl fmt::Display for CriterionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CriterionType::Rubric => "rubric",
            CriterionType::Comparison => "comparison",
            CriterionType::Similarity => "similarity",
            CriterionType::Structure => "structure",
        };
        f.write_str(s)
    }
}

/// A named question used to grade candidate outputs.
///
/// `weight` is echoed into reports but never combined into a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    #[serde(rename = "type")]
    pub kind: CriterionType,
    pub name: String,
    pub question: String,
    pub weight: f64,
}

impl Criterion {
    pub fn rubric(name: impl Into<String>, question: impl Into<String>, weight: f64) -> Self {
        Self {
            kind: CriterionType::Rubric,
            name: name.into(),
            question: question.into(),
            weight,
        }
    }
}

/// Quality label of an expected output: either a score or a free label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quality {
    Score(f64),
    Label(String),
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Score(score) => write!(f, "{score}"),
            Quality::Label(label) => f.write_str(label),
        }
    }
}

impl From<&str> for Quality {
    fn from(label: &str) -> Self {
        Quality::Label(label.to_string())
    }
}

impl From<f64> for Quality {
    fn from(score: f64) -> Self {
        Quality::Score(score)
    }
}

/// One reference answer with its quality label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedOutput {
    pub quality: Quality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ExpectedOutput {
    pub fn new(quality: impl Into<Quality>, response: impl Into<String>) -> Self {
        Self {
            quality: quality.into(),
            description: None,
            response: Some(response.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    #[default]
    Auto,
    Concise,
    Detailed,
    /// No reasoning summary requested.
    #[serde(rename = "none")]
    Off,
}

impl SummaryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::Auto => "auto",
            SummaryMode::Concise => "concise",
            SummaryMode::Detailed => "detailed",
            SummaryMode::Off => "none",
        }
    }
}

fn default_sampling() -> f64 {
    1.0
}

/// Sampling and reasoning parameters sent with every model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LlmParams {
    #[serde(default = "default_sampling")]
    pub temperature: f64,
    #[serde(default = "default_sampling")]
    pub top_p: f64,
    #[serde(default)]
    pub effort: ReasoningEffort,
    #[serde(default)]
    pub summary: SummaryMode,
}

impl Default for LlmParams {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 1.0,
            effort: ReasoningEffort::Medium,
            summary: SummaryMode::Auto,
        }
    }
}

/// A model configuration: which model to call and how.
///
/// Used for both candidates and the judge. Never executable on its own; only
/// the generation layer consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(rename = "model")]
    pub model_id: String,
    #[serde(flatten)]
    pub params: LlmParams,
}

impl ModelSpec {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            params: LlmParams::default(),
        }
    }

    pub fn with_params(mut self, params: LlmParams) -> Self {
        self.params = params;
        self
    }
}

pub type CandidateSpec = ModelSpec;
pub type JudgeSpec = ModelSpec;

/// The full, validated description of one evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    prompt: Prompt,
    mode: ModeKind,
    structured: bool,
    candidates: Vec<CandidateSpec>,
    judge: JudgeSpec,
    criteria: Vec<Criterion>,
    expected_outputs: Vec<ExpectedOutput>,
    metadata: Option<serde_json::Value>,
}

impl EvaluationConfig {
    pub fn builder(prompt: Prompt, mode: ModeKind, judge: JudgeSpec) -> EvaluationConfigBuilder {
        EvaluationConfigBuilder {
            prompt,
            mode,
            structured: false,
            candidates: Vec::new(),
            judge,
            criteria: Vec::new(),
            expected_outputs: Vec::new(),
            metadata: None,
        }
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn mode(&self) -> ModeKind {
        self.mode
    }

    pub fn structured(&self) -> bool {
        self.structured
    }

    pub fn candidates(&self) -> &[CandidateSpec] {
        &self.candidates
    }

    pub fn judge(&self) -> &JudgeSpec {
        &self.judge
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn expected_outputs(&self) -> &[ExpectedOutput] {
        &self.expected_outputs
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    /// Return a copy of this configuration running under a different mode.
    ///
    /// The new mode's invariants are re-checked.
    pub fn with_mode(&self, mode: ModeKind) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        config.mode = mode;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.judge.model_id.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "judge.model".to_string(),
            });
        }
        if let Some(i) = self
            .candidates
            .iter()
            .position(|c| c.model_id.trim().is_empty())
        {
            return Err(ConfigError::MissingField {
                field: format!("candidates[{i}].model"),
            });
        }
        match self.mode {
            ModeKind::ReferenceFree if self.criteria.is_empty() => Err(ConfigError::Invalid {
                message: "reference_free mode requires at least one criterion".to_string(),
            }),
            ModeKind::GroundTruth if self.expected_outputs.is_empty() => {
                Err(ConfigError::Invalid {
                    message: "ground_truth mode requires at least one expected output"
                        .to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Collects the parts of an [`EvaluationConfig`] and validates them on `build`.
#[derive(Debug, Clone)]
pub struct EvaluationConfigBuilder {
    prompt: Prompt,
    mode: ModeKind,
    structured: bool,
    candidates: Vec<CandidateSpec>,
    judge: JudgeSpec,
    criteria: Vec<Criterion>,
    expected_outputs: Vec<ExpectedOutput>,
    metadata: Option<serde_json::Value>,
}

impl EvaluationConfigBuilder {
    pub fn structured(mut self, structured: bool) -> Self {
        self.structured = structured;
        self
    }

    pub fn candidate(mut self, candidate: CandidateSpec) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn candidates(mut self, candidates: impl IntoIterator<Item = CandidateSpec>) -> Self {
        self.candidates.extend(candidates);
        self
    }

    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn criteria(mut self, criteria: impl IntoIterator<Item = Criterion>) -> Self {
        self.criteria.extend(criteria);
        self
    }

    pub fn expected_output(mut self, expected: ExpectedOutput) -> Self {
        self.expected_outputs.push(expected);
        self
    }

    pub fn expected_outputs(mut self, expected: impl IntoIterator<Item = ExpectedOutput>) -> Self {
        self.expected_outputs.extend(expected);
        self
    }

    pub fn metadata(mut self, metadata: Option<serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn build(self) -> Result<EvaluationConfig, ConfigError> {
        let config = EvaluationConfig {
            prompt: self.prompt,
            mode: self.mode,
            structured: self.structured,
            candidates: self.candidates,
            judge: self.judge,
            criteria: self.criteria,
            expected_outputs: self.expected_outputs,
            metadata: self.metadata,
        };
        config.validate()?;
        Ok(config)
    }
}
