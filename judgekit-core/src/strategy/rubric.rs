//! Rubric-based scoring.
//!
//! One [`RubricStrategy`] grades every candidate against a single question in
//! one judge call. Modes create one instance per criterion (and per expected
//! output in ground-truth mode), all sharing the same judge.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::ScoringStrategy;
use crate::error::JudgeError;
use crate::models::{JudgeModel, JudgeReply};
use crate::trace::{EvalTrace, StructuredVerdict};

const NO_REFERENCE: &str = "No reference provided";

/// Default grader instructions; fixes the positional output contract.
pub const DEFAULT_JUDGE_PROMPT: &str = "\
You are an eval auto grader. Your job is to decide how good each candidate \
response is, based on the question given in the user prompt. Score every \
candidate between 0 and 10, where 10 is excellent. You are a harsh but fair \
grader.
ALWAYS respond with exactly one score and one reason per candidate, in the \
same order as the CANDIDATE labels:
scores: a list of floats between 0.0 and 10.0
reasons: a list of 2-3 sentence explanations, focusing on strengths and key \
weaknesses of each candidate

Example with one candidate:
{\"scores\": [8.0], \"reasons\": [\"The plan is well-structured and covers the \
stated preferences. The schedule is realistic, with a good balance of \
activities and rest.\"]}

Example with three candidates:
{\"scores\": [8.0, 7.0, 9.0], \"reasons\": [\"...\", \"...\", \"...\"]}";

/// Scores a single rubric question, e.g. "pace" or "budget".
pub struct RubricStrategy {
    name: String,
    judge: Option<Arc<JudgeModel>>,
    question: String,
    system_prompt: String,
    weight: f64,
}

impl RubricStrategy {
    pub fn new(
        name: impl Into<String>,
        judge: Option<Arc<JudgeModel>>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            judge,
            question: question.into(),
            system_prompt: DEFAULT_JUDGE_PROMPT.to_string(),
            weight: 1.0,
        }
    }

    /// Replace the judge system prompt. `None` keeps the default.
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        if let Some(prompt) = system_prompt {
            self.system_prompt = prompt;
        }
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Build the judge user prompt.
    pub fn build_judge_prompt(&self, candidate_responses: &[String], reference: Option<&str>) -> String {
        let mut prompt = format!("QUESTION: {}\n", self.question);
        for (i, candidate) in candidate_responses.iter().enumerate() {
            prompt.push_str(&format!("CANDIDATE {}: {}\n", i + 1, candidate));
        }
        prompt.push_str(&format!("REFERENCE: {}\n", reference.unwrap_or(NO_REFERENCE)));
        prompt
    }
}

/// Reject verdicts whose lists do not line up with the candidates.
fn check_positional(
    verdict: &StructuredVerdict,
    candidates: usize,
    raw_output: &str,
) -> Result<(), JudgeError> {
    if verdict.scores.len() == candidates && verdict.reasons.len() == candidates {
        return Ok(());
    }
    Err(JudgeError::MalformedOutput {
        reason: format!(
            "expected {} scores and reasons for {} candidates, got {} scores and {} reasons",
            candidates,
            candidates,
            verdict.scores.len(),
            verdict.reasons.len()
        ),
        raw: raw_output.to_string(),
    })
}

#[async_trait]
impl ScoringStrategy for RubricStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(
        &self,
        candidate_responses: &[String],
        reference: Option<&str>,
    ) -> Result<EvalTrace, JudgeError> {
        let judge = self.judge.as_ref().ok_or_else(|| JudgeError::MissingJudge {
            strategy: self.name.clone(),
        })?;

        let judge_prompt = self.build_judge_prompt(candidate_responses, reference);
        debug!(
            strategy = %self.name,
            candidates = candidate_responses.len(),
            judge = judge.model_id(),
            "Requesting rubric verdict"
        );

        let JudgeReply { trace, raw_output } =
            judge.judge(&self.system_prompt, &judge_prompt).await?;

        if let Some(verdict) = trace.response.as_verdict() {
            check_positional(verdict, candidate_responses.len(), &raw_output)?;
            if verdict.scores.iter().any(|s| !(0.0..=10.0).contains(s)) {
                warn!(strategy = %self.name, scores = ?verdict.scores, "Judge score outside 0-10");
            }
        }

        Ok(EvalTrace::new(trace, self.name.clone(), self.question.clone()))
    }
}
