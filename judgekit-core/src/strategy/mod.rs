//! Scoring strategies.
//!
//! A strategy turns a set of candidate responses into one judged
//! [`EvalTrace`]. Modes construct strategies and drive them.

pub mod rubric;

use async_trait::async_trait;

use crate::error::JudgeError;
use crate::trace::EvalTrace;

pub use rubric::RubricStrategy;

#[async_trait]
pub trait ScoringStrategy: Send + Sync {
    /// Label attached to the produced trace.
    fn name(&self) -> &str;

    /// Judge all `candidate_responses` in a single call.
    async fn evaluate(
        &self,
        candidate_responses: &[String],
        reference: Option<&str>,
    ) -> Result<EvalTrace, JudgeError>;
}
