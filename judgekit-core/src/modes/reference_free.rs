//! Reference-free evaluation: one rubric judgement per criterion.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{EvaluationMode, ModeKind, drive_strategies};
use crate::error::Result;
use crate::models::JudgeModel;
use crate::strategy::RubricStrategy;
use crate::trace::{EvalTrace, GenerationTrace, candidate_texts};
use crate::types::EvaluationConfig;

/// Grades all candidates against each criterion with no reference answer.
#[derive(Debug, Clone)]
pub struct ReferenceFreeMode {
    judge_concurrency: usize,
}

impl Default for ReferenceFreeMode {
    fn default() -> Self {
        Self {
            judge_concurrency: 1,
        }
    }
}

impl ReferenceFreeMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_judge_concurrency(mut self, judge_concurrency: usize) -> Self {
        self.judge_concurrency = judge_concurrency.max(1);
        self
    }

    fn strategies(config: &EvaluationConfig, judge: &Arc<JudgeModel>) -> Vec<RubricStrategy> {
        config
            .criteria()
            .iter()
            .map(|criterion| {
                RubricStrategy::new(&criterion.name, Some(Arc::clone(judge)), &criterion.question)
                    .with_weight(criterion.weight)
            })
            .collect()
    }
}

#[async_trait]
impl EvaluationMode for ReferenceFreeMode {
    fn kind(&self) -> ModeKind {
        ModeKind::ReferenceFree
    }

    async fn run(
        &self,
        config: &EvaluationConfig,
        responses: &[GenerationTrace],
        judge: Arc<JudgeModel>,
    ) -> Result<Vec<EvalTrace>> {
        let texts = candidate_texts(responses);
        let strategies = Self::strategies(config, &judge);
        info!(
            criteria = strategies.len(),
            candidates = texts.len(),
            judge = judge.model_id(),
            concurrency = self.judge_concurrency,
            "Running reference-free evaluation"
        );

        let traces = drive_strategies(&strategies, &texts, self.judge_concurrency).await?;
        Ok(traces)
    }
}
