//! Ground-truth evaluation: each criterion is judged once per expected output,
//! with the reference answer as the judge's instructions.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{EvaluationMode, ModeKind, drive_strategies};
use crate::error::{ConfigError, Result};
use crate::models::JudgeModel;
use crate::strategy::RubricStrategy;
use crate::trace::{EvalTrace, GenerationTrace, candidate_texts};
use crate::types::EvaluationConfig;

#[derive(Debug, Clone)]
pub struct GroundTruthMode {
    judge_concurrency: usize,
}

impl Default for GroundTruthMode {
    fn default() -> Self {
        Self {
            judge_concurrency: 1,
        }
    }
}

impl GroundTruthMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_judge_concurrency(mut self, judge_concurrency: usize) -> Self {
        self.judge_concurrency = judge_concurrency.max(1);
        self
    }

    /// Criterion outer, expected output inner.
    fn strategies(config: &EvaluationConfig, judge: &Arc<JudgeModel>) -> Vec<RubricStrategy> {
        config
            .criteria()
            .iter()
            .flat_map(|criterion| {
                config.expected_outputs().iter().map(move |expected| {
                    RubricStrategy::new(
                        expected.quality.to_string(),
                        Some(Arc::clone(judge)),
                        &criterion.question,
                    )
                    .with_system_prompt(expected.response.clone())
                    .with_weight(1.0)
                })
            })
            .collect()
    }
}

#[async_trait]
impl EvaluationMode for GroundTruthMode {
    fn kind(&self) -> ModeKind {
        ModeKind::GroundTruth
    }

    async fn run(
        &self,
        config: &EvaluationConfig,
        responses: &[GenerationTrace],
        judge: Arc<JudgeModel>,
    ) -> Result<Vec<EvalTrace>> {
        if config.expected_outputs().is_empty() {
            return Err(ConfigError::Invalid {
                message: "ground_truth mode requires at least one expected output".to_string(),
            }
            .into());
        }

        let texts = candidate_texts(responses);
        let strategies = Self::strategies(config, &judge);
        info!(
            criteria = config.criteria().len(),
            expected_outputs = config.expected_outputs().len(),
            candidates = texts.len(),
            concurrency = self.judge_concurrency,
            "Running ground-truth evaluation"
        );

        let traces = drive_strategies(&strategies, &texts, self.judge_concurrency).await?;
        Ok(traces)
    }
}
