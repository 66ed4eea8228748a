//! Composable entry points for callers that do not need the full runner.
//!
//! Every function takes its backend (and, where relevant, its mode registry)
//! explicitly; nothing here reads global state.

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::generation::ResponseGenerator;
use crate::loader::{PromptVariables, load_evaluation_config};
use crate::models::JudgeModel;
use crate::modes::{EvaluationMode, GroundTruthMode, ModeRegistry, ReferenceFreeMode};
use crate::providers::GenerationBackend;
use crate::trace::{EvalTrace, GenerationTrace};
use crate::types::EvaluationConfig;

/// Generate one response per configured candidate.
pub async fn generate_responses(
    config: &EvaluationConfig,
    backend: Arc<dyn GenerationBackend>,
) -> Result<Vec<GenerationTrace>> {
    let generator = ResponseGenerator::new(config.candidates(), backend);
    let prompt = config.prompt();
    Ok(generator
        .generate_responses(&prompt.system_text, &prompt.user_text)
        .await?)
}

/// Judge `responses` with the mode named in `config`.
pub async fn run_evaluation(
    config: &EvaluationConfig,
    responses: &[GenerationTrace],
    registry: &ModeRegistry,
    judge_backend: Arc<dyn GenerationBackend>,
) -> Result<Vec<EvalTrace>> {
    info!(mode = %config.mode(), "Running evaluation");
    let mode = registry.get(config.mode())?;
    let judge = Arc::new(JudgeModel::new(config.judge().clone(), judge_backend));
    let results = mode.run(config, responses, judge).await?;
    info!(traces = results.len(), "Evaluation completed");
    Ok(results)
}

/// Load a config file, generate responses, and judge them.
pub async fn evaluate_from_config(
    config_path: &Path,
    variables: &mut PromptVariables,
    backend: Arc<dyn GenerationBackend>,
    registry: &ModeRegistry,
) -> Result<(EvaluationConfig, Vec<GenerationTrace>, Vec<EvalTrace>)> {
    let config = load_evaluation_config(config_path, variables)?;
    let responses = generate_responses(&config, Arc::clone(&backend)).await?;
    let results = run_evaluation(&config, &responses, registry, backend).await?;
    Ok((config, responses, results))
}

async fn evaluate_with(
    mode: &dyn EvaluationMode,
    config: &EvaluationConfig,
    responses: Option<Vec<GenerationTrace>>,
    backend: Arc<dyn GenerationBackend>,
) -> Result<Vec<EvalTrace>> {
    let config = config.with_mode(mode.kind())?;
    let responses = match responses {
        Some(responses) => responses,
        None => generate_responses(&config, Arc::clone(&backend)).await?,
    };
    let judge = Arc::new(JudgeModel::new(config.judge().clone(), backend));
    mode.run(&config, &responses, judge).await
}

/// Reference-free evaluation regardless of the configured mode.
///
/// Responses are generated first when none are given.
pub async fn evaluate_reference_free(
    config: &EvaluationConfig,
    responses: Option<Vec<GenerationTrace>>,
    backend: Arc<dyn GenerationBackend>,
) -> Result<Vec<EvalTrace>> {
    evaluate_with(&ReferenceFreeMode::new(), config, responses, backend).await
}

/// Ground-truth evaluation regardless of the configured mode.
pub async fn evaluate_ground_truth(
    config: &EvaluationConfig,
    responses: Option<Vec<GenerationTrace>>,
    backend: Arc<dyn GenerationBackend>,
) -> Result<Vec<EvalTrace>> {
    evaluate_with(&GroundTruthMode::new(), config, responses, backend).await
}
