//! End-to-end evaluation runs.
//!
//! [`EvaluationRunner`] walks one config file through
//! `Created -> ConfigLoaded -> ResponsesGenerated -> Evaluated -> Formatted -> Persisted`.
//! Each stage is attempted once. Any failure ends the run in `Failed` and is
//! returned as an [`ExecutionError`] naming the stage that was being attempted.

use chrono::Local;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ReportConfig;
use crate::error::{ExecutionError, JudgeKitError};
use crate::generation::ResponseGenerator;
use crate::loader::{PromptVariables, VariableResolver, load_evaluation_config};
use crate::models::JudgeModel;
use crate::modes::ModeRegistry;
use crate::providers::GenerationBackend;
use crate::report::{
    self, EvaluationReport, ModelSummary, default_output_path, format_report, write_report,
};
use crate::trace::{EvalTrace, GenerationTrace};
use crate::types::EvaluationConfig;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Created,
    ConfigLoaded,
    ResponsesGenerated,
    Evaluated,
    Formatted,
    Persisted,
    Failed,
}

impl RunStage {
    /// What the run is doing while trying to reach this stage.
    pub fn describe(&self) -> &'static str {
        match self {
            RunStage::Created => "starting",
            RunStage::ConfigLoaded => "loading the configuration",
            RunStage::ResponsesGenerated => "generating candidate responses",
            RunStage::Evaluated => "evaluating responses",
            RunStage::Formatted => "formatting the report",
            RunStage::Persisted => "saving the report",
            RunStage::Failed => "failed",
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub config_path: PathBuf,
    pub config: EvaluationConfig,
    pub responses: Vec<GenerationTrace>,
    pub results: Vec<EvalTrace>,
    pub report: EvaluationReport,
    pub output_path: PathBuf,
}

impl RunOutcome {
    pub fn console_summary(&self) -> String {
        report::render_console_summary(&self.config_path, &self.config, &self.results)
    }

    /// Per-model counts and mean latency over candidate and judge traces.
    pub fn model_summary(&self) -> Vec<ModelSummary> {
        report::summarize_by_model(
            self.responses
                .iter()
                .chain(self.results.iter().map(|trace| &trace.generation)),
        )
    }
}

struct StageTracker {
    stage: RunStage,
    cancel: CancellationToken,
}

impl StageTracker {
    /// Attempt the step that leads to `next`.
    ///
    /// Cancellation is checked before the step starts and raced against it
    /// while it runs.
    async fn advance<T, E, F>(&mut self, next: RunStage, step: F) -> Result<T, ExecutionError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<JudgeKitError>,
    {
        let outcome = if self.cancel.is_cancelled() {
            Err(JudgeKitError::Cancelled)
        } else {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(JudgeKitError::Cancelled),
                result = step => result.map_err(Into::into),
            }
        };

        match outcome {
            Ok(value) => {
                debug!(from = ?self.stage, to = ?next, "Run stage reached");
                self.stage = next;
                Ok(value)
            }
            Err(source) => {
                warn!(stage = ?next, error = %source, "Evaluation run failed");
                self.stage = RunStage::Failed;
                Err(ExecutionError::new(next, source))
            }
        }
    }
}

/// Runs one evaluation config end to end.
pub struct EvaluationRunner {
    config_path: PathBuf,
    output_path: Option<PathBuf>,
    report_dir: PathBuf,
    variables: PromptVariables,
    registry: ModeRegistry,
    candidate_backend: Arc<dyn GenerationBackend>,
    judge_backend: Arc<dyn GenerationBackend>,
    cancel: CancellationToken,
}

impl EvaluationRunner {
    /// Candidates and judge share `backend` unless [`Self::with_judge_backend`] is used.
    pub fn new(
        config_path: impl Into<PathBuf>,
        backend: Arc<dyn GenerationBackend>,
        registry: ModeRegistry,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            output_path: None,
            report_dir: ReportConfig::default().output_dir,
            variables: PromptVariables::new(),
            registry,
            judge_backend: Arc::clone(&backend),
            candidate_backend: backend,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_judge_backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.judge_backend = backend;
        self
    }

    /// Write the report here instead of the report directory.
    pub fn with_output_path(mut self, path: Option<PathBuf>) -> Self {
        self.output_path = path;
        self
    }

    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn with_variables(mut self, variables: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in variables {
            self.variables.insert(name, value);
        }
        self
    }

    pub fn with_variable_resolver(mut self, resolver: VariableResolver) -> Self {
        self.variables.set_resolver(resolver);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub async fn run(self) -> Result<RunOutcome, ExecutionError> {
        let Self {
            config_path,
            output_path,
            report_dir,
            mut variables,
            registry,
            candidate_backend,
            judge_backend,
            cancel,
        } = self;
        let mut tracker = StageTracker {
            stage: RunStage::Created,
            cancel,
        };
        info!(config = %config_path.display(), "Starting evaluation");

        let (config, mode) = tracker
            .advance(RunStage::ConfigLoaded, async {
                let config = load_evaluation_config(&config_path, &mut variables)?;
                let mode = registry.get(config.mode())?;
                Ok::<_, JudgeKitError>((config, mode))
            })
            .await?;

        let generator = ResponseGenerator::new(config.candidates(), candidate_backend);
        let responses = tracker
            .advance(
                RunStage::ResponsesGenerated,
                generator.generate_responses(
                    &config.prompt().system_text,
                    &config.prompt().user_text,
                ),
            )
            .await?;

        let judge = Arc::new(JudgeModel::new(config.judge().clone(), judge_backend));
        let results = tracker
            .advance(RunStage::Evaluated, mode.run(&config, &responses, judge))
            .await?;

        let now = Local::now();
        let report = tracker
            .advance(RunStage::Formatted, async {
                Ok::<_, JudgeKitError>(format_report(&config_path, &config, &results, now))
            })
            .await?;

        let output_path =
            output_path.unwrap_or_else(|| default_output_path(&report_dir, &config_path, &now));
        let persisted = tracker
            .advance(RunStage::Persisted, write_report(&report, &output_path))
            .await;
        if let Err(err) = persisted {
            return Err(err.with_report(report));
        }

        info!(
            traces = results.len(),
            output = %output_path.display(),
            "Evaluation completed successfully"
        );
        Ok(RunOutcome {
            config_path,
            config,
            responses,
            results,
            report,
            output_path,
        })
    }
}
