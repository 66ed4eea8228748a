//! Evaluation reports.
//!
//! A report has two parts: an `evaluation_summary` describing the run and an
//! `evaluation_results` list with one entry per judged trace. Reports are
//! written as pretty-printed JSON and can be read back with [`load_report`].

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ReportError;
use crate::modes::ModeKind;
use crate::trace::{EvalTrace, GenerationTrace, TraceResponse, TraceRole};
use crate::types::{Criterion, CriterionType, EvaluationConfig, LlmParams, ModelSpec, ReasoningEffort};

const PREVIEW_CHARS: usize = 100;

/// Parameters of one model as recorded in the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub effort: ReasoningEffort,
}

impl From<&ModelSpec> for ModelSnapshot {
    fn from(spec: &ModelSpec) -> Self {
        Self {
            model: spec.model_id.clone(),
            temperature: spec.params.temperature,
            top_p: spec.params.top_p,
            effort: spec.params.effort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CriterionType,
    pub weight: f64,
    pub question: String,
}

impl From<&Criterion> for CriterionSnapshot {
    fn from(criterion: &Criterion) -> Self {
        Self {
            name: criterion.name.clone(),
            kind: criterion.kind,
            weight: criterion.weight,
            question: criterion.question.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub config_file: String,
    pub mode: ModeKind,
    pub prompt_id: String,
    pub timestamp: DateTime<Local>,
    pub total_traces: usize,
    pub candidates: Vec<ModelSnapshot>,
    pub judge: ModelSnapshot,
    pub criteria: Vec<CriterionSnapshot>,
}

/// One judged trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub criterion: String,
    pub model: String,
    pub run_type: TraceRole,
    pub latency: Option<f64>,
    pub system_prompt: String,
    pub user_prompt: String,
    pub response: TraceResponse,
    pub params: LlmParams,
    pub metadata: Option<serde_json::Value>,
}

impl From<&EvalTrace> for ResultEntry {
    fn from(trace: &EvalTrace) -> Self {
        Self {
            criterion: trace.criterion_name.clone(),
            model: trace.model_id.clone(),
            run_type: trace.role,
            latency: trace.latency_seconds,
            system_prompt: trace.system_text.clone(),
            user_prompt: trace.user_text.clone(),
            response: trace.response.clone(),
            params: trace.params,
            metadata: trace.metadata.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub evaluation_summary: EvaluationSummary,
    pub evaluation_results: Vec<ResultEntry>,
}

/// Build the report for a finished run.
pub fn format_report(
    config_path: &Path,
    config: &EvaluationConfig,
    results: &[EvalTrace],
    timestamp: DateTime<Local>,
) -> EvaluationReport {
    EvaluationReport {
        evaluation_summary: EvaluationSummary {
            config_file: config_path.display().to_string(),
            mode: config.mode(),
            prompt_id: config.prompt().id.clone(),
            timestamp,
            total_traces: results.len(),
            candidates: config.candidates().iter().map(ModelSnapshot::from).collect(),
            judge: ModelSnapshot::from(config.judge()),
            criteria: config.criteria().iter().map(CriterionSnapshot::from).collect(),
        },
        evaluation_results: results.iter().map(ResultEntry::from).collect(),
    }
}

/// `<report_dir>/<config-stem>_<YYYYmmdd_HHMMSS>.json`
pub fn default_output_path(
    report_dir: &Path,
    config_path: &Path,
    now: &DateTime<Local>,
) -> PathBuf {
    let stem = config_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "evaluation".to_string());
    report_dir.join(format!("{}_{}.json", stem, now.format("%Y%m%d_%H%M%S")))
}

/// Write `report` as pretty JSON, creating parent directories as needed.
pub async fn write_report(report: &EvaluationReport, path: &Path) -> Result<(), ReportError> {
    let write_failed = |message: String| ReportError::WriteFailed {
        path: path.to_path_buf(),
        message,
    };

    let json = serde_json::to_string_pretty(report).map_err(|e| write_failed(e.to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| write_failed(e.to_string()))?;
    }
    tokio::fs::write(path, json)
        .await
        .map_err(|e| write_failed(e.to_string()))?;

    info!(path = %path.display(), traces = report.evaluation_results.len(), "Results saved");
    Ok(())
}

/// Read a report previously written by [`write_report`].
pub async fn load_report(path: &Path) -> Result<EvaluationReport, ReportError> {
    let read_failed = |message: String| ReportError::ReadFailed {
        path: path.to_path_buf(),
        message,
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| read_failed(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| read_failed(e.to_string()))
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Human-readable overview of a run, one block per trace.
pub fn render_console_summary(
    config_path: &Path,
    config: &EvaluationConfig,
    results: &[EvalTrace],
) -> String {
    if results.is_empty() {
        return "No results to display.".to_string();
    }

    let rule = "=".repeat(80);
    let mut out = String::new();
    out.push_str(&format!("{rule}\n"));
    out.push_str("🎯 EVALUATION RESULTS\n");
    out.push_str(&format!("{rule}\n"));

    let config_name = config_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let candidates: Vec<_> = config.candidates().iter().map(|c| c.model_id.as_str()).collect();
    out.push_str(&format!("📋 Config: {config_name}\n"));
    out.push_str(&format!("🔧 Mode: {}\n", config.mode()));
    out.push_str(&format!("💬 Prompt: {}\n", config.prompt().id));
    out.push_str(&format!("🤖 Candidates: {}\n", candidates.join(", ")));
    out.push_str(&format!("⚖️  Judge: {}\n", config.judge().model_id));
    out.push_str(&format!("📊 Criteria: {} evaluation criteria\n", config.criteria().len()));
    out.push_str(&format!("\n📈 Generated {} evaluation traces\n", results.len()));

    for (i, trace) in results.iter().enumerate() {
        out.push_str(&format!("\n📋 Trace {}:\n", i + 1));
        out.push_str(&format!("   Model: {}\n", trace.model_id));
        out.push_str(&format!("   Run Type: {}\n", trace.role.as_str()));
        out.push_str(&format!("   Criterion: {}\n", trace.criterion_name));
        out.push_str(&format!("   Question: {}\n", trace.question));
        if let Some(latency) = trace.latency_seconds {
            out.push_str(&format!("   Latency: {latency:.2}s\n"));
        }
        match &trace.response {
            TraceResponse::Verdict(verdict) => {
                out.push_str(&format!("   Scores: {:?}\n", verdict.scores));
                out.push_str(&format!("   Reasons: {:?}\n", verdict.reasons));
            }
            TraceResponse::Text(text) => {
                out.push_str(&format!("   Response: {}\n", preview(text)));
            }
            TraceResponse::Empty => {}
        }
    }
    out.push_str(&format!("\n{rule}"));
    out
}

/// Trace count and mean latency for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub model: String,
    pub traces: usize,
    /// Mean over traces that recorded a latency.
    pub average_latency: Option<f64>,
}

/// Group traces by model, in order of first appearance.
pub fn summarize_by_model<'a>(
    traces: impl IntoIterator<Item = &'a GenerationTrace>,
) -> Vec<ModelSummary> {
    let mut groups: Vec<(String, usize, Vec<f64>)> = Vec::new();
    for trace in traces {
        let index = match groups.iter().position(|(m, _, _)| *m == trace.model_id) {
            Some(index) => index,
            None => {
                groups.push((trace.model_id.clone(), 0, Vec::new()));
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        group.1 += 1;
        if let Some(latency) = trace.latency_seconds {
            group.2.push(latency);
        }
    }

    groups
        .into_iter()
        .map(|(model, traces, latencies)| ModelSummary {
            model,
            traces,
            average_latency: (!latencies.is_empty())
                .then(|| latencies.iter().sum::<f64>() / latencies.len() as f64),
        })
        .collect()
}

/// Render [`summarize_by_model`] output.
pub fn render_model_summary(summaries: &[ModelSummary]) -> String {
    if summaries.is_empty() {
        return "No results to display.".to_string();
    }
    let rule = "=".repeat(60);
    let total: usize = summaries.iter().map(|s| s.traces).sum();
    let mut out = format!("{rule}\n🎯 EVALUATION SUMMARY\n{rule}\nTotal traces: {total}\n");
    for summary in summaries {
        out.push_str(&format!("\n🤖 Model: {}\n", summary.model));
        out.push_str(&format!("   Traces: {}\n", summary.traces));
        if let Some(avg) = summary.average_latency {
            out.push_str(&format!("   Avg Latency: {avg:.2}s\n"));
        }
    }
    out.push_str(&rule);
    out
}
