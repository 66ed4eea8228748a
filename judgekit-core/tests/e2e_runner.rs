//! End-to-end runs from YAML files on disk through to a saved report.

use judgekit_core::{
    ConfigError, EvaluationRunner, JudgeKitError, LlmError, MockBackend, ModeKind, ModeRegistry,
    RunStage, TraceRole, load_report,
};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn write_prompt(dir: &Path) {
    write(
        dir,
        "prompt.yaml",
        "prompt_id: lisbon_trip\nsystem_prompt: You are a travel planner.\nuser_prompt: Plan {{ days }} days in {{ city }}.\n",
    );
}

fn reference_free_config(dir: &Path) -> PathBuf {
    write_prompt(dir);
    write(
        dir,
        "trip_eval.yaml",
        r#"
mode: reference_free
candidates:
  - model: gpt-4o
  - model: gpt-4o-mini
judge:
  model: o3
criteria:
  - type: rubric
    name: pace
    question: Is the itinerary realistically paced?
    weight: 2.0
  - type: rubric
    name: coverage
    question: Does it cover the main sights?
    weight: 1.0
prompt_file: prompt.yaml
metadata:
  owner: travel-team
"#,
    )
}

fn ground_truth_config(dir: &Path) -> PathBuf {
    write_prompt(dir);
    write(
        dir,
        "expected.yaml",
        r#"
expected_responses:
  - quality: good
    response: Day 1 Alfama, Day 2 Belem, Day 3 Sintra.
  - quality: mediocre
    response: Day 1 everything, Day 2 rest.
  - quality: bad
    response: Stay at the hotel.
"#,
    );
    write(
        dir,
        "gt_eval.yaml",
        r#"
mode: ground_truth
candidates:
  - model: gpt-4o
  - model: gpt-4o-mini
judge:
  model: o3
criteria:
  - type: rubric
    name: similarity
    question: How close is each candidate to the reference plan?
    weight: 1.0
prompt_file: prompt.yaml
expected_response_file: expected.yaml
"#,
    )
}

fn two_candidate_backend() -> Arc<MockBackend> {
    let backend = Arc::new(MockBackend::with_response(
        r#"{"scores":[8.0,5.0],"reasons":["well paced","too packed"]}"#,
    ));
    backend.queue_for_model("gpt-4o", "Day 1: Alfama. Day 2: Belem. Day 3: Sintra.");
    backend.queue_for_model("gpt-4o-mini", "Day 1: all of Lisbon.");
    backend
}

fn variables() -> Vec<(String, String)> {
    vec![
        ("days".to_string(), "3".to_string()),
        ("city".to_string(), "Lisbon".to_string()),
    ]
}

#[tokio::test]
async fn test_reference_free_run_round_trips_report() {
    let dir = TempDir::new().unwrap();
    let config = reference_free_config(dir.path());
    let output = dir.path().join("out").join("report.json");
    let backend = two_candidate_backend();

    let outcome = EvaluationRunner::new(&config, backend.clone(), ModeRegistry::standard(2))
        .with_output_path(Some(output.clone()))
        .with_variables(variables())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.responses.len(), 2);
    assert_eq!(outcome.responses[0].user_text, "Plan 3 days in Lisbon.");
    assert_eq!(outcome.results.len(), 2);
    let criteria: Vec<_> = outcome
        .results
        .iter()
        .map(|t| t.criterion_name.as_str())
        .collect();
    assert_eq!(criteria, ["pace", "coverage"]);
    assert!(outcome.results.iter().all(|t| t.role == TraceRole::Judge));

    // 2 candidate calls + 1 judge call per criterion.
    assert_eq!(backend.request_count(), 4);
    let judge_prompt = &backend.requests()[2].input_text;
    assert!(judge_prompt.contains("CANDIDATE 1: Day 1: Alfama"));
    assert!(judge_prompt.contains("CANDIDATE 2: Day 1: all of Lisbon."));
    assert!(judge_prompt.contains("REFERENCE: No reference provided"));

    let loaded = load_report(&output).await.unwrap();
    assert_eq!(loaded, outcome.report);
    assert_eq!(loaded.evaluation_summary.mode, ModeKind::ReferenceFree);
    assert_eq!(loaded.evaluation_summary.prompt_id, "lisbon_trip");
    assert_eq!(loaded.evaluation_summary.total_traces, 2);
    assert_eq!(loaded.evaluation_summary.candidates.len(), 2);
    assert_eq!(loaded.evaluation_results[0].criterion, "pace");
}

#[tokio::test]
async fn test_ground_truth_run_one_trace_per_quality() {
    let dir = TempDir::new().unwrap();
    let config = ground_truth_config(dir.path());
    let backend = two_candidate_backend();

    let outcome = EvaluationRunner::new(&config, backend.clone(), ModeRegistry::standard(1))
        .with_report_dir(dir.path().join("results"))
        .with_variables(variables())
        .run()
        .await
        .unwrap();

    let labels: Vec<_> = outcome
        .results
        .iter()
        .map(|t| t.criterion_name.as_str())
        .collect();
    assert_eq!(labels, ["good", "mediocre", "bad"]);
    assert!(
        outcome
            .results
            .iter()
            .all(|t| t.question == "How close is each candidate to the reference plan?")
    );
    assert_eq!(outcome.results[2].system_text, "Stay at the hotel.");
    assert!(outcome.output_path.exists());
}

#[tokio::test]
async fn test_unknown_mode_fails_while_loading() {
    let dir = TempDir::new().unwrap();
    write_prompt(dir.path());
    let config = write(
        dir.path(),
        "eval.yaml",
        "mode: pairwise\njudge:\n  model: o3\nprompt_file: prompt.yaml\n",
    );
    let backend = Arc::new(MockBackend::new());

    let err = EvaluationRunner::new(&config, backend.clone(), ModeRegistry::standard(1))
        .with_variables(variables())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.stage, RunStage::ConfigLoaded);
    match &err.source {
        JudgeKitError::Config(ConfigError::UnknownMode { name, .. }) => assert_eq!(name, "pairwise"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_candidate_failure_stops_before_judging() {
    let dir = TempDir::new().unwrap();
    let config = reference_free_config(dir.path());
    let backend = Arc::new(MockBackend::new());
    backend.queue_for_model("gpt-4o", "fine");
    backend.queue_error_for_model(
        "gpt-4o-mini",
        LlmError::ApiRequest {
            message: "upstream unavailable".into(),
        },
    );

    let err = EvaluationRunner::new(&config, backend.clone(), ModeRegistry::standard(1))
        .with_report_dir(dir.path().join("results"))
        .with_variables(variables())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.stage, RunStage::ResponsesGenerated);
    assert!(err.report.is_none());
    assert!(!dir.path().join("results").exists());
}

#[tokio::test]
async fn test_malformed_verdict_fails_evaluation() {
    let dir = TempDir::new().unwrap();
    let config = reference_free_config(dir.path());
    let backend = Arc::new(MockBackend::with_response("I would give it a 7."));

    let err = EvaluationRunner::new(&config, backend, ModeRegistry::standard(1))
        .with_report_dir(dir.path().join("results"))
        .with_variables(variables())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.stage, RunStage::Evaluated);
    assert!(err.to_string().contains("evaluating responses"));
}
