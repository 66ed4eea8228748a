use chrono::Local;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use judgekit_core::loader::{extract_variables, render_template};
use judgekit_core::models::parse_verdict;
use judgekit_core::report::format_report;
use judgekit_core::{
    Criterion as RubricCriterion, EvalTrace, EvaluationConfig, GenerationTrace, LlmParams,
    ModeKind, ModelSpec, Prompt, RubricStrategy, StructuredVerdict, TraceResponse, TraceRole,
};
use std::collections::HashMap;
use std::path::Path;

fn bench_templates(c: &mut Criterion) {
    let template = "Plan a {{ days }}-day trip to {{ city }} for {{ travelers }} people. \
                    Budget: {{ budget }}. Start in {{ city }}."
        .repeat(20);
    let values = HashMap::from([
        ("days".to_string(), "3".to_string()),
        ("city".to_string(), "Lisbon".to_string()),
        ("travelers".to_string(), "2".to_string()),
        ("budget".to_string(), "moderate".to_string()),
    ]);

    c.bench_function("extract_variables", |b| {
        b.iter(|| extract_variables(black_box(&template)))
    });

    c.bench_function("render_template", |b| {
        b.iter(|| render_template(black_box(&template), black_box(&values)))
    });
}

fn bench_verdicts(c: &mut Criterion) {
    let small = r#"{"scores":[7.5,4.0],"reasons":["clear plan","rushed"]}"#;
    let scores: Vec<f64> = (0..50).map(|i| (i % 11) as f64).collect();
    let reasons: Vec<String> = (0..50).map(|i| format!("reason number {}", i)).collect();
    let large = serde_json::json!({ "scores": scores, "reasons": reasons }).to_string();

    c.bench_function("parse_verdict_two_candidates", |b| {
        b.iter(|| parse_verdict(black_box(small)))
    });

    c.bench_function("parse_verdict_fifty_candidates", |b| {
        b.iter(|| parse_verdict(black_box(&large)))
    });

    c.bench_function("parse_verdict_malformed", |b| {
        b.iter(|| parse_verdict(black_box("Score: 7/10, looks fine")))
    });
}

fn bench_judge_prompt(c: &mut Criterion) {
    let strategy = RubricStrategy::new("pace", None, "Is the itinerary realistically paced?");
    let candidates: Vec<String> = (0..8)
        .map(|i| format!("Day 1: museum {}. Day 2: market. Day 3: coast.", i).repeat(10))
        .collect();

    c.bench_function("build_judge_prompt_reference_free", |b| {
        b.iter(|| strategy.build_judge_prompt(black_box(&candidates), None))
    });

    c.bench_function("build_judge_prompt_with_reference", |b| {
        b.iter(|| strategy.build_judge_prompt(black_box(&candidates), Some("A relaxed plan.")))
    });
}

fn bench_report(c: &mut Criterion) {
    let config = EvaluationConfig::builder(
        Prompt::new("trip", "You plan trips.", "Plan three days in Lisbon."),
        ModeKind::ReferenceFree,
        ModelSpec::new("o3"),
    )
    .candidates([ModelSpec::new("gpt-4o"), ModelSpec::new("gpt-4o-mini")])
    .criteria((0..10).map(|i| {
        RubricCriterion::rubric(format!("criterion_{}", i), "Is it good?", 1.0)
    }))
    .build()
    .expect("valid config");

    let results: Vec<EvalTrace> = (0..10)
        .map(|i| {
            let generation = GenerationTrace {
                model_id: "o3".to_string(),
                role: TraceRole::Judge,
                system_text: "judge".to_string(),
                user_text: "QUESTION: Is it good?".to_string(),
                response: TraceResponse::Verdict(StructuredVerdict {
                    scores: vec![7.0, 5.0],
                    reasons: vec!["fine".to_string(), "weaker".to_string()],
                }),
                latency_seconds: None,
                params: LlmParams::default(),
                metadata: None,
            };
            EvalTrace::new(generation, format!("criterion_{}", i), "Is it good?")
        })
        .collect();
    let now = Local::now();

    c.bench_function("format_report_ten_traces", |b| {
        b.iter(|| format_report(Path::new("eval.yaml"), &config, black_box(&results), now))
    });

    let report = format_report(Path::new("eval.yaml"), &config, &results, now);
    c.bench_function("serialize_report_ten_traces", |b| {
        b.iter(|| serde_json::to_string_pretty(black_box(&report)))
    });
}

criterion_group!(
    benches,
    bench_templates,
    bench_verdicts,
    bench_judge_prompt,
    bench_report,
);
criterion_main!(benches);
