//! Candidate response generation.
//!
//! Fans one generation call out per candidate, concurrently, and joins on all
//! of them. The first failure aborts the whole step.

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::error::LlmError;
use crate::models::CandidateModel;
use crate::providers::GenerationBackend;
use crate::trace::GenerationTrace;
use crate::types::CandidateSpec;

/// Generates candidate responses against a shared backend.
pub struct ResponseGenerator {
    candidates: Vec<CandidateModel>,
}

impl ResponseGenerator {
    pub fn new(candidates: &[CandidateSpec], backend: Arc<dyn GenerationBackend>) -> Self {
        let candidates = candidates
            .iter()
            .map(|spec| CandidateModel::new(spec.clone(), Arc::clone(&backend)))
            .collect();
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Generate one trace per candidate, in candidate order.
    pub async fn generate_responses(
        &self,
        system_text: &str,
        user_text: &str,
    ) -> Result<Vec<GenerationTrace>, LlmError> {
        info!(
            candidates = self.candidates.len(),
            "Generating candidate responses"
        );
        let start = Instant::now();

        let calls = self
            .candidates
            .iter()
            .map(|candidate| candidate.generate(system_text, user_text));
        let traces = try_join_all(calls).await?;

        info!(
            responses = traces.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated candidate responses"
        );
        Ok(traces)
    }
}

/// Generate a single response from one model configuration.
pub async fn generate_response(
    spec: &CandidateSpec,
    backend: Arc<dyn GenerationBackend>,
    system_text: &str,
    user_text: &str,
) -> Result<GenerationTrace, LlmError> {
    CandidateModel::new(spec.clone(), backend)
        .generate(system_text, user_text)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockBackend;
    use crate::types::ModelSpec;
    use std::time::Duration;

    fn specs(models: &[&str]) -> Vec<CandidateSpec> {
        models.iter().map(|m| ModelSpec::new(*m)).collect()
    }

    #[tokio::test]
    async fn test_one_trace_per_candidate_in_order() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_for_model("gpt-4o", "answer A");
        backend.queue_for_model("gpt-4o-mini", "answer B");
        backend.queue_for_model("o3-mini", "answer C");

        let generator =
            ResponseGenerator::new(&specs(&["gpt-4o", "gpt-4o-mini", "o3-mini"]), backend);
        let traces = generator.generate_responses("sys", "user").await.unwrap();

        let pairs: Vec<_> = traces
            .iter()
            .map(|t| (t.model_id.as_str(), t.response.as_text().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("gpt-4o", "answer A"),
                ("gpt-4o-mini", "answer B"),
                ("o3-mini", "answer C")
            ]
        );
    }

    #[tokio::test]
    async fn test_calls_run_concurrently() {
        let backend = Arc::new(MockBackend::with_response("ok").with_delay(Duration::from_millis(200)));
        let generator = ResponseGenerator::new(&specs(&["a", "b", "c", "d"]), backend);

        let start = Instant::now();
        let traces = generator.generate_responses("sys", "user").await.unwrap();
        assert_eq!(traces.len(), 4);
        // Sequential execution would take at least 800ms.
        assert!(start.elapsed() < Duration::from_millis(700));
        for trace in &traces {
            assert!(trace.latency_seconds.unwrap() >= 0.2);
        }
    }

    #[tokio::test]
    async fn test_single_failure_fails_the_step() {
        let backend = Arc::new(MockBackend::with_response("ok"));
        backend.queue_error_for_model(
            "b",
            LlmError::AuthFailed {
                provider: "mock".into(),
            },
        );
        let generator = ResponseGenerator::new(&specs(&["a", "b", "c"]), backend);

        let err = generator.generate_responses("sys", "user").await.unwrap_err();
        assert!(matches!(err, LlmError::AuthFailed { .. }));
    }

    #[tokio::test]
    async fn test_repeated_generation_has_stable_shape() {
        let backend = Arc::new(MockBackend::with_response("varies"));
        let generator = ResponseGenerator::new(&specs(&["a", "b"]), backend);

        let first = generator.generate_responses("sys", "user").await.unwrap();
        let second = generator.generate_responses("sys", "user").await.unwrap();
        assert_eq!(first.len(), second.len());
    }

    #[tokio::test]
    async fn test_no_candidates_yields_no_traces() {
        let generator = ResponseGenerator::new(&[], Arc::new(MockBackend::new()));
        assert!(generator.is_empty());
        let traces = generator.generate_responses("sys", "user").await.unwrap();
        assert!(traces.is_empty());
    }

    #[tokio::test]
    async fn test_generate_single_response() {
        let backend = Arc::new(MockBackend::with_response("solo"));
        let trace = generate_response(&ModelSpec::new("gpt-4o"), backend, "s", "u")
            .await
            .unwrap();
        assert_eq!(trace.response.as_text(), Some("solo"));
    }
}
