//! Scripted in-memory backend for tests and dry runs.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{GenerationBackend, ResponseOutput, ResponseRequest};
use crate::error::LlmError;

type Scripted = Result<String, LlmError>;

/// A backend that replays scripted outputs.
///
/// Lookup order for each call: the queue for the request's model, then the
/// shared queue, then the fallback text. With none of those it fails.
/// Every request is recorded for later inspection.
#[derive(Default)]
pub struct MockBackend {
    by_model: Mutex<HashMap<String, VecDeque<Scripted>>>,
    shared: Mutex<VecDeque<Scripted>>,
    fallback: Option<String>,
    delay: Duration,
    requests: Mutex<Vec<ResponseRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that answers every call with the same text.
    pub fn with_response(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a text output for the next call that has no model-specific script.
    pub fn queue_text(&self, text: impl Into<String>) {
        lock(&self.shared).push_back(Ok(text.into()));
    }

    /// Queue a failure for the next call that has no model-specific script.
    pub fn queue_error(&self, error: LlmError) {
        lock(&self.shared).push_back(Err(error));
    }

    /// Queue a text output for the next call to `model_id`.
    pub fn queue_for_model(&self, model_id: &str, text: impl Into<String>) {
        lock(&self.by_model)
            .entry(model_id.to_string())
            .or_default()
            .push_back(Ok(text.into()));
    }

    /// Queue a failure for the next call to `model_id`.
    pub fn queue_error_for_model(&self, model_id: &str, error: LlmError) {
        lock(&self.by_model)
            .entry(model_id.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Queue a judge verdict serialized as the backend would return it.
    pub fn queue_verdict(&self, scores: &[f64], reasons: &[&str]) {
        let body = serde_json::json!({ "scores": scores, "reasons": reasons });
        self.queue_text(body.to_string());
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<ResponseRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_output(&self, model_id: &str) -> Scripted {
        if let Some(scripted) = lock(&self.by_model)
            .get_mut(model_id)
            .and_then(VecDeque::pop_front)
        {
            return scripted;
        }
        if let Some(scripted) = lock(&self.shared).pop_front() {
            return scripted;
        }
        self.fallback.clone().ok_or_else(|| LlmError::ApiRequest {
            message: format!("mock backend has no scripted response for '{}'", model_id),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn respond(&self, request: ResponseRequest) -> Result<ResponseOutput, LlmError> {
        let model_id = request.model_id.clone();
        lock(&self.requests).push(request);

        let start = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let output_text = self.next_output(&model_id)?;
        Ok(ResponseOutput {
            output_text,
            elapsed: start.elapsed(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
