//! OpenAI Responses API backend.
//!
//! Talks to `POST {base_url}/responses`. Works with OpenAI itself, Azure
//! OpenAI deployments and local gateways that mirror the Responses API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Instant;
use tracing::debug;

use super::{GenerationBackend, ResponseOutput, ResponseRequest};
use crate::config::BackendConfig;
use crate::error::LlmError;
use crate::types::SummaryMode;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Responses API backend.
pub struct OpenAiResponsesBackend {
    client: Client,
    provider: String,
    base_url: String,
    api_key: String,
}

impl OpenAiResponsesBackend {
    /// Create a new backend from configuration.
    ///
    /// Uses `config.api_key` if set, otherwise reads the environment variable
    /// named by `config.api_key_env`.
    pub fn new(config: &BackendConfig) -> Result<Self, LlmError> {
        let is_local = config
            .base_url
            .as_ref()
            .map(|u| u.contains("localhost") || u.contains("127.0.0.1"))
            .unwrap_or(false);

        let api_key = match config.resolve_api_key() {
            Ok(key) => key,
            Err(_) if is_local => {
                debug!("No API key set for local gateway; using dummy bearer token");
                "local".to_string()
            }
            Err(e) => {
                return Err(LlmError::AuthFailed {
                    provider: format!("{}: {}", config.provider, e),
                });
            }
        };
        Ok(Self::new_with_key(config, api_key))
    }

    /// Create a backend with an explicitly provided API key.
    pub fn new_with_key(config: &BackendConfig, api_key: String) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            client: Client::new(),
            provider: config.provider.clone(),
            base_url,
            api_key,
        }
    }

    /// Build the JSON request body for a generation request.
    fn request_body(request: &ResponseRequest) -> Value {
        let mut reasoning = json!({ "effort": request.params.effort.as_str() });
        if request.params.summary != SummaryMode::Off {
            reasoning["summary"] = json!(request.params.summary.as_str());
        }

        let mut body = json!({
            "model": request.model_id,
            "instructions": request.instructions,
            "input": request.input_text,
            "temperature": request.params.temperature,
            "top_p": request.params.top_p,
            "reasoning": reasoning,
        });

        if let Some(format) = &request.text_format {
            body["text"] = json!({
                "format": {
                    "type": "json_schema",
                    "name": format.name,
                    "schema": format.schema,
                    "strict": format.strict,
                }
            });
        }
        body
    }

    /// Extract the output text from a Responses API body.
    ///
    /// Prefers a top-level `output_text`; otherwise concatenates the
    /// `output_text` parts of every `message` item in `output`.
    fn parse_output_text(body: &Value) -> Result<String, LlmError> {
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(LlmError::ApiRequest {
                message: message.to_string(),
            });
        }

        if body.get("status").and_then(|s| s.as_str()) == Some("incomplete") {
            let reason = body
                .get("incomplete_details")
                .and_then(|d| d.get("reason"))
                .and_then(|r| r.as_str())
                .unwrap_or("unknown");
            return Err(LlmError::ResponseParse {
                message: format!("Response incomplete: {}", reason),
            });
        }

        if let Some(text) = body.get("output_text").and_then(|t| t.as_str()) {
            return Ok(text.to_string());
        }

        let output = body
            .get("output")
            .and_then(|o| o.as_array())
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No output in response".to_string(),
            })?;

        let mut text = String::new();
        let mut saw_message = false;
        for item in output {
            if item.get("type").and_then(|t| t.as_str()) != Some("message") {
                continue;
            }
            saw_message = true;
            let parts = item
                .get("content")
                .and_then(|c| c.as_array())
                .map(Vec::as_slice)
                .unwrap_or_default();
            for part in parts {
                match part.get("type").and_then(|t| t.as_str()) {
                    Some("output_text") => {
                        if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
                            text.push_str(t);
                        }
                    }
                    Some("refusal") => {
                        let refusal = part
                            .get("refusal")
                            .and_then(|r| r.as_str())
                            .unwrap_or("");
                        return Err(LlmError::ResponseParse {
                            message: format!("Model refused: {}", refusal),
                        });
                    }
                    _ => {}
                }
            }
        }

        if !saw_message {
            return Err(LlmError::ResponseParse {
                message: "No message item in response output".to_string(),
            });
        }
        Ok(text)
    }

    /// Map an HTTP status code to the appropriate LlmError.
    fn map_http_error(provider: &str, status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed ({})", status);
                LlmError::AuthFailed {
                    provider: provider.to_string(),
                }
            }
            429 => {
                // "Rate limit reached ... Please try again in 20s."
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ").last().and_then(|s| {
                            s.trim_end_matches('.')
                                .trim_end_matches('s')
                                .parse::<f64>()
                                .ok()
                        })
                    })
                    .map(|secs| secs.ceil() as u64)
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            status if status >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({}): {}", status, body),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAiResponsesBackend {
    async fn respond(&self, request: ResponseRequest) -> Result<ResponseOutput, LlmError> {
        let url = format!("{}/responses", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            url = %url,
            model = %request.model_id,
            structured = request.text_format.is_some(),
            "Sending Responses API request"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection {
                        message: e.to_string(),
                    }
                } else {
                    LlmError::ApiRequest {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {}", e),
        })?;
        let elapsed = start.elapsed();

        if !status.is_success() {
            return Err(Self::map_http_error(&self.provider, status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {}", e),
            })?;

        Ok(ResponseOutput {
            output_text: Self::parse_output_text(&json)?,
            elapsed,
        })
    }

    fn name(&self) -> &str {
        &self.provider
    }
}
