//! Text-generation clients.
//!
//! Each provider only knows how to submit a prompt and hand back the raw JSON
//! payload; turning that payload into trusted text (or an error) is shared by
//! [`TextGenerator::generate`] through the response normalizer.
use crate::config::{AnthropicConfig, OpenAiConfig};
use crate::http::{self, HttpError};
use crate::normalize::{
    echoed_token_limit, extract_text, has_choices, incomplete_reason, is_truncated,
};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Hard cap on `max_output_tokens` for web-search responses.
pub const RESPONSES_MAX_TOKENS: u64 = 10_000;

const OPENAI_TIMEOUT: Duration = Duration::from_secs(600);
const ANTHROPIC_TIMEOUT: Duration = Duration::from_secs(60);
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("prompt must be a non-empty string")]
    EmptyPrompt,
    #[error("{provider} API request failed")]
    Http {
        provider: &'static str,
        #[source]
        source: HttpError,
    },
    #[error("{provider} API response did not contain any text output")]
    NoTextOutput { provider: &'static str },
    #[error(
        "{provider} response was truncated at the {limit}-token output limit ({detail}); \
         increase max tokens or shorten the prompt"
    )]
    Truncated {
        provider: &'static str,
        limit: u64,
        detail: String,
    },
}

/// A generation service reachable with a single prompt.
pub trait TextGenerator {
    /// Provider label used in logs and errors.
    fn provider(&self) -> &'static str;

    /// Output-token limit sent with each request.
    fn token_limit(&self) -> u64;

    /// Send the prompt and return the raw response payload.
    fn submit(&self, prompt: &str) -> Result<Value, GenerationError>;

    /// Submit the prompt and return its text, rejecting empty or truncated output.
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        let start = Instant::now();
        let payload = self.submit(prompt)?;
        tracing::info!(
            provider = self.provider(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            "generation call complete"
        );
        text_from_payload(self.provider(), &payload, self.token_limit())
    }
}

/// Extract trusted text from a payload.
///
/// Partial text is never returned. An empty completion or message reply is
/// "no text output" even when cut off; an empty tool response that hit its
/// output cap is reported as truncated.
pub fn text_from_payload(
    provider: &'static str,
    payload: &Value,
    requested_limit: u64,
) -> Result<String, GenerationError> {
    let text = extract_text(payload);
    let tool_shape = !has_choices(payload) && payload.get("stop_reason").is_none();
    if text.is_empty() && !tool_shape {
        return Err(GenerationError::NoTextOutput { provider });
    }
    if is_truncated(payload) {
        return Err(truncation_error(provider, payload, requested_limit));
    }
    if text.is_empty() {
        return Err(GenerationError::NoTextOutput { provider });
    }
    Ok(text)
}

fn truncation_error(provider: &'static str, payload: &Value, requested_limit: u64) -> GenerationError {
    if has_choices(payload) {
        return GenerationError::Truncated {
            provider,
            limit: requested_limit,
            detail: "finish_reason=length".to_string(),
        };
    }
    if payload.get("stop_reason").is_some() {
        return GenerationError::Truncated {
            provider,
            limit: requested_limit,
            detail: "stop_reason=max_tokens".to_string(),
        };
    }
    let limit = echoed_token_limit(payload).unwrap_or(requested_limit);
    let detail = match incomplete_reason(payload) {
        Some(reason) => format!("max_output_tokens={limit}, reason={reason}"),
        None => format!("max_output_tokens={limit}"),
    };
    GenerationError::Truncated {
        provider,
        limit,
        detail,
    }
}

/// Which OpenAI endpoint a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiMode {
    /// Chat Completions without tools.
    Completion,
    /// Responses API with the `web_search` tool enabled.
    WebSearch,
}

pub struct OpenAiClient {
    agent: ureq::Agent,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u64,
    temperature: Option<f64>,
    mode: OpenAiMode,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig, api_key: String, mode: OpenAiMode) -> Self {
        Self {
            agent: http::agent(OPENAI_TIMEOUT),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            mode,
        }
    }

    fn request(&self, prompt: &str) -> (String, Value) {
        match self.mode {
            OpenAiMode::Completion => (
                format!("{}/chat/completions", self.api_base),
                json!({
                    "model": self.model,
                    "messages": [{"role": "user", "content": prompt}],
                    "max_completion_tokens": self.max_tokens,
                }),
            ),
            OpenAiMode::WebSearch => (
                format!("{}/responses", self.api_base),
                json!({
                    "model": self.model,
                    "input": prompt,
                    "tools": [{"type": "web_search"}],
                    "max_output_tokens": self.token_limit(),
                }),
            ),
        }
    }

    fn post(&self, url: &str, payload: &Value) -> Result<Value, HttpError> {
        let response = self
            .agent
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send_json(payload)?;
        http::read_json(response)
    }
}

impl TextGenerator for OpenAiClient {
    fn provider(&self) -> &'static str {
        "OpenAI"
    }

    fn token_limit(&self) -> u64 {
        match self.mode {
            OpenAiMode::Completion => self.max_tokens,
            OpenAiMode::WebSearch => self.max_tokens.clamp(1, RESPONSES_MAX_TOKENS),
        }
    }

    fn submit(&self, prompt: &str) -> Result<Value, GenerationError> {
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        let (url, mut payload) = self.request(prompt);
        if let Some(temperature) = self.temperature {
            payload["temperature"] = json!(temperature);
        }
        match self.post(&url, &payload) {
            Ok(body) => Ok(body),
            Err(err) if self.temperature.is_some() && is_temperature_unsupported(&err) => {
                tracing::warn!(model = %self.model, "temperature unsupported; retrying without it");
                if let Some(fields) = payload.as_object_mut() {
                    fields.remove("temperature");
                }
                self.post(&url, &payload)
                    .map_err(|source| GenerationError::Http {
                        provider: "OpenAI",
                        source,
                    })
            }
            Err(source) => Err(GenerationError::Http {
                provider: "OpenAI",
                source,
            }),
        }
    }
}

/// Whether an API error rejects the `temperature` parameter.
fn is_temperature_unsupported(err: &HttpError) -> bool {
    let HttpError::Status { message, .. } = err else {
        return false;
    };
    if let Some(detail) = err.error_detail() {
        if detail.get("param").and_then(Value::as_str) == Some("temperature") {
            return true;
        }
        if detail.get("code").and_then(Value::as_str) == Some("unsupported_value") {
            return true;
        }
    }
    let lowered = message.to_lowercase();
    lowered.contains("temperature") && lowered.contains("unsupported")
}

pub struct ClaudeClient {
    agent: ureq::Agent,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u64,
}

impl ClaudeClient {
    pub fn new(config: &AnthropicConfig, api_key: String) -> Self {
        Self {
            agent: http::agent(ANTHROPIC_TIMEOUT),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

impl TextGenerator for ClaudeClient {
    fn provider(&self) -> &'static str {
        "Claude"
    }

    fn token_limit(&self) -> u64 {
        self.max_tokens
    }

    fn submit(&self, prompt: &str) -> Result<Value, GenerationError> {
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        let payload = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });
        let send = || -> Result<Value, HttpError> {
            let response = self
                .agent
                .post(format!("{}/messages", self.api_base))
                .header("x-api-key", self.api_key.as_str())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .send_json(&payload)?;
            http::read_json(response)
        };
        send().map_err(|source| GenerationError::Http {
            provider: "Claude",
            source,
        })
    }
}
