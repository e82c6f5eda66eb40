//! HTTP advisor backends.
//!
//! Each advisor's persona goes out as the system prompt and the assembled
//! debate context as the single user message. Responses are flattened to
//! plain text before they reach the engine.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use prd_coordination::{AdvisorBackend, AdvisorError, AdvisorId};
use serde_json::{json, Value};

use crate::config::{CouncilConfig, Provider};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sampling settings shared by both wire formats.
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&CouncilConfig> for Sampling {
    fn from(config: &CouncilConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// OpenAI-compatible `/v1/chat/completions` backend.
pub struct ChatCompletionsBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    sampling: Sampling,
    timeout: Duration,
}

impl ChatCompletionsBackend {
    pub fn new(config: &CouncilConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(config.timeout()).build()?,
            endpoint: format!("{}/v1/chat/completions", config.base_url()),
            model: config.model().to_string(),
            api_key: config.api_key.clone(),
            sampling: Sampling::from(config),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl AdvisorBackend for ChatCompletionsBackend {
    async fn complete(&self, advisor: AdvisorId, prompt: &str) -> Result<String, AdvisorError> {
        let body = chat_request_body(&self.model, &advisor.persona(), prompt, self.sampling);
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let value = send(request, self.timeout, "chat completions").await?;
        parse_chat_response(&value)
    }

    fn describe(&self) -> String {
        format!("openai:{} @ {}", self.model, self.endpoint)
    }
}

/// Anthropic `/v1/messages` backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    sampling: Sampling,
    timeout: Duration,
}

impl AnthropicBackend {
    pub fn new(config: &CouncilConfig, api_key: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(config.timeout()).build()?,
            endpoint: format!("{}/v1/messages", config.base_url()),
            model: config.model().to_string(),
            api_key,
            sampling: Sampling::from(config),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl AdvisorBackend for AnthropicBackend {
    async fn complete(&self, advisor: AdvisorId, prompt: &str) -> Result<String, AdvisorError> {
        let body = messages_request_body(&self.model, &advisor.persona(), prompt, self.sampling);
        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let value = send(request, self.timeout, "messages").await?;
        parse_messages_response(&value)
    }

    fn describe(&self) -> String {
        format!("anthropic:{} @ {}", self.model, self.endpoint)
    }
}

/// Build the configured backend.
pub fn build_backend(config: &CouncilConfig) -> Result<Arc<dyn AdvisorBackend>> {
    let backend: Arc<dyn AdvisorBackend> = match config.provider {
        Provider::Openai => Arc::new(
            ChatCompletionsBackend::new(config).context("failed to build HTTP client")?,
        ),
        Provider::Anthropic => {
            let Some(key) = config.api_key.clone() else {
                bail!(
                    "anthropic provider needs an API key (PRD_COUNCIL_API_KEY or {})",
                    Provider::Anthropic.key_var()
                );
            };
            Arc::new(AnthropicBackend::new(config, key).context("failed to build HTTP client")?)
        }
    };
    tracing::info!(backend = %backend.describe(), "advisor backend ready");
    Ok(backend)
}

async fn send(
    request: reqwest::RequestBuilder,
    timeout: Duration,
    api: &str,
) -> Result<Value, AdvisorError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            AdvisorError::Timeout(timeout)
        } else {
            AdvisorError::RequestFailed(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = format!("{api} API error ({status}): {body}");
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AdvisorError::Unavailable(message));
        }
        return Err(AdvisorError::RequestFailed(message));
    }

    response.json().await.map_err(|e| {
        if e.is_timeout() {
            AdvisorError::Timeout(timeout)
        } else {
            AdvisorError::ParseError(e.to_string())
        }
    })
}

pub fn chat_request_body(model: &str, system: &str, prompt: &str, sampling: Sampling) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": prompt}
        ],
        "max_tokens": sampling.max_tokens,
        "temperature": sampling.temperature
    })
}

pub fn messages_request_body(model: &str, system: &str, prompt: &str, sampling: Sampling) -> Value {
    json!({
        "model": model,
        "max_tokens": sampling.max_tokens,
        "temperature": sampling.temperature,
        "system": system,
        "messages": [{"role": "user", "content": prompt}]
    })
}

/// First choice's message content. Content may be a plain string or a list
/// of typed parts.
pub fn parse_chat_response(value: &Value) -> Result<String, AdvisorError> {
    let message = value
        .pointer("/choices/0/message")
        .ok_or_else(|| AdvisorError::ParseError("response has no choices".into()))?;
    let text = flatten_content(&message["content"]);
    if text.trim().is_empty() {
        return Err(AdvisorError::ParseError("empty message content".into()));
    }
    Ok(text)
}

/// Concatenated text blocks of a messages response.
pub fn parse_messages_response(value: &Value) -> Result<String, AdvisorError> {
    if value["type"] == "error" {
        let message = value["error"]["message"].as_str().unwrap_or("unknown error");
        return Err(AdvisorError::RequestFailed(message.to_string()));
    }
    let text = flatten_content(&value["content"]);
    if text.trim().is_empty() {
        return Err(AdvisorError::ParseError("no text blocks in response".into()));
    }
    Ok(text)
}

fn flatten_content(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                Value::Object(_) if part["type"] == "text" || part.get("type").is_none() => {
                    part["text"].as_str()
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}
