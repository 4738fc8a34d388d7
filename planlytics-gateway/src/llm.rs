//! LLM backends for the agent and home chat endpoints
//!
//! Handlers talk to [`LlmBackend`]; [`HttpLlmBackend`] is the production
//! implementation and speaks the three supported wire formats directly.

use async_trait::async_trait;
use planlytics_common::config::{resolve_llm_api_key, TomlConfig};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// LLM backend errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM backend unavailable: {0}")]
    Network(String),

    #[error("LLM backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM response missing reply text")]
    EmptyReply,

    #[error("No API key configured for {0}")]
    MissingApiKey(LlmProvider),

    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::Ollama => "http://127.0.0.1:11434",
            LlmProvider::OpenAi => "https://api.openai.com",
            LlmProvider::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Ollama => "llama3",
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Anthropic => "claude-3-5-sonnet-latest",
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            LlmProvider::Ollama => "/api/generate",
            LlmProvider::OpenAi => "/v1/chat/completions",
            LlmProvider::Anthropic => "/v1/messages",
        }
    }

    fn requires_api_key(self) -> bool {
        !matches!(self, LlmProvider::Ollama)
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
        };
        f.write_str(name)
    }
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" => Ok(LlmProvider::OpenAi),
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

/// Text generation seam used by the chat handlers
#[async_trait]
pub trait LlmBackend: Send + Sync {
    fn provider(&self) -> LlmProvider;
    fn model(&self) -> &str;
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

pub struct HttpLlmBackend {
    client: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpLlmBackend {
    pub fn new(
        provider: LlmProvider,
        base_url: Option<String>,
        model: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url = base_url
            .unwrap_or_else(|| provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            provider,
            base_url,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            api_key,
        })
    }

    /// Build from the `[llm]` table; the API key env var overrides the file
    pub fn from_config(toml: &TomlConfig) -> Result<Self, LlmError> {
        let provider = toml.llm.provider.parse()?;
        Self::new(
            provider,
            toml.llm.base_url.clone(),
            toml.llm.model.clone(),
            resolve_llm_api_key(toml),
        )
    }
}

#[async_trait]
impl LlmBackend for HttpLlmBackend {
    fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}{}", self.base_url, self.provider.endpoint());
        let body = request_body(self.provider, &self.model, system, prompt);

        let mut request = self.client.post(&url).json(&body);
        match (self.provider, self.api_key.as_deref()) {
            (LlmProvider::Ollama, _) => {}
            (LlmProvider::OpenAi, Some(key)) => request = request.bearer_auth(key),
            (LlmProvider::Anthropic, Some(key)) => {
                request = request
                    .header("x-api-key", key)
                    .header("anthropic-version", ANTHROPIC_VERSION);
            }
            (provider, None) if provider.requires_api_key() => {
                return Err(LlmError::MissingApiKey(provider));
            }
            _ => {}
        }

        tracing::debug!(provider = %self.provider, model = %self.model, "LLM request");

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response.json().await?;
        extract_reply(self.provider, &json)
    }
}

/// Request payload for one provider
pub fn request_body(provider: LlmProvider, model: &str, system: &str, prompt: &str) -> Value {
    match provider {
        LlmProvider::Ollama => json!({
            "model": model,
            "system": system,
            "prompt": prompt,
            "stream": false,
        }),
        LlmProvider::OpenAi => json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
        }),
        LlmProvider::Anthropic => json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "system": system,
            "messages": [
                { "role": "user", "content": prompt },
            ],
        }),
    }
}

/// Pull the reply text out of a provider response
pub fn extract_reply(provider: LlmProvider, json: &Value) -> Result<String, LlmError> {
    let text = match provider {
        LlmProvider::Ollama => json["response"].as_str().map(str::to_string),
        LlmProvider::OpenAi => json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string),
        LlmProvider::Anthropic => json["content"].as_array().map(|blocks| {
            blocks
                .iter()
                .filter(|block| block["type"] == "text")
                .filter_map(|block| block["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        }),
    };

    text.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(LlmError::EmptyReply)
}
