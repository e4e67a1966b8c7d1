use std::env;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub const DEFAULT_HOST: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "hf.co/bartowski/Qwen2.5-1.5B-Instruct-GGUF";
pub const DEFAULT_TEMPERATURE: f32 = 0.6;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model endpoint {host} is unreachable: {reason}")]
    Unavailable { host: String, reason: String },
    #[error("model endpoint {host} did not answer within {timeout:?}")]
    Timeout { host: String, timeout: Duration },
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response could not be used: {0}")]
    InvalidResponse(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ModelError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } | Self::Client(_) => "ModelUnavailableError",
            Self::Timeout { .. } => "ModelTimeoutError",
            Self::Status { .. } => "ModelStatusError",
            Self::InvalidResponse(_) => "ModelResponseError",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub host: String,
    pub model: String,
    pub temperature: f32,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl ModelConfig {
    /// Reads `OLLAMA_HOST` and `OLLAMA_MODEL`, keeping defaults for the rest.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = env::var("OLLAMA_HOST")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.host);
        let model = env::var("OLLAMA_MODEL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.model);

        Self {
            host,
            model,
            ..defaults
        }
    }

    /// Host with a scheme and without a trailing slash.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        }
    }
}

/// Result of probing the model endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityReport {
    pub host: String,
    pub status: u16,
    pub models: Vec<String>,
    pub configured_model: String,
}

impl ConnectivityReport {
    pub fn has_configured_model(&self) -> bool {
        let tagged = format!("{}:", self.configured_model);
        self.models
            .iter()
            .any(|name| *name == self.configured_model || name.starts_with(&tagged))
    }
}

pub trait ModelClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
    async fn check_connectivity(&self, timeout: Duration) -> Result<ConnectivityReport, ModelError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

/// Ollama chat endpoint client. One request per call, no retries.
#[derive(Clone)]
pub struct OllamaClient {
    config: ModelConfig,
    base_url: String,
    http: Client,
}

impl OllamaClient {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ModelError::Client(err.to_string()))?;

        Ok(Self {
            base_url: config.base_url(),
            config,
            http,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn transport_error(&self, err: reqwest::Error, timeout: Duration) -> ModelError {
        // connect-phase timeouts report as both; the endpoint never answered
        if err.is_connect() {
            let reason = if err.is_timeout() {
                format!("{err} (connect timeout {:?})", self.config.connect_timeout)
            } else {
                err.to_string()
            };
            ModelError::Unavailable {
                host: self.base_url.clone(),
                reason,
            }
        } else if err.is_timeout() {
            ModelError::Timeout {
                host: self.base_url.clone(),
                timeout,
            }
        } else if err.is_decode() {
            ModelError::InvalidResponse(err.to_string())
        } else {
            ModelError::Unavailable {
                host: self.base_url.clone(),
                reason: err.to_string(),
            }
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Status {
        status: status.as_u16(),
        body: body.trim().chars().take(300).collect(),
    })
}

impl ModelClient for OllamaClient {
    #[instrument(skip_all, fields(model = %self.config.model, prompt_chars = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let payload = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };

        let timeout = self.config.request_timeout;
        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|err| self.transport_error(err, timeout))?;
        let response = ensure_success(response).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| self.transport_error(err, timeout))?;
        let content = body
            .message
            .map(|message| message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ModelError::InvalidResponse("reply has no message content".to_string()))?;

        debug!(reply_chars = content.len(), "model replied");
        Ok(content)
    }

    #[instrument(skip(self), fields(host = %self.base_url))]
    async fn check_connectivity(&self, timeout: Duration) -> Result<ConnectivityReport, ModelError> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| self.transport_error(err, timeout))?;

        let status = response.status();
        let response = ensure_success(response).await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidResponse(err.to_string()))?;

        let report = ConnectivityReport {
            host: self.base_url.clone(),
            status: status.as_u16(),
            models: tags.models.into_iter().map(|tag| tag.name).collect(),
            configured_model: self.config.model.clone(),
        };
        if status == StatusCode::OK && !report.has_configured_model() {
            warn!(model = %self.config.model, "configured model is not pulled on this host");
        }

        Ok(report)
    }
}
