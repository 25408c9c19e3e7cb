use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "network")]
const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("unknown LLM provider '{0}' (expected openai, mistral or local)")]
    UnknownProvider(String),
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("model {model} returned no choices")]
    EmptyResponse { model: String },
    #[error("network support is disabled in this build")]
    NetworkDisabled,
}

/// Chat-completion backend used to author questions.
pub trait LlmProvider {
    fn generate(&self, system_prompt: &str, user_prompt: &str, temperature: f32)
    -> Result<String, LlmError>;

    /// Hosted providers are assumed reachable.
    fn check_health(&self) -> bool {
        true
    }

    fn model(&self) -> &str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Mistral,
    Local,
}

impl ProviderKind {
    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Mistral => "https://api.mistral.ai/v1",
            ProviderKind::Local => "http://localhost:1234/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Mistral => "mistral-medium-latest",
            ProviderKind::Local => "phi-3-mini-4k-instruct",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Local => "local",
        })
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "mistral" => Ok(ProviderKind::Mistral),
            "local" => Ok(ProviderKind::Local),
            _ => Err(LlmError::UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub health_timeout: Duration,
}

impl ProviderSettings {
    /// Empty `base_url`/`model` fall back to the provider's defaults.
    pub fn new(kind: ProviderKind, base_url: &str, model: &str, api_key: &str) -> Self {
        let pick = |value: &str, default: &str| {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value.trim().to_string()
            }
        };
        Self {
            kind,
            base_url: pick(base_url, kind.default_base_url())
                .trim_end_matches('/')
                .to_string(),
            model: pick(model, kind.default_model()),
            api_key: api_key.to_string(),
            health_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Any OpenAI-compatible `/chat/completions` endpoint: OpenAI, Mistral, or a
/// local server such as LM Studio, Ollama or vLLM.
pub struct ChatCompletionsProvider {
    settings: ProviderSettings,
}

impl ChatCompletionsProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn request_body<'a>(
        &'a self,
        system_prompt: &'a str,
        user_prompt: &'a str,
        temperature: f32,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature,
        }
    }
}

fn first_choice(response: ChatResponse, model: &str) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| LlmError::EmptyResponse {
            model: model.to_string(),
        })
}

#[cfg(feature = "network")]
impl LlmProvider for ChatCompletionsProvider {
    fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let endpoint = format!("{}/chat/completions", self.settings.base_url);
        let request_err = |e: reqwest::Error| LlmError::Request {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(GENERATE_TIMEOUT)
            .build()
            .map_err(request_err)?;

        tracing::debug!(model = %self.settings.model, %endpoint, "requesting chat completion");
        let response = client
            .post(&endpoint)
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(system_prompt, user_prompt, temperature))
            .send()
            .map_err(request_err)?;
        if !response.status().is_success() {
            return Err(LlmError::Status {
                endpoint: endpoint.clone(),
                status: response.status().as_u16(),
            });
        }
        let body: ChatResponse = response.json().map_err(request_err)?;
        first_choice(body, &self.settings.model)
    }

    /// Only self-hosted endpoints are probed, via `GET /models`.
    fn check_health(&self) -> bool {
        if self.settings.kind != ProviderKind::Local {
            return true;
        }
        let url = format!("{}/models", self.settings.base_url);
        let result = reqwest::blocking::Client::builder()
            .timeout(self.settings.health_timeout)
            .build()
            .and_then(|client| client.get(&url).send());
        match result {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::warn!(%url, error = %e, "local LLM health check failed");
                false
            }
        }
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

#[cfg(not(feature = "network"))]
impl LlmProvider for ChatCompletionsProvider {
    fn generate(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String, LlmError> {
        Err(LlmError::NetworkDisabled)
    }

    fn check_health(&self) -> bool {
        false
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}
