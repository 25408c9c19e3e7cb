//! Blocking client for the exam backend. Every call carries the user's bearer
//! token; a missing token fails before any request is made.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::analytics::Performance;
use crate::engine::grading::QuestionResult;
use crate::quiz::{Difficulty, Quiz};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated (set EXAMACE_API_TOKEN)")]
    NotAuthenticated,
    #[error("request to {path} failed: {message}")]
    Request { path: String, message: String },
    /// Non-2xx; `detail` is the backend's own message when it sent one.
    #[error("{detail}")]
    Status { status: u16, detail: String },
    #[error("network support is disabled in this build")]
    NetworkDisabled,
}

impl ApiError {
    /// True when the backend could not be reached at all, as opposed to
    /// answering with an error.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Request { .. } | ApiError::NetworkDisabled)
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub subject: &'a str,
    pub difficulty: Difficulty,
    pub count: usize,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    quiz_id: &'a str,
    answers: &'a [u8],
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SubmitResponse {
    pub quiz_id: String,
    pub score: f64,
    pub total: usize,
    pub correct: usize,
    pub results: Vec<QuestionResult>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub subject: String,
    pub difficulty: String,
    pub score: Option<f64>,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordAttempt<'a> {
    pub subject: &'a str,
    pub difficulty: Difficulty,
    pub score: f64,
    pub total: usize,
    pub correct: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RecordResponse {
    pub status: String,
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub subject: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
    pub time_limit: Option<u32>,
    pub auto_submit: bool,
    pub show_explanations: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Prefer the body's `detail` (string or structured), then the reason phrase.
fn error_detail(status: u16, reason: Option<&str>, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .filter(|d| !d.is_empty());
    detail
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| format!("API error {status}"))
}

/// The calls the quiz flow makes against a backend.
pub trait QuizBackend {
    fn generate_quiz(
        &self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Quiz, ApiError>;

    fn submit_quiz(&self, quiz_id: &str, answers: &[u8]) -> Result<SubmitResponse, ApiError>;

    fn record_attempt(&self, attempt: &RecordAttempt<'_>) -> Result<RecordResponse, ApiError>;
}

pub struct ApiClient {
    base: String,
    token: Option<String>,
    #[cfg(feature = "network")]
    http: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(base: &str, token: Option<String>) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            #[cfg(feature = "network")]
            http: reqwest::blocking::Client::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn history(&self) -> Result<Vec<HistoryItem>, ApiError> {
        self.send::<(), _>("GET", "/quiz/history", None)
    }

    pub fn settings(&self) -> Result<UserSettings, ApiError> {
        self.send::<(), _>("GET", "/settings", None)
    }

    pub fn update_settings(&self, settings: &UserSettings) -> Result<UserSettings, ApiError> {
        self.send("PUT", "/settings", Some(settings))
    }

    pub fn me(&self) -> Result<UserProfile, ApiError> {
        self.send::<(), _>("GET", "/users/me", None)
    }

    pub fn performance(&self) -> Result<Performance, ApiError> {
        self.send::<(), _>("GET", "/analytics/performance", None)
    }

    #[cfg(feature = "network")]
    fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::NotAuthenticated)?;
        let url = format!("{}{path}", self.base);
        let request_err = |e: reqwest::Error| ApiError::Request {
            path: path.to_string(),
            message: e.to_string(),
        };

        let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| {
            ApiError::Request {
                path: path.to_string(),
                message: e.to_string(),
            }
        })?;
        tracing::debug!(%method, %url, "backend request");
        let mut request = self.http.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            let detail = error_detail(status.as_u16(), status.canonical_reason(), &text);
            tracing::warn!(status = status.as_u16(), %path, %detail, "backend returned an error");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        response.json().map_err(request_err)
    }

    #[cfg(not(feature = "network"))]
    fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        _method: &str,
        _path: &str,
        _body: Option<&B>,
    ) -> Result<T, ApiError> {
        if self.token.is_none() {
            return Err(ApiError::NotAuthenticated);
        }
        Err(ApiError::NetworkDisabled)
    }
}

impl QuizBackend for ApiClient {
    fn generate_quiz(
        &self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Quiz, ApiError> {
        let body = GenerateRequest {
            subject,
            difficulty,
            count,
        };
        self.send("POST", "/quiz/generate", Some(&body))
    }

    fn submit_quiz(&self, quiz_id: &str, answers: &[u8]) -> Result<SubmitResponse, ApiError> {
        self.send(
            "POST",
            "/quiz/submit",
            Some(&SubmitRequest { quiz_id, answers }),
        )
    }

    fn record_attempt(&self, attempt: &RecordAttempt<'_>) -> Result<RecordResponse, ApiError> {
        self.send("POST", "/quiz/record", Some(attempt))
    }
}
