use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::quiz::{Question, QuestionError, RawQuestion};

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(?:json)?\s*").expect("valid regex"));
static FENCE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*```$").expect("valid regex"));

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("expected a JSON array, got {0}")]
    NotAnArray(&'static str),
    #[error("expected {expected} questions, got {actual}")]
    WrongCount { expected: usize, actual: usize },
    #[error("question validation failed:\n{}", format_item_errors(.0))]
    Items(Vec<(usize, String)>),
}

fn format_item_errors(errors: &[(usize, String)]) -> String {
    errors
        .iter()
        .map(|(i, e)| format!("Question {i}: {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove the ```json fences models add despite being told not to.
pub fn strip_markdown_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let start = FENCE_OPEN.find(trimmed).map_or(0, |m| m.end());
    let body = &trimmed[start..];
    let end = FENCE_CLOSE.find(body).map_or(body.len(), |m| m.start());
    body[..end].trim()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Parse raw model text into exactly `expected` validated questions.
/// Every malformed item is reported, not only the first.
pub fn validate_quiz_output(raw: &str, expected: usize) -> Result<Vec<Question>, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(strip_markdown_fences(raw))?;
    let serde_json::Value::Array(items) = value else {
        return Err(ValidationError::NotAnArray(json_kind(&value)));
    };
    if items.len() != expected {
        return Err(ValidationError::WrongCount {
            expected,
            actual: items.len(),
        });
    }

    let mut questions = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        let parsed = serde_json::from_value::<RawQuestion>(item)
            .map_err(|e| e.to_string())
            .and_then(|raw| Question::try_from(raw).map_err(|e: QuestionError| e.to_string()));
        match parsed {
            Ok(q) => questions.push(q),
            Err(e) => errors.push((i, e)),
        }
    }

    if errors.is_empty() {
        Ok(questions)
    } else {
        Err(ValidationError::Items(errors))
    }
}
