//! Gateway response parsing that tolerates non-JSON bodies
//!
//! Bodies are read as text first and only then parsed. A body that is not
//! the expected JSON is kept as [`RawText`] and surfaced verbatim, so proxy
//! error pages and similar diagnostics reach the user intact.

use crate::error::{Failure, FailureKind};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Status and body text of one HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body text that did not parse as the expected structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText(pub String);

/// Parse `text` as `T`, keeping the original text on failure
pub fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, RawText> {
    serde_json::from_str(text).map_err(|_| RawText(text.to_string()))
}

/// Pull a human-readable message out of a JSON error body
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` and
/// `{"detail": "..."}`.
pub fn extract_error_message(body: &Value) -> Option<String> {
    let candidate = match body.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
    .or_else(|| match body.get("detail") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other @ (Value::Array(_) | Value::Object(_))) => Some(other.to_string()),
        _ => None,
    });

    candidate.filter(|s| !s.trim().is_empty())
}

/// Message for a non-2xx response
pub fn error_message(status: u16, body: &str) -> String {
    match parse_body::<Value>(body) {
        Ok(value) => extract_error_message(&value).unwrap_or_else(|| raw_or_status(status, body)),
        Err(RawText(text)) => raw_or_status(status, &text),
    }
}

fn raw_or_status(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.to_string()
    }
}

/// Classify a response as success `T` or a [`Failure`]
///
/// Non-2xx → `GatewayError`; 2xx with an unparsable body →
/// `MalformedResponse` carrying the raw text.
pub fn interpret<T: DeserializeOwned>(response: &RawResponse) -> Result<T, Failure> {
    if !response.is_success() {
        return Err(Failure::new(
            FailureKind::GatewayError,
            error_message(response.status, &response.body),
        ));
    }

    parse_body::<T>(&response.body).map_err(|RawText(text)| {
        Failure::new(
            FailureKind::MalformedResponse,
            raw_or_status(response.status, &text),
        )
    })
}
