//! Client error types
//!
//! Request failures never escape the controller as `Err`: they become
//! [`RequestError`] state that the UI renders. [`TransportError`] is the
//! only error a [`crate::GatewayTransport`] returns, and it always maps to
//! [`FailureKind::NetworkFailure`].

use crate::chat::ChatEndpoint;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Transport-level failures (no HTTP response was obtained)
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, or body read failure
    #[error("Network error: {0}")]
    Network(String),

    /// Gateway base URL could not be used
    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),

    /// The selected local file could not be read
    #[error("Failed to read {path}: {source}")]
    LocalFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}

/// How a request failed
///
/// All kinds render identically; only the message text differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No HTTP response at all
    NetworkFailure,
    /// Non-2xx status
    GatewayError,
    /// 2xx status with a body that is not the expected structure
    MalformedResponse,
    /// HTTP 429 from an AI-call endpoint
    RateLimited,
}

/// Which action produced a [`RequestError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Analyze,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Upload => f.write_str("upload"),
            Stage::Analyze => f.write_str("analyze"),
        }
    }
}

/// A failure classified from a response, before a stage is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Failure::new(FailureKind::NetworkFailure, err.to_string())
    }
}

/// Upload or analyze failure shown in the error panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestError {
    pub message: String,
    pub source_stage: Stage,
    pub kind: FailureKind,
}

impl RequestError {
    pub fn new(source_stage: Stage, failure: Failure) -> Self {
        Self {
            message: failure.message,
            source_stage,
            kind: failure.kind,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Chat failure, other than the rate-limit latch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatError {
    pub endpoint: ChatEndpoint,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
