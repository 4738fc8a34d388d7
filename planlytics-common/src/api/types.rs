//! Shared API request/response types
//!
//! Field names follow the gateway's JSON surface exactly (`download_url_csv`
//! and friends), so both sides can use these types directly.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

// ========================================
// Upload / Analyze
// ========================================

/// Successful `POST /api/upload` body
///
/// `filename` is the opaque token the client sends back to `/api/analyze`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct UploadResponse {
    /// Stored filename (session token)
    #[serde(default)]
    pub filename: Option<String>,

    /// Stored size in bytes, when the gateway reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// `POST /api/analyze` request body
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub filename: String,
}

/// Successful `POST /api/analyze` body
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AnalyzeResponse {
    /// Echo of the analyzed filename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Extracted row count; anything non-numeric is `Unknown`
    #[serde(default)]
    pub rows: RowCount,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url_csv: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url_xlsx: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url_json: Option<String>,
}

impl AnalyzeResponse {
    /// Export links in display order (CSV, XLSX, JSON), skipping absent or
    /// empty URLs
    pub fn export_urls(&self) -> Vec<(&'static str, &str)> {
        [
            ("csv", self.download_url_csv.as_deref()),
            ("xlsx", self.download_url_xlsx.as_deref()),
            ("json", self.download_url_json.as_deref()),
        ]
        .into_iter()
        .filter_map(|(format, url)| match url {
            Some(url) if !url.trim().is_empty() => Some((format, url)),
            _ => None,
        })
        .collect()
    }
}

/// Number of rows the gateway extracted
///
/// The gateway may answer `"unknown"`, `null`, or omit the field entirely;
/// all of those collapse to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowCount {
    Known(u64),
    #[default]
    Unknown,
}

impl RowCount {
    /// Placeholder shown when the count is unknown
    pub const UNKNOWN_DISPLAY: &'static str = "—";

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_u64().map(RowCount::Known).unwrap_or(RowCount::Unknown),
            _ => RowCount::Unknown,
        }
    }
}

impl fmt::Display for RowCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowCount::Known(n) => write!(f, "{}", n),
            RowCount::Unknown => f.write_str(Self::UNKNOWN_DISPLAY),
        }
    }
}

impl Serialize for RowCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowCount::Known(n) => serializer.serialize_u64(*n),
            RowCount::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for RowCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(RowCount::from_value(&value))
    }
}

// ========================================
// Chat
// ========================================

/// `POST /api/agent` and `POST /api/homechat` request body
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,

    /// Optional extra context (e.g. the analyzed filename)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Chat reply produced by the gateway
///
/// The client never relies on this shape; it renders whatever JSON comes
/// back verbatim.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub reply: String,
    pub provider: String,
    pub model: String,
}

// ========================================
// Errors
// ========================================

/// Flat error body returned by the gateway for every non-2xx response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
