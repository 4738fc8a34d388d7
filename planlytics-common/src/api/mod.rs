//! HTTP API types shared by the client and the gateway
//!
//! This module contains ONLY serde types and pure helpers; each crate wraps
//! them with its own framework code (reqwest on the client, axum on the
//! gateway).

pub mod types;

pub use types::{
    AnalyzeRequest, AnalyzeResponse, ChatRequest, ChatResponse, ErrorResponse, RowCount,
    UploadResponse,
};

/// Upload endpoint path
pub const UPLOAD_PATH: &str = "/api/upload";
/// Analyze endpoint path
pub const ANALYZE_PATH: &str = "/api/analyze";
/// Agent chat endpoint path
pub const AGENT_PATH: &str = "/api/agent";
/// Home page chat endpoint path
pub const HOMECHAT_PATH: &str = "/api/homechat";
/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "file";
