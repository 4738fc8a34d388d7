//! planlytics-gateway library interface
//!
//! Upload, analysis and chat endpoints consumed by the PlanLytics client.
//! Exposed as a library so integration tests can drive the router directly.

pub mod api;
pub mod config;
pub mod error;
pub mod exports;
pub mod extract;
pub mod llm;

pub use crate::config::GatewayConfig;
pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, HeaderValue};
use axum::Router;
use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use llm::LlmBackend;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    /// Backend for the agent and home chat endpoints
    pub llm: Arc<dyn LlmBackend>,
    /// One quota shared by both chat endpoints
    pub chat_limiter: Arc<DefaultDirectRateLimiter>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: GatewayConfig, llm: Arc<dyn LlmBackend>) -> Self {
        let quota = Quota::per_minute(config.chat_requests_per_minute);
        Self {
            config: Arc::new(config),
            llm,
            chat_limiter: Arc::new(RateLimiter::direct(quota)),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a failure for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let exports = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .service(ServeDir::new(&state.config.outputs_dir));

    Router::new()
        .merge(api::ui_routes())
        .merge(api::upload_routes())
        .merge(api::analyze_routes())
        .merge(api::chat_routes())
        .merge(api::health_routes())
        .nest_service("/files", exports)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
