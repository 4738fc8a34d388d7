//! POST /api/agent and POST /api/homechat
//!
//! Both endpoints forward to the configured LLM backend with their own system
//! prompt and share one request quota.

use axum::{extract::State, routing::post, Json, Router};
use planlytics_common::api::{ChatRequest, ChatResponse, AGENT_PATH, HOMECHAT_PATH};
use tracing::warn;

use crate::{ApiError, ApiResult, AppState};

const AGENT_PROMPT: &str = "You are the PlanLytics analysis agent. You help users understand \
benefit and pricing plan documents they have uploaded: tiers, limits, exclusions and the \
automation opportunities they imply. Answer concisely and say so when the context does not \
contain the answer.";

const HOMECHAT_PROMPT: &str = "You are the PlanLytics assistant on the product home page. \
Explain what PlanLytics does (upload a plan document, extract its rows, download CSV and \
JSON exports) and help visitors get started. Keep answers short and friendly.";

const RATE_LIMIT_MESSAGE: &str = "Too many chat requests, please wait a minute and try again";

fn build_prompt(request: &ChatRequest) -> String {
    match request.context.as_deref().map(str::trim) {
        Some(context) if !context.is_empty() => {
            format!("Context:\n{}\n\nQuestion:\n{}", context, request.message.trim())
        }
        _ => request.message.trim().to_string(),
    }
}

async fn respond(
    state: &AppState,
    system: &str,
    request: ChatRequest,
) -> ApiResult<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }
    if state.chat_limiter.check().is_err() {
        return Err(ApiError::RateLimited(RATE_LIMIT_MESSAGE.to_string()));
    }

    let reply = match state.llm.generate(system, &build_prompt(&request)).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Chat backend failed: {}", e);
            state.record_error(e.to_string()).await;
            return Err(e.into());
        }
    };

    Ok(Json(ChatResponse {
        reply,
        provider: state.llm.provider().to_string(),
        model: state.llm.model().to_string(),
    }))
}

pub async fn agent(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    respond(&state, AGENT_PROMPT, request).await
}

pub async fn homechat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    respond(&state, HOMECHAT_PROMPT, request).await
}

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route(AGENT_PATH, post(agent))
        .route(HOMECHAT_PATH, post(homechat))
}
