//! Agent / home chat channel
//!
//! Payloads go out as JSON and replies come back verbatim. A `429` from
//! either endpoint latches the whole channel into a rate-limited state:
//! every later send is suppressed until [`ChatChannel::reset`]. There is
//! no automatic retry.

use crate::error::{ChatError, Failure, FailureKind};
use crate::response::{extract_error_message, interpret, parse_body};
use crate::transport::GatewayTransport;
use planlytics_common::api::{AGENT_PATH, HOMECHAT_PATH};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Shown when a 429 body carries no message of its own
pub const DEFAULT_RATE_LIMIT_MESSAGE: &str =
    "Rate limit reached. Further requests are disabled for this session.";

const RATE_LIMITED_STATUS: u16 = 429;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatEndpoint {
    Agent,
    HomeChat,
}

impl ChatEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            ChatEndpoint::Agent => AGENT_PATH,
            ChatEndpoint::HomeChat => HOMECHAT_PATH,
        }
    }
}

impl fmt::Display for ChatEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatEndpoint::Agent => f.write_str("agent"),
            ChatEndpoint::HomeChat => f.write_str("homechat"),
        }
    }
}

impl FromStr for ChatEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "agent" => Ok(ChatEndpoint::Agent),
            "homechat" | "home" => Ok(ChatEndpoint::HomeChat),
            other => Err(format!(
                "Unknown chat endpoint '{}' (expected agent or homechat)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Reply body, unmodified
    Reply(Value),
    Failed(ChatError),
    /// This send hit the limit; the channel is now latched
    RateLimited(String),
    /// Channel latched, endpoint busy, or superseded by a reset
    Suppressed,
}

#[derive(Debug, Default)]
struct ChatInner {
    rate_limit_message: Option<String>,
    agent_busy: bool,
    homechat_busy: bool,
    generation: u64,
}

impl ChatInner {
    fn busy_flag(&mut self, endpoint: ChatEndpoint) -> &mut bool {
        match endpoint {
            ChatEndpoint::Agent => &mut self.agent_busy,
            ChatEndpoint::HomeChat => &mut self.homechat_busy,
        }
    }

    fn can_send(&self, endpoint: ChatEndpoint) -> bool {
        let busy = match endpoint {
            ChatEndpoint::Agent => self.agent_busy,
            ChatEndpoint::HomeChat => self.homechat_busy,
        };
        self.rate_limit_message.is_none() && !busy
    }
}

pub struct ChatChannel<T> {
    transport: Arc<T>,
    inner: Mutex<ChatInner>,
}

impl<T: GatewayTransport> ChatChannel<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            inner: Mutex::new(ChatInner::default()),
        }
    }

    pub async fn can_send(&self, endpoint: ChatEndpoint) -> bool {
        self.inner.lock().await.can_send(endpoint)
    }

    /// Message to show while latched
    pub async fn rate_limit_message(&self) -> Option<String> {
        self.inner.lock().await.rate_limit_message.clone()
    }

    pub async fn is_rate_limited(&self) -> bool {
        self.inner.lock().await.rate_limit_message.is_some()
    }

    /// Clear the latch and busy flags
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        let generation = inner.generation + 1;
        *inner = ChatInner {
            generation,
            ..ChatInner::default()
        };
    }

    pub async fn send(&self, endpoint: ChatEndpoint, payload: &Value) -> ChatOutcome {
        let generation = {
            let mut inner = self.inner.lock().await;
            if !inner.can_send(endpoint) {
                debug!(%endpoint, "Chat send suppressed");
                return ChatOutcome::Suppressed;
            }
            *inner.busy_flag(endpoint) = true;
            inner.generation
        };

        let response = self.transport.post_json(endpoint.path(), payload).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(%endpoint, "Discarding stale chat response");
            return ChatOutcome::Suppressed;
        }
        *inner.busy_flag(endpoint) = false;

        let raw = match response {
            Ok(raw) => raw,
            Err(e) => {
                let failure = Failure::from(e);
                warn!(%endpoint, message = %failure.message, "Chat request failed");
                return ChatOutcome::Failed(chat_error(endpoint, failure));
            }
        };

        if raw.status == RATE_LIMITED_STATUS {
            let message = parse_body::<Value>(&raw.body)
                .ok()
                .and_then(|v| extract_error_message(&v))
                .unwrap_or_else(|| DEFAULT_RATE_LIMIT_MESSAGE.to_string());
            warn!(%endpoint, "Rate limited; disabling further chat requests");
            inner.rate_limit_message = Some(message.clone());
            return ChatOutcome::RateLimited(message);
        }

        match interpret::<Value>(&raw) {
            Ok(reply) => {
                info!(%endpoint, status = raw.status, "Chat reply received");
                ChatOutcome::Reply(reply)
            }
            Err(failure) => {
                warn!(%endpoint, kind = ?failure.kind, message = %failure.message, "Chat request failed");
                ChatOutcome::Failed(chat_error(endpoint, failure))
            }
        }
    }
}

fn chat_error(endpoint: ChatEndpoint, failure: Failure) -> ChatError {
    ChatError {
        endpoint,
        kind: failure.kind,
        message: failure.message,
    }
}

impl ChatOutcome {
    /// Failure kind, if this outcome is a failure
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ChatOutcome::Failed(e) => Some(e.kind),
            ChatOutcome::RateLimited(_) => Some(FailureKind::RateLimited),
            _ => None,
        }
    }
}
