//! planlytics-client library
//!
//! Upload → analyze → download client for the PlanLytics gateway.
//!
//! The [`UploadController`] owns the one active upload session and the
//! latest analysis result; [`ChatChannel`] drives the agent/homechat
//! endpoints. Both talk to the gateway through a [`GatewayTransport`], so
//! front-ends (the `planlytics` CLI, tests) only ever render snapshots.

pub mod cache_bust;
pub mod chat;
pub mod controller;
pub mod error;
pub mod render;
pub mod response;
pub mod session;
pub mod transport;

pub use chat::{ChatChannel, ChatEndpoint, ChatOutcome};
pub use controller::{AnalysisOutcome, ClientState, Snapshot, UploadController, UploadOutcome};
pub use error::{ChatError, FailureKind, RequestError, Stage, TransportError};
pub use session::{AnalysisResult, ExportFormat, ExportLink, UploadSession};
pub use transport::{GatewayTransport, HttpTransport, UploadFile};
