//! Upload/Analyze client state machine
//!
//! ```text
//! Idle ──submit_upload──▶ Uploading ──ok──▶ Ready ──request_analysis──▶ Analyzing ──ok──▶ Complete
//!                             │                                             │
//!                             └──err──▶ Error (no session)                  └──err──▶ Error (session kept)
//! ```
//!
//! One controller owns exactly one upload session. State sits behind a
//! tokio mutex that is never held across a network call, so the front-end
//! stays free to reselect a file or start a new upload while a request is
//! in flight.
//!
//! Every upload start and every [`UploadController::reset`] bumps a
//! generation counter. A response that resolves under an older generation
//! is discarded without touching state.

use crate::cache_bust::CacheBuster;
use crate::error::{Failure, FailureKind, RequestError, Stage, TransportError};
use crate::response::{interpret, RawResponse};
use crate::session::{AnalysisResult, UploadSession};
use crate::transport::{GatewayTransport, UploadFile};
use planlytics_common::api::{AnalyzeResponse, UploadResponse, ANALYZE_PATH, UPLOAD_FIELD, UPLOAD_PATH};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    #[default]
    Idle,
    Uploading,
    Ready,
    Analyzing,
    Complete,
    Error,
}

/// Point-in-time view of the controller for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub state: ClientState,
    pub selected_file: Option<String>,
    pub session: Option<UploadSession>,
    pub result: Option<AnalysisResult>,
    pub error: Option<RequestError>,
    /// Upload control enabled
    pub upload_enabled: bool,
    /// Analyze control enabled
    pub analyze_enabled: bool,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Stored(UploadSession),
    Failed(RequestError),
    /// No file selected, or an upload is already in flight
    Suppressed,
    /// Superseded by a reset while in flight
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Completed(AnalysisResult),
    Failed(RequestError),
    /// No session, or an analysis is already in flight
    Suppressed,
    /// Superseded by a new upload or a reset while in flight
    Stale,
}

#[derive(Debug, Default)]
struct Inner {
    state: ClientState,
    selected: Option<Arc<UploadFile>>,
    session: Option<UploadSession>,
    result: Option<AnalysisResult>,
    error: Option<RequestError>,
    generation: u64,
    upload_in_flight: bool,
    analysis_in_flight: bool,
    cache_buster: CacheBuster,
}

impl Inner {
    fn can_upload(&self) -> bool {
        self.selected.is_some() && !self.upload_in_flight
    }

    fn can_analyze(&self) -> bool {
        self.session.is_some() && !self.analysis_in_flight
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            selected_file: self.selected.as_ref().map(|f| f.filename.clone()),
            session: self.session.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            upload_enabled: self.can_upload(),
            analyze_enabled: self.can_analyze(),
            generation: self.generation,
        }
    }
}

pub struct UploadController<T> {
    transport: Arc<T>,
    inner: Mutex<Inner>,
}

impl<T: GatewayTransport> UploadController<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Record the pending file; allowed at any time
    pub async fn select_file(&self, file: UploadFile) {
        let mut inner = self.inner.lock().await;
        debug!(filename = %file.filename, size = file.size(), "File selected");
        inner.selected = Some(Arc::new(file));
    }

    pub async fn can_upload(&self) -> bool {
        self.inner.lock().await.can_upload()
    }

    pub async fn can_analyze(&self) -> bool {
        self.inner.lock().await.can_analyze()
    }

    pub async fn state(&self) -> ClientState {
        self.inner.lock().await.state
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.lock().await.snapshot()
    }

    /// Discard everything, as a page reload would
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        let generation = inner.generation + 1;
        let cache_buster = std::mem::take(&mut inner.cache_buster);
        *inner = Inner {
            generation,
            cache_buster,
            ..Inner::default()
        };
        debug!(generation, "Controller reset");
    }

    /// Upload the selected file
    ///
    /// Starting an upload invalidates the current session and result and
    /// abandons any in-flight analysis.
    pub async fn submit_upload(&self) -> UploadOutcome {
        let (generation, file) = {
            let mut inner = self.inner.lock().await;
            if !inner.can_upload() {
                debug!(
                    in_flight = inner.upload_in_flight,
                    "Upload suppressed"
                );
                return UploadOutcome::Suppressed;
            }
            let Some(file) = inner.selected.clone() else {
                return UploadOutcome::Suppressed;
            };

            inner.generation += 1;
            inner.upload_in_flight = true;
            inner.analysis_in_flight = false;
            inner.session = None;
            inner.result = None;
            inner.error = None;
            inner.state = ClientState::Uploading;
            (inner.generation, file)
        };

        info!(filename = %file.filename, size = file.size(), generation, "Uploading");
        let response = self
            .transport
            .post_multipart(UPLOAD_PATH, UPLOAD_FIELD, &file)
            .await;
        let outcome = session_from_response(response, &file);

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(
                generation,
                current = inner.generation,
                "Discarding stale upload response"
            );
            return UploadOutcome::Stale;
        }

        inner.upload_in_flight = false;
        match outcome {
            Ok(session) => {
                info!(file_reference = %session.file_reference, "Upload stored");
                inner.session = Some(session.clone());
                inner.state = ClientState::Ready;
                UploadOutcome::Stored(session)
            }
            Err(error) => {
                warn!(kind = ?error.kind, message = %error.message, "Upload failed");
                inner.session = None;
                inner.error = Some(error.clone());
                inner.state = ClientState::Error;
                UploadOutcome::Failed(error)
            }
        }
    }

    /// Analyze the file held by the current session
    ///
    /// A failure leaves the session in place so the user can retry without
    /// uploading again.
    pub async fn request_analysis(&self) -> AnalysisOutcome {
        let (generation, session) = {
            let mut inner = self.inner.lock().await;
            if !inner.can_analyze() {
                debug!(
                    has_session = inner.session.is_some(),
                    in_flight = inner.analysis_in_flight,
                    "Analysis suppressed"
                );
                return AnalysisOutcome::Suppressed;
            }
            let Some(session) = inner.session.clone() else {
                return AnalysisOutcome::Suppressed;
            };

            inner.analysis_in_flight = true;
            inner.result = None;
            inner.error = None;
            inner.state = ClientState::Analyzing;
            (inner.generation, session)
        };

        info!(file_reference = %session.file_reference, generation, "Requesting analysis");
        let body = json!({ "filename": session.file_reference });
        let response = self.transport.post_json(ANALYZE_PATH, &body).await;
        let outcome = analysis_from_response(response);

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(
                generation,
                current = inner.generation,
                "Discarding stale analysis response"
            );
            return AnalysisOutcome::Stale;
        }

        inner.analysis_in_flight = false;
        match outcome {
            Ok(response) => {
                let result = AnalysisResult::from_response(&response, &mut inner.cache_buster);
                info!(
                    rows = %result.rows_extracted,
                    links = result.export_links.len(),
                    "Analysis complete"
                );
                inner.result = Some(result.clone());
                inner.state = ClientState::Complete;
                AnalysisOutcome::Completed(result)
            }
            Err(error) => {
                warn!(kind = ?error.kind, message = %error.message, "Analysis failed");
                inner.error = Some(error.clone());
                inner.state = ClientState::Error;
                AnalysisOutcome::Failed(error)
            }
        }
    }
}

fn session_from_response(
    response: Result<RawResponse, TransportError>,
    file: &UploadFile,
) -> Result<UploadSession, RequestError> {
    let raw = response.map_err(|e| RequestError::new(Stage::Upload, e.into()))?;
    let body: UploadResponse =
        interpret(&raw).map_err(|f| RequestError::new(Stage::Upload, f))?;

    match body.filename.filter(|name| !name.trim().is_empty()) {
        Some(file_reference) => Ok(UploadSession {
            file_reference,
            original_filename: file.filename.clone(),
            size_bytes: body.size.unwrap_or_else(|| file.size()),
        }),
        None => Err(RequestError::new(
            Stage::Upload,
            Failure::new(
                FailureKind::MalformedResponse,
                "Upload response did not include a filename",
            ),
        )),
    }
}

fn analysis_from_response(
    response: Result<RawResponse, TransportError>,
) -> Result<AnalyzeResponse, RequestError> {
    let raw = response.map_err(|e| RequestError::new(Stage::Analyze, e.into()))?;
    interpret(&raw).map_err(|f| RequestError::new(Stage::Analyze, f))
}
