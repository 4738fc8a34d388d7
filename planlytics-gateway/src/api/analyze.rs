//! POST /api/analyze
//!
//! Runs extraction over a previously uploaded file and writes the export
//! artifacts served under `/files`.

use axum::{extract::State, routing::post, Json, Router};
use planlytics_common::api::{AnalyzeRequest, AnalyzeResponse, ANALYZE_PATH};
use std::path::{Component, Path};
use tracing::{info, warn};

use crate::exports::write_exports;
use crate::extract::extract_rows;
use crate::{ApiError, ApiResult, AppState};

/// Accept only a single plain path component, so the joined path stays
/// directly inside the uploads directory
fn validate_filename(name: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("filename is required".to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains('\\') => Ok(()),
        _ => Err(ApiError::BadRequest(format!("Invalid filename: {}", name))),
    }
}

fn file_url(name: &str) -> String {
    format!("/files/{}", name)
}

pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    validate_filename(&request.filename)?;

    let source = state.config.uploads_dir.join(&request.filename);
    if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
        return Err(ApiError::NotFound(format!(
            "File not found: {}",
            request.filename
        )));
    }

    let outputs_dir = state.config.outputs_dir.clone();
    let stored_name = request.filename.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let extraction = extract_rows(&source)?;
        let paths = write_exports(&outputs_dir, &stored_name, &extraction)?;
        Ok::<_, planlytics_common::Error>((extraction.row_count(), paths))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Analysis task failed: {}", e)))?;

    let (rows, paths) = match outcome {
        Ok(done) => done,
        Err(e) => {
            warn!("Analysis of {} failed: {}", request.filename, e);
            state
                .record_error(format!("Analysis failed for {}: {}", request.filename, e))
                .await;
            return Err(e.into());
        }
    };

    info!("Analyzed {}: rows={}", request.filename, rows);

    Ok(Json(AnalyzeResponse {
        filename: Some(request.filename),
        rows,
        download_url_csv: Some(file_url(&paths.csv_name())),
        download_url_xlsx: None,
        download_url_json: Some(file_url(&paths.json_name())),
    }))
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new().route(ANALYZE_PATH, post(analyze))
}
