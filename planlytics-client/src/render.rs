//! Text rendering of controller and chat state
//!
//! Every failure kind renders the same way (`Error: <message>`).

use crate::chat::ChatOutcome;
use crate::controller::{ClientState, Snapshot};
use crate::error::RequestError;
use crate::session::AnalysisResult;

pub fn render_error(error: &RequestError) -> String {
    format!("Error: {}", error.message)
}

pub fn render_result(result: &AnalysisResult) -> Vec<String> {
    let mut lines = vec![format!("Rows extracted: {}", result.rows_extracted)];
    lines.extend(
        result
            .export_links
            .iter()
            .map(|link| format!("{}: {}", link.format, link.href)),
    );
    lines
}

pub fn render_snapshot(snapshot: &Snapshot) -> Vec<String> {
    match snapshot.state {
        ClientState::Idle => match &snapshot.selected_file {
            Some(name) => vec![format!("Selected: {}", name)],
            None => vec!["No file uploaded".to_string()],
        },
        ClientState::Uploading => vec!["Uploading…".to_string()],
        ClientState::Ready => match &snapshot.session {
            Some(session) => vec![format!("Ready: {}", session.original_filename)],
            None => vec!["No file uploaded".to_string()],
        },
        ClientState::Analyzing => vec!["Analyzing…".to_string()],
        ClientState::Complete => snapshot
            .result
            .as_ref()
            .map(render_result)
            .unwrap_or_default(),
        ClientState::Error => snapshot
            .error
            .as_ref()
            .map(|e| vec![render_error(e)])
            .unwrap_or_default(),
    }
}

pub fn render_chat(outcome: &ChatOutcome) -> Vec<String> {
    match outcome {
        ChatOutcome::Reply(value) => vec![serde_json::to_string_pretty(value)
            .unwrap_or_else(|_| value.to_string())],
        ChatOutcome::Failed(e) => vec![format!("Error: {}", e.message)],
        ChatOutcome::RateLimited(message) => vec![format!("Error: {}", message)],
        ChatOutcome::Suppressed => vec!["Request not sent".to_string()],
    }
}
