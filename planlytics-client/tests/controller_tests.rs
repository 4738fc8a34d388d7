//! Upload/Analyze controller behavior against a scripted gateway

mod helpers;

use helpers::{plan_pdf, wait_until, ScriptedTransport};
use planlytics_client::render::render_snapshot;
use planlytics_client::response::RawResponse;
use planlytics_client::{
    AnalysisOutcome, ClientState, FailureKind, Stage, UploadController, UploadFile, UploadOutcome,
};
use planlytics_common::RowCount;
use serde_json::json;
use std::sync::Arc;

fn setup() -> (Arc<ScriptedTransport>, Arc<UploadController<ScriptedTransport>>) {
    let transport = Arc::new(ScriptedTransport::new());
    let controller = Arc::new(UploadController::new(transport.clone()));
    (transport, controller)
}

async fn upload_ok(
    transport: &ScriptedTransport,
    controller: &UploadController<ScriptedTransport>,
    filename: &str,
) {
    transport.respond(200, &json!({ "filename": filename }).to_string());
    controller.select_file(UploadFile::new(filename, b"data".to_vec())).await;
    assert!(matches!(
        controller.submit_upload().await,
        UploadOutcome::Stored(_)
    ));
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_plan_pdf_happy_path() {
    let (transport, controller) = setup();
    transport
        .respond(200, r#"{"filename":"plan.pdf"}"#)
        .respond(200, r#"{"rows":42,"download_url_csv":"/files/plan.csv"}"#);

    assert_eq!(controller.state().await, ClientState::Idle);
    assert!(!controller.can_analyze().await);

    controller.select_file(plan_pdf()).await;
    let UploadOutcome::Stored(session) = controller.submit_upload().await else {
        panic!("upload should succeed");
    };
    assert_eq!(session.file_reference, "plan.pdf");
    assert_eq!(session.original_filename, "plan.pdf");
    assert_eq!(controller.state().await, ClientState::Ready);
    assert!(controller.can_analyze().await);

    let AnalysisOutcome::Completed(result) = controller.request_analysis().await else {
        panic!("analysis should succeed");
    };
    assert_eq!(result.rows_extracted, RowCount::Known(42));
    assert_eq!(result.export_links.len(), 1);
    assert_eq!(result.export_links[0].url, "/files/plan.csv");

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, ClientState::Complete);
    let lines = render_snapshot(&snapshot);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Rows extracted: 42");
    assert!(lines[1].starts_with("CSV: /files/plan.csv?t="));

    // The analyze request carried the stored reference
    let analyze_call = &transport.calls()[1];
    assert_eq!(analyze_call.path, "/api/analyze");
    assert_eq!(analyze_call.body, Some(json!({"filename": "plan.pdf"})));
}

#[tokio::test]
async fn test_upload_500_plain_text_is_shown_verbatim() {
    let (transport, controller) = setup();
    transport.respond(500, "Internal Server Error");

    controller.select_file(plan_pdf()).await;
    let UploadOutcome::Failed(error) = controller.submit_upload().await else {
        panic!("upload should fail");
    };
    assert_eq!(error.source_stage, Stage::Upload);
    assert_eq!(error.kind, FailureKind::GatewayError);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, ClientState::Error);
    assert_eq!(render_snapshot(&snapshot), vec!["Error: Internal Server Error"]);
    assert!(!snapshot.analyze_enabled);
    assert!(snapshot.session.is_none());

    // Analyze stays a no-op: no request is issued
    assert_eq!(
        controller.request_analysis().await,
        AnalysisOutcome::Suppressed
    );
    assert_eq!(transport.calls_to("/api/analyze"), 0);
}

#[tokio::test]
async fn test_non_numeric_rows_render_placeholder() {
    let (transport, controller) = setup();
    upload_ok(&transport, &controller, "plan.pdf").await;
    transport.respond(200, r#"{"rows":"unknown"}"#);

    controller.request_analysis().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, ClientState::Complete);
    assert_eq!(render_snapshot(&snapshot), vec!["Rows extracted: —"]);
}

// =============================================================================
// Upload properties
// =============================================================================

#[tokio::test]
async fn test_upload_without_filename_keeps_analyze_disabled() {
    for body in [r#"{"size":10}"#, r#"{"filename":""}"#, r#"{"filename":null}"#] {
        let (transport, controller) = setup();
        transport.respond(200, body);
        controller.select_file(plan_pdf()).await;

        let outcome = controller.submit_upload().await;
        assert!(matches!(outcome, UploadOutcome::Failed(_)), "body {}", body);
        assert!(!controller.can_analyze().await, "body {}", body);
    }
}

#[tokio::test]
async fn test_every_upload_failure_kind_clears_session() {
    let failures: Vec<(Box<dyn Fn(&ScriptedTransport)>, FailureKind, &str)> = vec![
        (
            Box::new(|t: &ScriptedTransport| {
                t.network_down("connection refused");
            }),
            FailureKind::NetworkFailure,
            "Network error: connection refused",
        ),
        (
            Box::new(|t: &ScriptedTransport| {
                t.respond(413, r#"{"error":"File too large"}"#);
            }),
            FailureKind::GatewayError,
            "File too large",
        ),
        (
            Box::new(|t: &ScriptedTransport| {
                t.respond(200, "<html>proxy login</html>");
            }),
            FailureKind::MalformedResponse,
            "<html>proxy login</html>",
        ),
    ];

    for (script, kind, message) in failures {
        let (transport, controller) = setup();
        upload_ok(&transport, &controller, "first.pdf").await;
        assert!(controller.can_analyze().await);

        script(transport.as_ref());
        controller.select_file(plan_pdf()).await;
        let UploadOutcome::Failed(error) = controller.submit_upload().await else {
            panic!("upload should fail for {:?}", kind);
        };

        assert_eq!(error.kind, kind);
        assert_eq!(error.message, message);
        let snapshot = controller.snapshot().await;
        assert!(snapshot.session.is_none());
        assert!(!snapshot.analyze_enabled);
        assert_eq!(
            render_snapshot(&snapshot),
            vec![format!("Error: {}", message)]
        );
    }
}

#[tokio::test]
async fn test_upload_suppressed_without_selection() {
    let (transport, controller) = setup();
    assert!(!controller.can_upload().await);
    assert_eq!(controller.submit_upload().await, UploadOutcome::Suppressed);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_second_upload_click_while_in_flight_is_suppressed() {
    let (transport, controller) = setup();
    let gate = transport.gate();
    controller.select_file(plan_pdf()).await;

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_upload().await }
    });
    wait_until(|| transport.calls_to("/api/upload") == 1).await;

    assert_eq!(controller.state().await, ClientState::Uploading);
    assert!(!controller.can_upload().await);
    assert_eq!(controller.submit_upload().await, UploadOutcome::Suppressed);

    // Reselecting a file stays possible while the upload is in flight
    controller
        .select_file(UploadFile::new("other.pdf", b"x".to_vec()))
        .await;

    gate.send(RawResponse::new(200, r#"{"filename":"plan.pdf"}"#))
        .unwrap();
    assert!(matches!(first.await.unwrap(), UploadOutcome::Stored(_)));
    assert_eq!(transport.calls_to("/api/upload"), 1);
    assert!(controller.can_upload().await);
}

// =============================================================================
// Analysis properties
// =============================================================================

#[tokio::test]
async fn test_failed_analysis_keeps_session_for_retry() {
    let (transport, controller) = setup();
    upload_ok(&transport, &controller, "plan.pdf").await;
    let before = controller.snapshot().await.session;

    transport
        .respond(502, r#"{"error":"LLM backend unavailable"}"#)
        .network_down("reset by peer")
        .respond(200, "not json")
        .respond(200, r#"{"rows":3,"download_url_csv":"/files/plan.csv"}"#);

    for expected in [
        FailureKind::GatewayError,
        FailureKind::NetworkFailure,
        FailureKind::MalformedResponse,
    ] {
        let AnalysisOutcome::Failed(error) = controller.request_analysis().await else {
            panic!("analysis should fail with {:?}", expected);
        };
        assert_eq!(error.kind, expected);
        assert_eq!(error.source_stage, Stage::Analyze);

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.state, ClientState::Error);
        assert_eq!(snapshot.session, before);
        assert!(snapshot.analyze_enabled);
    }

    assert!(matches!(
        controller.request_analysis().await,
        AnalysisOutcome::Completed(_)
    ));
    assert_eq!(transport.calls_to("/api/upload"), 1);
}

#[tokio::test]
async fn test_rerun_produces_distinct_cache_busted_urls() {
    let (transport, controller) = setup();
    upload_ok(&transport, &controller, "plan.pdf").await;
    let body = r#"{"rows":1,"download_url_csv":"/files/plan.csv"}"#;
    transport.respond(200, body).respond(200, body);

    let AnalysisOutcome::Completed(first) = controller.request_analysis().await else {
        panic!("first run should succeed");
    };
    let AnalysisOutcome::Completed(second) = controller.request_analysis().await else {
        panic!("second run should succeed");
    };

    assert_eq!(first.export_links[0].url, second.export_links[0].url);
    assert_ne!(first.export_links[0].href, second.export_links[0].href);
}

#[tokio::test]
async fn test_second_analyze_click_while_in_flight_is_suppressed() {
    let (transport, controller) = setup();
    upload_ok(&transport, &controller, "plan.pdf").await;
    let gate = transport.gate();

    let running = tokio::spawn({
        let controller = controller.clone();
        async move { controller.request_analysis().await }
    });
    wait_until(|| transport.calls_to("/api/analyze") == 1).await;

    assert_eq!(controller.state().await, ClientState::Analyzing);
    assert!(!controller.can_analyze().await);
    assert_eq!(
        controller.request_analysis().await,
        AnalysisOutcome::Suppressed
    );

    gate.send(RawResponse::new(200, r#"{"rows":5}"#)).unwrap();
    assert!(matches!(
        running.await.unwrap(),
        AnalysisOutcome::Completed(_)
    ));
    assert_eq!(transport.calls_to("/api/analyze"), 1);
}

// =============================================================================
// Stale responses
// =============================================================================

#[tokio::test]
async fn test_stale_analysis_discarded_after_new_upload() {
    let (transport, controller) = setup();
    upload_ok(&transport, &controller, "old.pdf").await;
    let old_gate = transport.gate();

    let stale = tokio::spawn({
        let controller = controller.clone();
        async move { controller.request_analysis().await }
    });
    wait_until(|| transport.calls_to("/api/analyze") == 1).await;

    // New upload while the old analysis is still in flight
    upload_ok(&transport, &controller, "new.pdf").await;
    let new_session = controller.snapshot().await.session;
    assert_eq!(
        new_session.as_ref().map(|s| s.file_reference.as_str()),
        Some("new.pdf")
    );

    old_gate
        .send(RawResponse::new(
            200,
            r#"{"rows":99,"download_url_csv":"/files/old.csv"}"#,
        ))
        .unwrap();
    assert_eq!(stale.await.unwrap(), AnalysisOutcome::Stale);

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, ClientState::Ready);
    assert!(snapshot.result.is_none());
    assert_eq!(snapshot.session, new_session);
    assert!(snapshot.analyze_enabled);
}

#[tokio::test]
async fn test_reselecting_file_keeps_uploaded_session() {
    let (transport, controller) = setup();
    upload_ok(&transport, &controller, "plan.pdf").await;

    controller
        .select_file(UploadFile::new("other.pdf", b"x".to_vec()))
        .await;
    assert!(controller.can_analyze().await);
    assert_eq!(
        controller
            .snapshot()
            .await
            .session
            .as_ref()
            .map(|s| s.file_reference.as_str()),
        Some("plan.pdf")
    );

    transport.respond(200, r#"{"rows":3}"#);
    assert!(matches!(
        controller.request_analysis().await,
        AnalysisOutcome::Completed(_)
    ));
    let analyze_call = &transport.calls()[1];
    assert_eq!(analyze_call.body, Some(json!({"filename": "plan.pdf"})));
}

#[tokio::test]
async fn test_reset_discards_in_flight_upload() {
    let (transport, controller) = setup();
    let gate = transport.gate();
    controller.select_file(plan_pdf()).await;

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_upload().await }
    });
    wait_until(|| transport.calls_to("/api/upload") == 1).await;

    controller.reset().await;
    gate.send(RawResponse::new(200, r#"{"filename":"plan.pdf"}"#))
        .unwrap();

    assert_eq!(pending.await.unwrap(), UploadOutcome::Stale);
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, ClientState::Idle);
    assert!(snapshot.session.is_none());
    assert!(snapshot.selected_file.is_none());
    assert!(!snapshot.upload_enabled);
    assert!(!snapshot.analyze_enabled);
}
