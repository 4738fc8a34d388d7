//! Scripted gateway transport for controller and chat tests
//!
//! Each request pops the next scripted reply. `Gate` replies block until the
//! test releases them, which makes in-flight interleavings deterministic.

#![allow(dead_code)]

use async_trait::async_trait;
use planlytics_client::response::RawResponse;
use planlytics_client::{GatewayTransport, TransportError, UploadFile};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

pub enum Scripted {
    Respond(u16, String),
    NetworkDown(String),
    Gate(oneshot::Receiver<RawResponse>),
}

/// One recorded request
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub path: String,
    pub filename: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: &str) -> &Self {
        self.push(Scripted::Respond(status, body.to_string()))
    }

    pub fn network_down(&self, message: &str) -> &Self {
        self.push(Scripted::NetworkDown(message.to_string()))
    }

    /// Queue a reply the test releases later through the returned sender
    pub fn gate(&self) -> oneshot::Sender<RawResponse> {
        let (tx, rx) = oneshot::channel();
        self.push(Scripted::Gate(rx));
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }

    fn push(&self, item: Scripted) -> &Self {
        self.script.lock().unwrap().push_back(item);
        self
    }

    async fn next(&self, call: Call) -> Result<RawResponse, TransportError> {
        self.calls.lock().unwrap().push(call);
        let item = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted request");

        match item {
            Scripted::Respond(status, body) => Ok(RawResponse::new(status, body)),
            Scripted::NetworkDown(message) => Err(TransportError::Network(message)),
            Scripted::Gate(rx) => Ok(rx.await.expect("gate dropped")),
        }
    }
}

#[async_trait]
impl GatewayTransport for ScriptedTransport {
    async fn post_multipart(
        &self,
        path: &str,
        _field: &str,
        file: &UploadFile,
    ) -> Result<RawResponse, TransportError> {
        self.next(Call {
            path: path.to_string(),
            filename: Some(file.filename.clone()),
            body: None,
        })
        .await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse, TransportError> {
        self.next(Call {
            path: path.to_string(),
            filename: None,
            body: Some(body.clone()),
        })
        .await
    }
}

pub fn plan_pdf() -> UploadFile {
    UploadFile::new("plan.pdf", b"%PDF-1.4 fake".to_vec())
}

/// Yield until `cond` holds, so a spawned request reaches its await point
pub async fn wait_until<F: FnMut() -> bool>(mut cond: F) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
