//! Gateway transport
//!
//! [`GatewayTransport`] is the seam between the controller and the network.
//! [`HttpTransport`] is the reqwest implementation; tests script their own.

use crate::error::TransportError;
use crate::response::RawResponse;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

const USER_AGENT: &str = concat!("planlytics/", env!("CARGO_PKG_VERSION"));

/// A file selected for upload, held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Name as shown to the user and sent in the multipart part
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file
    pub async fn from_path(path: &Path) -> Result<Self, TransportError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| TransportError::LocalFile {
                path: path.display().to_string(),
                source,
            })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(filename, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Requests the client issues against the gateway
///
/// `Err` means no HTTP response was obtained. Any response, whatever its
/// status, is returned as `Ok` for the caller to classify.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// POST a multipart form with one file field
    async fn post_multipart(
        &self,
        path: &str,
        field: &str,
        file: &UploadFile,
    ) -> Result<RawResponse, TransportError>;

    /// POST a JSON body
    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport
///
/// No request timeout is set: analysis of a large document can take
/// minutes and the client has no retry policy to fall back on.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(TransportError::InvalidUrl(base_url));
        }

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a gateway path or an already-absolute link
    pub fn resolve_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }

    /// GET an export artifact
    pub async fn download(&self, href: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.resolve_url(href);
        debug!(url = %url, "Downloading export");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Network(format!(
                "Download of {} failed with HTTP {}",
                url,
                status.as_u16()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn into_raw(response: reqwest::Response) -> Result<RawResponse, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse::new(status, body))
    }
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn post_multipart(
        &self,
        path: &str,
        field: &str,
        file: &UploadFile,
    ) -> Result<RawResponse, TransportError> {
        let url = self.resolve_url(path);
        debug!(url = %url, filename = %file.filename, size = file.size(), "POST multipart");

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone());
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let response = self.client.post(&url).multipart(form).send().await?;
        Self::into_raw(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse, TransportError> {
        let url = self.resolve_url(path);
        debug!(url = %url, "POST json");

        let response = self.client.post(&url).json(body).send().await?;
        Self::into_raw(response).await
    }
}
