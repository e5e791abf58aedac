use crate::error::ConnectorError;
use async_trait::async_trait;
use std::{path::Path, time::Duration};
use tracing::debug;

/// Content-addressable object storage for uploaded images. Keys are
/// object-store keys (forward-slash joined), never filesystem paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads the file under `key` and returns the public object URL.
    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<String, ConnectorError>;
}

/// Minimal HTTP object store: PUT {base}/{key}, public URL is the same
/// address.
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpBlobStore {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<String, ConnectorError> {
        let bytes = tokio::fs::read(path).await?;
        let url = format!("{}/{key}", self.base_url);

        let response = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ConnectorError::ApiRejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        debug!(key, "Uploaded object");
        Ok(url)
    }
}
