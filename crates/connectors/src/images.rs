use crate::error::ConnectorError;
use blake3::Hasher;
use reqwest::{Client, StatusCode, header};
use std::{io::Write, time::Duration};
use tempfile::NamedTempFile;
use tracing::trace;

/// An image downloaded to local temporary storage, hashed while streaming.
/// The temp file is deleted when the value drops, so a deduplicated image
/// cleans itself up for free.
pub struct StagedImage {
    pub file: NamedTempFile,
    pub checksum: String,
    pub content_type: String,
    pub byte_len: u64,
}

pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ConnectorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ImageFetcher { client })
    }

    /// Lightweight existence probe: HEAD first, and for servers that
    /// reject HEAD, a one-byte ranged GET. The URL only passes when the
    /// response advertises an image content-type.
    pub async fn probe(&self, url: &str) -> Result<bool, ConnectorError> {
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => {
                return Ok(is_image(&response));
            }
            Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => {}
            Ok(_) => return Ok(false),
            // Fall through to the ranged GET on transport-level failures
            // as well; some CDNs drop HEAD outright.
            Err(err) if err.is_timeout() => return Err(ConnectorError::Http(err)),
            Err(_) => {}
        }

        let response = self
            .client
            .get(url)
            .header(header::RANGE, "bytes=0-0")
            .send()
            .await?;
        Ok(response.status().is_success() && is_image(&response))
    }

    /// Streams the URL to a temp file while hashing with blake3.
    pub async fn download(&self, url: &str) -> Result<StagedImage, ConnectorError> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut file = NamedTempFile::new()?;
        let mut hasher = Hasher::new();
        let mut byte_len = 0u64;
        while let Some(chunk) = response.chunk().await? {
            hasher.update(&chunk);
            file.write_all(&chunk)?;
            byte_len += chunk.len() as u64;
        }
        file.flush()?;

        let checksum = hasher.finalize().to_hex().to_string();
        trace!(url, checksum = %checksum, byte_len, "Staged image");
        Ok(StagedImage {
            file,
            checksum,
            content_type,
            byte_len,
        })
    }
}

fn is_image(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("image/"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_match, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn probe_accepts_image_content_type_only() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/page.html"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new(Duration::from_secs(5)).unwrap();
        assert!(fetcher.probe(&format!("{}/a.jpg", server.uri())).await.unwrap());
        assert!(!fetcher.probe(&format!("{}/page.html", server.uri())).await.unwrap());
    }

    #[tokio::test]
    async fn probe_falls_back_to_ranged_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/b.png"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b.png"))
            .and(header_match("range", "bytes=0-0"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0x89]),
            )
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new(Duration::from_secs(5)).unwrap();
        assert!(fetcher.probe(&format!("{}/b.png", server.uri())).await.unwrap());
    }

    #[tokio::test]
    async fn identical_bytes_hash_identically() {
        let server = MockServer::start().await;
        let body = vec![7u8; 2048];
        for p in ["/one.jpg", "/two.jpg"] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "image/jpeg")
                        .set_body_bytes(body.clone()),
                )
                .mount(&server)
                .await;
        }

        let fetcher = ImageFetcher::new(Duration::from_secs(5)).unwrap();
        let one = fetcher.download(&format!("{}/one.jpg", server.uri())).await.unwrap();
        let two = fetcher.download(&format!("{}/two.jpg", server.uri())).await.unwrap();

        assert_eq!(one.checksum, two.checksum);
        assert_eq!(one.byte_len, 2048);
    }
}
