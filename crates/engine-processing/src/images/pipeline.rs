use crate::{error::ImageError, images::resolver::ImageResolver, retry::classify, transform::text};
use connectors::{blob::BlobStore, images::ImageFetcher};
use engine_core::{limiter::TaskLimiter, retry::RetryPolicy};
use model::{
    image::{ResolveReason, ResolvedImage, UploadedImage},
    record::SourceRecord,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

/// What the pipeline produced for one record: the ordered gallery URLs
/// for the payload plus the counters the checkpoint accumulates.
#[derive(Debug, Default)]
pub struct ImageOutcome {
    pub urls: Vec<String>,
    pub uploaded: u32,
    pub failed: u32,
    pub details: Vec<UploadedImage>,
}

/// Resolve → download → dedup → upload, per record. Per-image work runs
/// concurrently under the worker limiter; gallery order is preserved by
/// joining results in submission order. The dedup map lives for the
/// pipeline instance, so identical bytes across the whole run upload once.
pub struct ImagePipeline {
    fetcher: Arc<ImageFetcher>,
    blob: Arc<dyn BlobStore>,
    resolver: Arc<ImageResolver>,
    limiter: TaskLimiter,
    retry: RetryPolicy,
    key_prefix: String,
    /// One upload slot per content hash. Late arrivals await the first
    /// uploader's URL instead of uploading again.
    seen: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl ImagePipeline {
    pub fn new(
        fetcher: Arc<ImageFetcher>,
        blob: Arc<dyn BlobStore>,
        resolver: Arc<ImageResolver>,
        workers: usize,
        retry: RetryPolicy,
        key_prefix: &str,
    ) -> Self {
        ImagePipeline {
            fetcher,
            blob,
            resolver,
            limiter: TaskLimiter::new(workers),
            retry,
            key_prefix: key_prefix.trim_matches('/').to_string(),
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn placeholder_url(&self) -> &str {
        self.resolver.placeholder_url()
    }

    /// Object key for one gallery image. Keys group a product's images
    /// under a brand/product folder so the store stays browsable.
    fn build_key(&self, record: &SourceRecord, resolved_url: &str) -> String {
        let brand = record.brand.as_deref().unwrap_or("unbranded");
        format!(
            "{}/{}/{}-{}/images/{}",
            self.key_prefix,
            text::slugify(brand),
            text::slugify(&record.name),
            record.id,
            text::safe_filename(resolved_url)
        )
    }

    /// Resolution only, no downloads or uploads. Used by dry runs to
    /// report what a live run would do per image.
    pub async fn resolve_only(&self, record: &SourceRecord) -> Vec<ResolvedImage> {
        let mut out = Vec::with_capacity(record.images.len());
        for image in &record.images {
            match self.resolver.resolve(&image.path).await {
                Ok(resolved) => out.push(resolved),
                Err(err) => {
                    warn!(record_id = record.id, path = %image.path, error = %err, "Resolution error");
                    out.push(ResolvedImage::placeholder(
                        &image.path,
                        self.resolver.placeholder_url(),
                        Vec::new(),
                    ));
                }
            }
        }
        out
    }

    /// Runs the full pipeline for one record. Images that cannot be
    /// resolved or uploaded are counted and skipped; a record that ends up
    /// with no live image gets the placeholder so the payload stays valid.
    pub async fn process(&self, record: &SourceRecord) -> ImageOutcome {
        let tasks = record.images.iter().map(|image| {
            let path = image.path.clone();
            self.limiter.run(self.process_one(record, path))
        });
        let results = futures::future::join_all(tasks).await;

        let mut outcome = ImageOutcome::default();
        for result in results {
            match result {
                Ok(Ok(uploaded)) => {
                    if !uploaded.deduplicated {
                        outcome.uploaded += 1;
                    }
                    outcome.urls.push(uploaded.url.clone());
                    outcome.details.push(uploaded);
                }
                Ok(Err(err)) => {
                    warn!(record_id = record.id, error = %err, "Image dropped");
                    outcome.failed += 1;
                }
                Err(_) => {
                    warn!(record_id = record.id, "Image worker pool closed");
                    outcome.failed += 1;
                }
            }
        }

        if outcome.urls.is_empty() {
            outcome
                .urls
                .push(self.resolver.placeholder_url().to_string());
        }
        outcome
    }

    async fn process_one(
        &self,
        record: &SourceRecord,
        path: String,
    ) -> Result<UploadedImage, ImageError> {
        let resolved = self.resolver.resolve(&path).await?;
        if resolved.reason == ResolveReason::Placeholder {
            return Err(ImageError::Unresolvable {
                raw: path,
                attempts: resolved.attempted_urls.len(),
            });
        }

        let staged = self
            .retry
            .run(|| self.fetcher.download(&resolved.resolved_url), classify)
            .await
            .map_err(|e| ImageError::Connector(e.into_inner()))?;

        // Dedup on content hash. The slot is reserved under the lock, so
        // concurrent identical images (even with different filenames) wait
        // for the first upload and share its URL. A failed upload leaves
        // the slot empty and the next holder uploads instead.
        let slot = self
            .seen
            .lock()
            .await
            .entry(staged.checksum.clone())
            .or_default()
            .clone();

        let mut fresh_upload = false;
        let url = slot
            .get_or_try_init(|| async {
                fresh_upload = true;
                let key = self.build_key(record, &resolved.resolved_url);
                self.retry
                    .run(
                        || self.blob.put_file(&key, staged.file.path(), &staged.content_type),
                        classify,
                    )
                    .await
                    .map_err(|e| ImageError::Connector(e.into_inner()))
            })
            .await?
            .clone();

        if !fresh_upload {
            debug!(checksum = %staged.checksum, "Duplicate image, reusing earlier upload");
        }
        Ok(UploadedImage {
            url,
            checksum: Some(staged.checksum),
            deduplicated: !fresh_upload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::record::SourceImage;
    use std::time::Duration;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn image(path: &str, position: u32) -> SourceImage {
        SourceImage {
            path: path.to_string(),
            position,
            is_main: position == 0,
        }
    }

    fn record(paths: &[&str]) -> SourceRecord {
        SourceRecord {
            id: 7,
            sku: "KET-100".into(),
            name: "Kettle".into(),
            brand: Some("Acme".into()),
            images: paths
                .iter()
                .enumerate()
                .map(|(i, p)| image(p, i as u32))
                .collect(),
            ..Default::default()
        }
    }

    async fn pipeline(media: &MockServer, blob: &MockServer) -> ImagePipeline {
        let fetcher = Arc::new(ImageFetcher::new(Duration::from_secs(2)).unwrap());
        let resolver = Arc::new(
            ImageResolver::new(
                fetcher.clone(),
                &media.uri(),
                "https://cdn.example/placeholder.png",
            )
            .unwrap(),
        );
        let blob_store = Arc::new(
            connectors::blob::HttpBlobStore::new(&blob.uri(), Duration::from_secs(2)).unwrap(),
        );
        ImagePipeline::new(
            fetcher,
            blob_store,
            resolver,
            4,
            RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2)),
            "catalog",
        )
    }

    fn serve_image(body: Vec<u8>) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "image/jpeg")
            .set_body_bytes(body)
    }

    #[tokio::test]
    async fn uploads_in_gallery_order_with_grouped_keys() {
        let media = MockServer::start().await;
        let blob = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
            .mount(&media)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"/k/e/front\.jpg$"))
            .respond_with(serve_image(vec![1u8; 64]))
            .mount(&media)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"/k/e/side\.jpg$"))
            .respond_with(serve_image(vec![2u8; 64]))
            .mount(&media)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&blob)
            .await;

        let p = pipeline(&media, &blob).await;
        let outcome = p.process(&record(&["k/e/front.jpg", "k/e/side.jpg"])).await;

        assert_eq!(outcome.uploaded, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(
            outcome.urls,
            vec![
                format!("{}/catalog/acme/kettle-7/images/front.jpg", blob.uri()),
                format!("{}/catalog/acme/kettle-7/images/side.jpg", blob.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn identical_bytes_upload_once() {
        let media = MockServer::start().await;
        let blob = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
            .mount(&media)
            .await;
        Mock::given(method("GET"))
            .respond_with(serve_image(vec![9u8; 128]))
            .mount(&media)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&blob)
            .await;

        let p = pipeline(&media, &blob).await;
        // Serial submissions through the same pipeline instance: the second
        // record's copy of the image must dedup against the first's.
        let first = p.process(&record(&["k/e/front.jpg"])).await;
        let second = p.process(&record(&["k/e/copy.jpg"])).await;

        assert_eq!(first.uploaded, 1);
        assert_eq!(second.uploaded, 0);
        assert_eq!(second.details[0].deduplicated, true);
        assert_eq!(second.urls, first.urls);
    }

    #[tokio::test]
    async fn concurrent_identical_bytes_share_one_upload() {
        let media = MockServer::start().await;
        let blob = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
            .mount(&media)
            .await;
        // Same bytes behind two filenames, delayed so both downloads are
        // in flight before either reaches the dedup map.
        Mock::given(method("GET"))
            .respond_with(
                serve_image(vec![5u8; 256]).set_delay(Duration::from_millis(50)),
            )
            .mount(&media)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&blob)
            .await;

        let p = pipeline(&media, &blob).await;
        let outcome = p.process(&record(&["k/e/front.jpg", "k/e/side.jpg"])).await;

        assert_eq!(outcome.uploaded, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.urls[0], outcome.urls[1]);
        let dedups = outcome.details.iter().filter(|d| d.deduplicated).count();
        assert_eq!(dedups, 1);
    }

    #[tokio::test]
    async fn all_failures_substitute_the_placeholder() {
        let media = MockServer::start().await;
        let blob = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&media)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&media)
            .await;

        let p = pipeline(&media, &blob).await;
        let outcome = p.process(&record(&["k/e/gone.jpg"])).await;

        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.uploaded, 0);
        assert_eq!(outcome.urls, vec!["https://cdn.example/placeholder.png".to_string()]);
    }

    #[tokio::test]
    async fn record_without_images_gets_the_placeholder() {
        let media = MockServer::start().await;
        let blob = MockServer::start().await;
        let p = pipeline(&media, &blob).await;

        let outcome = p.process(&record(&[])).await;
        assert_eq!(outcome.urls, vec!["https://cdn.example/placeholder.png".to_string()]);
        assert_eq!(outcome.failed, 0);
    }
}
