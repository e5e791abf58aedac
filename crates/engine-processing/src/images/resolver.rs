use crate::error::ImageError;
use connectors::images::ImageFetcher;
use model::image::{ResolveReason, ResolvedImage};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Thumbnail-cache sizes probed when the original media path no longer
/// answers, largest first.
const CACHE_SIZES: [&str; 3] = ["1200x1200", "600x600", "200x200"];

/// Extensions tried per cache size. The original extension is probed
/// before any substitute.
const CACHE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Maps raw legacy media paths to live URLs. The legacy store kept gallery
/// paths relative to a media root and frequently dropped the originals
/// while the resized thumbnail cache survived, so resolution walks the
/// original first and then the cache variants.
pub struct ImageResolver {
    fetcher: Arc<ImageFetcher>,
    media_base: Url,
    placeholder_url: String,
}

impl ImageResolver {
    pub fn new(
        fetcher: Arc<ImageFetcher>,
        media_base_url: &str,
        placeholder_url: &str,
    ) -> Result<Self, ImageError> {
        let media_base = Url::parse(media_base_url).map_err(|e| ImageError::BadUrl {
            raw: media_base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(ImageResolver {
            fetcher,
            media_base,
            placeholder_url: placeholder_url.to_string(),
        })
    }

    pub fn placeholder_url(&self) -> &str {
        &self.placeholder_url
    }

    /// Absolute URL for a raw gallery path. Relative paths are joined onto
    /// the media base segment by segment so spaces and other reserved
    /// characters get percent-encoded.
    pub fn absolute_url(&self, raw: &str) -> Result<Url, ImageError> {
        if let Ok(url) = Url::parse(raw) {
            return Ok(url);
        }
        self.joined_url(raw, &[])
    }

    fn joined_url(&self, raw: &str, prefix: &[&str]) -> Result<Url, ImageError> {
        let mut url = self.media_base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| ImageError::BadUrl {
                raw: raw.to_string(),
                reason: "media base URL cannot carry a path".to_string(),
            })?;
            segments.pop_if_empty();
            segments.extend(prefix.iter().copied());
            segments.extend(raw.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    /// Cache fallbacks for a relative gallery path. Absolute raw URLs get
    /// none; the cache layout only exists under our own media root.
    fn cache_candidates(&self, raw: &str) -> Vec<Url> {
        if Url::parse(raw).is_ok() {
            return Vec::new();
        }

        let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file, dirs)) = segments.split_last() else {
            return Vec::new();
        };
        let (stem, ext) = match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_ascii_lowercase()),
            _ => (*file, String::new()),
        };

        let mut extensions: Vec<&str> = Vec::with_capacity(CACHE_EXTENSIONS.len());
        if !ext.is_empty() {
            extensions.push(&ext);
        }
        for candidate in CACHE_EXTENSIONS {
            if candidate != ext {
                extensions.push(candidate);
            }
        }

        let mut candidates = Vec::new();
        for size in CACHE_SIZES {
            for extension in &extensions {
                let relative = if dirs.is_empty() {
                    format!("{stem}.{extension}")
                } else {
                    format!("{}/{stem}.{extension}", dirs.join("/"))
                };
                if let Ok(url) = self.joined_url(&relative, &["cache", size]) {
                    candidates.push(url);
                }
            }
        }
        candidates
    }

    /// Probes the original URL, then the cache variants in order, and
    /// falls back to the placeholder when nothing answers with an image.
    /// Every probed URL is recorded for diagnostics.
    pub async fn resolve(&self, raw: &str) -> Result<ResolvedImage, ImageError> {
        let original = self.absolute_url(raw)?;
        let mut attempted = Vec::new();

        let mut candidates = vec![(original, ResolveReason::Original)];
        candidates.extend(
            self.cache_candidates(raw)
                .into_iter()
                .map(|url| (url, ResolveReason::CacheFallback)),
        );

        for (url, reason) in candidates {
            let url = url.to_string();
            attempted.push(url.clone());
            match self.fetcher.probe(&url).await {
                Ok(true) => {
                    return Ok(ResolvedImage {
                        raw_url: raw.to_string(),
                        resolved_url: url,
                        reason,
                        attempted_urls: attempted,
                        checksum: None,
                    });
                }
                Ok(false) => {}
                Err(err) => debug!(url, error = %err, "Probe failed, trying next candidate"),
            }
        }

        Ok(ResolvedImage::placeholder(
            raw,
            &self.placeholder_url,
            attempted,
        ))
    }
}
