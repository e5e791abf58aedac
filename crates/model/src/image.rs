use serde::{Deserialize, Serialize};

/// Why a resolution produced the URL it did.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveReason {
    /// The original URL answered the probe.
    Original,
    /// A thumbnail-cache fallback candidate answered instead.
    CacheFallback,
    /// Nothing answered; the placeholder was substituted.
    Placeholder,
}

/// Outcome of resolving one raw image reference. The full attempt list is
/// kept for diagnostics; checksum is the identity used for deduplication.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub raw_url: String,
    pub resolved_url: String,
    pub reason: ResolveReason,
    pub attempted_urls: Vec<String>,
    pub checksum: Option<String>,
}

impl ResolvedImage {
    pub fn placeholder(raw_url: &str, placeholder_url: &str, attempted: Vec<String>) -> Self {
        ResolvedImage {
            raw_url: raw_url.to_string(),
            resolved_url: placeholder_url.to_string(),
            reason: ResolveReason::Placeholder,
            attempted_urls: attempted,
            checksum: None,
        }
    }
}

/// An image that finished the pipeline: resolved, deduplicated, uploaded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub checksum: Option<String>,
    /// True when the checksum short-circuited to a previous upload.
    pub deduplicated: bool,
}
