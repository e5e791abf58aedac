use crate::{error::ConfigError, retry::RetryPolicy};
use std::{env, time::Duration};

/// Runtime configuration, read once from the environment and passed into
/// the constructors that need it. Nothing here is global mutable state.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// MySQL connection string for the legacy storefront.
    pub source_database_url: String,
    /// Base URL of the target commerce admin API.
    pub commerce_api_url: String,
    /// Bearer token for the commerce admin API.
    pub commerce_api_token: String,
    /// Base URL of the blob store uploads go to.
    pub blob_store_url: String,
    /// Key prefix for uploaded objects.
    pub blob_key_prefix: String,
    /// Base URL for resolving relative legacy media paths.
    pub media_base_url: String,
    /// Substituted when every resolution attempt for an image fails.
    pub placeholder_image_url: String,
    pub currency_code: String,
    /// Permits for the shared image-pipeline limiter.
    pub image_workers: usize,
    pub batch_size: u32,
    pub retry_max_attempts: usize,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(RuntimeConfig {
            source_database_url: required("SOURCE_DATABASE_URL")?,
            commerce_api_url: required("COMMERCE_API_URL")?,
            commerce_api_token: required("COMMERCE_API_TOKEN")?,
            blob_store_url: required("BLOB_STORE_URL")?,
            blob_key_prefix: optional("BLOB_KEY_PREFIX", "catalog"),
            media_base_url: required("SOURCE_MEDIA_BASE_URL")?,
            placeholder_image_url: optional(
                "PLACEHOLDER_IMAGE_URL",
                "https://placehold.co/600x600.png",
            ),
            currency_code: optional("CURRENCY_CODE", "EUR"),
            image_workers: parsed("IMAGE_WORKERS", 4)?,
            batch_size: parsed("BATCH_SIZE", 50)?,
            retry_max_attempts: parsed("RETRY_MAX_ATTEMPTS", 3)?,
            retry_base_delay: Duration::from_millis(parsed("RETRY_BASE_DELAY_MS", 200u64)?),
            request_timeout: Duration::from_secs(parsed("REQUEST_TIMEOUT_SECS", 30u64)?),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            self.retry_base_delay,
            Duration::from_secs(5),
        )
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::MissingVar(var))
}

fn optional(var: &'static str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(default),
    }
}
