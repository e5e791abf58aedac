use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// SKU/handle collisions from the target API, pattern-matched into a
    /// user-actionable kind instead of a generic failure.
    #[error("Duplicate {resource} at target: {detail}")]
    DuplicateConflict { resource: String, detail: String },

    #[error("Target API rejected the request ({status}): {body}")]
    ApiRejected { status: u16, body: String },

    #[error("URL does not serve an image (content-type {0})")]
    NotAnImage(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),
}

impl ConnectorError {
    /// True for failures worth another attempt under the retry policy.
    pub fn is_transient(&self) -> bool {
        match self {
            ConnectorError::Timeout(_) => true,
            ConnectorError::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err
                        .status()
                        .map(|s| s.is_server_error() || s.as_u16() == 429)
                        .unwrap_or(true)
            }
            ConnectorError::Database(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            ConnectorError::ApiRejected { status, .. } => *status >= 500 || *status == 429,
            ConnectorError::Io(_) => true,
            _ => false,
        }
    }
}
