use connectors::error::ConnectorError;
use engine_core::retry::RetryDisposition;

/// Maps connector failures onto the retry policy: transport-level trouble
/// gets another attempt, rejections and conflicts bubble up immediately.
pub fn classify(err: &ConnectorError) -> RetryDisposition {
    if err.is_transient() {
        RetryDisposition::Retry
    } else {
        RetryDisposition::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn conflicts_and_rejections_are_fatal() {
        let dup = ConnectorError::DuplicateConflict {
            resource: "product".into(),
            detail: "handle already exists".into(),
        };
        let rejected = ConnectorError::ApiRejected {
            status: 422,
            body: "invalid payload".into(),
        };
        assert_eq!(classify(&dup), RetryDisposition::Stop);
        assert_eq!(classify(&rejected), RetryDisposition::Stop);
    }

    #[test]
    fn timeouts_retry() {
        let err = ConnectorError::Timeout(Duration::from_secs(30));
        assert_eq!(classify(&err), RetryDisposition::Retry);
    }
}
