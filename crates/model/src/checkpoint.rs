use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resumable cursor plus counters for an in-progress migration job.
/// Persisted after every processed record, so a crash loses at most one
/// in-flight record. On resume, extraction continues strictly after
/// `last_source_record_id`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationCheckpoint {
    pub job_id: String,
    pub last_source_record_id: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub images_uploaded: u64,
    pub images_failed: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MigrationCheckpoint {
    pub fn new(job_id: &str) -> Self {
        MigrationCheckpoint {
            job_id: job_id.to_string(),
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, record_id: u64) {
        self.last_source_record_id = record_id;
        self.processed += 1;
        self.succeeded += 1;
        self.updated_at = Some(Utc::now());
    }

    pub fn record_failure(&mut self, record_id: u64) {
        self.last_source_record_id = record_id;
        self.processed += 1;
        self.failed += 1;
        self.updated_at = Some(Utc::now());
    }

    pub fn add_image_counts(&mut self, uploaded: u64, failed: u64) {
        self.images_uploaded += uploaded;
        self.images_failed += failed;
    }

    /// Consistency check: every processed record ended up in exactly one
    /// of the two outcome buckets.
    pub fn is_consistent(&self) -> bool {
        self.processed == self.succeeded + self.failed
    }
}
