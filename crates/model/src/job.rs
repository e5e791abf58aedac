use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Discover,
    Backup,
    Migrate,
    Report,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::Discover => "discover",
            JobKind::Backup => "backup",
            JobKind::Migrate => "migrate",
            JobKind::Report => "report",
        };
        f.write_str(name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses never transition anywhere else.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether a transition from `self` to `next` is allowed.
    /// Transitions are monotonic: queued -> running -> terminal.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            JobStatus::Queued => true,
            JobStatus::Running => next != JobStatus::Queued,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct JobProgress {
    pub total: Option<u64>,
    pub current: u64,
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JobErrorEntry {
    pub at: DateTime<Utc>,
    pub message: String,
    /// Identifier of the record/table the error relates to, when known.
    pub context: Option<String>,
}

/// One tracked unit of pipeline work. Owned by the job control plane;
/// created once, mutated through status/progress/error/artifact operations,
/// never deleted. The error log is append-only.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub progress: JobProgress,
    pub errors: Vec<JobErrorEntry>,
    /// Named outputs produced by the job (file paths, report ids, hashes).
    pub artifacts: HashMap<String, String>,
    /// Opaque input parameters the job was started with.
    pub params: serde_json::Value,
}

impl Job {
    pub fn new(kind: JobKind, params: serde_json::Value) -> Self {
        Job {
            id: Uuid::new_v4().to_string(),
            kind,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            progress: JobProgress::default(),
            errors: Vec::new(),
            artifacts: HashMap::new(),
            params,
        }
    }
}
