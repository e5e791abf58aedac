use crate::error::MigrationError;
use connectors::source::{SourceStore, discovery};
use engine_core::{jobs::JobService, state::StateStore};
use model::{
    job::{Job, JobKind, JobStatus},
    mapping::{DiscoveryResult, FieldMapping},
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct DiscoveryOutcome {
    pub job: Job,
    pub result: DiscoveryResult,
    pub mapping: FieldMapping,
}

/// Runs schema discovery synchronously under a tracked job: enumerate
/// tables, rank candidates, generate the default field mapping, persist
/// mapping and result keyed by the job.
pub async fn run(
    source: &dyn SourceStore,
    jobs: &JobService,
    state: &Arc<dyn StateStore>,
) -> Result<DiscoveryOutcome, MigrationError> {
    let job = jobs.create(JobKind::Discover, serde_json::Value::Null).await?;
    jobs.set_status(&job.id, JobStatus::Running).await?;

    let tables = match source.list_tables().await {
        Ok(tables) => tables,
        Err(err) => {
            warn!(job_id = %job.id, error = %err, "Discovery failed");
            jobs.append_error(&job.id, err.to_string(), None).await?;
            jobs.set_status(&job.id, JobStatus::Failed).await?;
            return Err(err.into());
        }
    };

    let (result, mapping) = discovery::rank_and_map(tables);
    state.save_mapping(&job.id, &mapping).await?;
    let report = serde_json::json!({
        "tables": result.tables.len(),
        "candidates": result.candidates,
        "mapping": mapping,
    });
    state.save_report(&job.id, &report).await?;

    let job = jobs.set_status(&job.id, JobStatus::Completed).await?;
    info!(
        job_id = %job.id,
        tables = result.tables.len(),
        candidates = result.candidates.len(),
        best = mapping.source_table.as_deref().unwrap_or("none"),
        "Discovery finished"
    );
    Ok(DiscoveryOutcome {
        job,
        result,
        mapping,
    })
}
