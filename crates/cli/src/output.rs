use crate::error::CliError;
use model::{checkpoint::MigrationCheckpoint, job::Job};

pub fn print_job(job: &Job) {
    println!("Job {}", job.id);
    println!("-----------------------------");
    println!("{:<14} {}", "Kind", job.kind);
    println!("{:<14} {}", "Status", job.status);
    println!("{:<14} {}", "Created", job.created_at.to_rfc3339());
    if let Some(started) = job.started_at {
        println!("{:<14} {}", "Started", started.to_rfc3339());
    }
    if let Some(finished) = job.finished_at {
        println!("{:<14} {}", "Finished", finished.to_rfc3339());
    }
    let total = job
        .progress
        .total
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());
    println!("{:<14} {}/{}", "Progress", job.progress.current, total);
    if let Some(message) = &job.progress.message {
        println!("{:<14} {}", "Message", message);
    }
    if !job.errors.is_empty() {
        println!("{:<14} {}", "Errors", job.errors.len());
        for entry in job.errors.iter().take(5) {
            let context = entry.context.as_deref().unwrap_or("-");
            println!("  [{}] {}: {}", entry.at.to_rfc3339(), context, entry.message);
        }
    }
    for (name, value) in &job.artifacts {
        println!("{:<14} {name} = {value}", "Artifact");
    }
}

pub fn print_checkpoint(cp: &MigrationCheckpoint) {
    println!("Migration summary");
    println!("-----------------------------");
    println!("{:<18} {}", "Processed", cp.processed);
    println!("{:<18} {}", "Succeeded", cp.succeeded);
    println!("{:<18} {}", "Failed", cp.failed);
    println!("{:<18} {}", "Images uploaded", cp.images_uploaded);
    println!("{:<18} {}", "Images failed", cp.images_failed);
    println!("{:<18} {}", "Last record id", cp.last_source_record_id);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)?;
    println!("{json}");
    Ok(())
}
