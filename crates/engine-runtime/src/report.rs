use crate::error::ExportError;
use model::{checkpoint::MigrationCheckpoint, job::Job};
use serde_json::{Value, json};

/// Error entries are sampled into the report; the full log stays on the
/// job document.
const MAX_REPORT_ERRORS: usize = 50;

/// Summary report for a migration (or any other) job. Serialized as the
/// report document and rendered on demand by the control API.
pub fn migration_report(job: &Job, checkpoint: Option<&MigrationCheckpoint>) -> Value {
    let counters = checkpoint.map(|cp| {
        json!({
            "processed": cp.processed,
            "succeeded": cp.succeeded,
            "failed": cp.failed,
            "images_uploaded": cp.images_uploaded,
            "images_failed": cp.images_failed,
            "last_source_record_id": cp.last_source_record_id,
        })
    });

    let errors: Vec<Value> = job
        .errors
        .iter()
        .take(MAX_REPORT_ERRORS)
        .map(|e| {
            json!({
                "at": e.at.to_rfc3339(),
                "message": e.message,
                "context": e.context,
            })
        })
        .collect();

    json!({
        "job": {
            "id": job.id,
            "kind": job.kind.to_string(),
            "status": job.status.to_string(),
            "created_at": job.created_at.to_rfc3339(),
            "started_at": job.started_at.map(|t| t.to_rfc3339()),
            "finished_at": job.finished_at.map(|t| t.to_rfc3339()),
        },
        "progress": {
            "total": job.progress.total,
            "current": job.progress.current,
            "message": job.progress.message,
        },
        "counters": counters,
        "errors": errors,
        "errors_total": job.errors.len(),
        "artifacts": job.artifacts,
    })
}

/// Flat CSV rendering: `section,field,value` rows for the scalar
/// sections, one row per sampled error.
pub fn to_csv(report: &Value) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["section", "field", "value"])?;

    for section in ["job", "progress", "counters", "artifacts"] {
        if let Some(fields) = report.get(section).and_then(Value::as_object) {
            for (field, value) in fields {
                writer.write_record([section, field, &scalar(value)])?;
            }
        }
    }
    if let Some(errors) = report.get("errors").and_then(Value::as_array) {
        for entry in errors {
            let context = entry
                .get("context")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let message = entry
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            writer.write_record(["error", context, message])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(std::io::Error::other(e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::job::{JobErrorEntry, JobKind, JobStatus};

    fn job_with_errors() -> Job {
        let mut job = Job::new(JobKind::Migrate, Value::Null);
        job.status = JobStatus::Completed;
        job.errors.push(JobErrorEntry {
            at: chrono::Utc::now(),
            message: "api rejected, \"bad\" payload".into(),
            context: Some("record 7".into()),
        });
        job.artifacts
            .insert("report".into(), "reports/abc.json".into());
        job
    }

    #[test]
    fn report_carries_counters_and_sampled_errors() {
        let mut cp = MigrationCheckpoint::new("j");
        cp.record_success(10);
        cp.record_failure(11);

        let report = migration_report(&job_with_errors(), Some(&cp));

        assert_eq!(report["counters"]["processed"], 2);
        assert_eq!(report["counters"]["failed"], 1);
        assert_eq!(report["errors_total"], 1);
        assert_eq!(report["errors"][0]["context"], "record 7");
        assert_eq!(report["job"]["status"], "completed");
    }

    #[test]
    fn csv_rendering_escapes_embedded_delimiters() {
        let report = migration_report(&job_with_errors(), None);
        let csv = to_csv(&report).unwrap();

        assert!(csv.starts_with("section,field,value\n"));
        // The error message contains a comma and quotes, so it must be
        // quoted with doubled inner quotes.
        assert!(csv.contains("\"api rejected, \"\"bad\"\" payload\""));
        assert!(csv.contains("artifacts,report,reports/abc.json"));
    }
}
