use crate::error::ExportError;
use connectors::source::SourceStore;
use engine_core::{jobs::JobService, retry::RetryPolicy, state::StateStore};
use engine_processing::retry::classify;
use model::job::{JobProgress, JobStatus};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

fn default_page_size() -> u32 {
    500
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ExportOptions {
    pub tables: Vec<String>,
    /// Also write the CREATE TABLE statement per table.
    pub include_schema: bool,
    /// Gzip each artifact after it is written.
    pub compress: bool,
    pub page_size: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            tables: Vec::new(),
            include_schema: false,
            compress: false,
            page_size: default_page_size(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TableExport {
    pub table: String,
    pub rows: u64,
    pub path: String,
    /// blake3 of the artifact as written.
    pub checksum: String,
}

/// Point-in-time CSV backup of source tables. Pages are read with
/// LIMIT/OFFSET and each encoded page is written (and awaited) before the
/// next page is fetched, so the extractor never outruns the sink.
pub struct ExportEngine {
    source: Arc<dyn SourceStore>,
    jobs: JobService,
    state: Arc<dyn StateStore>,
    retry: RetryPolicy,
}

impl ExportEngine {
    pub fn new(
        source: Arc<dyn SourceStore>,
        jobs: JobService,
        state: Arc<dyn StateStore>,
        retry: RetryPolicy,
    ) -> Self {
        ExportEngine {
            source,
            jobs,
            state,
            retry,
        }
    }

    /// Streams one table through the CSV encoder into `sink`. The header
    /// row is written exactly once; the returned checksum covers the full
    /// byte stream.
    pub async fn export_table<W>(
        &self,
        table: &str,
        page_size: u32,
        sink: &mut W,
    ) -> Result<(u64, String), ExportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let page_size = page_size.max(1);
        let mut offset = 0u64;
        let mut rows_written = 0u64;
        let mut wrote_header = false;
        let mut hasher = blake3::Hasher::new();

        loop {
            let page = self
                .retry
                .run(|| self.source.fetch_page(table, offset, page_size), classify)
                .await
                .map_err(|e| e.into_inner())?;

            let mut encoder = csv::Writer::from_writer(Vec::new());
            if !wrote_header {
                encoder.write_record(&page.columns)?;
                wrote_header = true;
            }
            for row in &page.rows {
                encoder.write_record(row)?;
            }
            let bytes = encoder
                .into_inner()
                .map_err(|e| ExportError::Io(std::io::Error::other(e)))?;
            hasher.update(&bytes);
            // Await the sink before fetching more.
            sink.write_all(&bytes).await?;

            rows_written += page.rows.len() as u64;
            if (page.rows.len() as u32) < page_size {
                break;
            }
            offset += page.rows.len() as u64;
        }

        sink.flush().await?;
        Ok((rows_written, hasher.finalize().to_hex().to_string()))
    }

    /// Runs a full backup job: one CSV file per table under `output_dir`,
    /// optional DDL files, every artifact hashed and recorded on the job.
    /// Any table failure fails the whole job; a partial backup is not a
    /// backup.
    pub async fn run(
        &self,
        job_id: &str,
        options: &ExportOptions,
        output_dir: &Path,
    ) -> Result<Vec<TableExport>, ExportError> {
        self.jobs.set_status(job_id, JobStatus::Running).await?;

        match self.execute(job_id, options, output_dir).await {
            Ok(exports) => {
                let report = serde_json::json!({ "tables": &exports });
                if let Err(err) = self.state.save_report(job_id, &report).await {
                    warn!(job_id, error = %err, "Could not persist export report");
                }
                self.jobs.set_status(job_id, JobStatus::Completed).await?;
                info!(job_id, tables = exports.len(), "Export finished");
                Ok(exports)
            }
            Err(err) => {
                if let Err(log_err) =
                    self.jobs.append_error(job_id, err.to_string(), None).await
                {
                    warn!(job_id, error = %log_err, "Could not record job error");
                }
                if let Err(status_err) =
                    self.jobs.set_status(job_id, JobStatus::Failed).await
                {
                    warn!(job_id, error = %status_err, "Could not mark job failed");
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        options: &ExportOptions,
        output_dir: &Path,
    ) -> Result<Vec<TableExport>, ExportError> {
        tokio::fs::create_dir_all(output_dir).await?;
        self.jobs
            .merge_progress(
                job_id,
                JobProgress {
                    total: Some(options.tables.len() as u64),
                    current: 0,
                    message: Some("starting".to_string()),
                },
            )
            .await?;

        let mut exports = Vec::with_capacity(options.tables.len());
        for (index, table) in options.tables.iter().enumerate() {
            let csv_path = output_dir.join(format!("{table}.csv"));
            let mut file = tokio::fs::File::create(&csv_path).await?;
            let (rows, _) = self.export_table(table, options.page_size, &mut file).await?;
            drop(file);

            let artifact = self.finalize_artifact(csv_path, options.compress).await?;
            let checksum = hash_file(&artifact).await?;
            let name = artifact
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| table.clone());
            self.jobs
                .attach_artifact(job_id, &name, artifact.display().to_string())
                .await?;
            self.jobs
                .attach_artifact(job_id, format!("{name}.blake3"), &checksum)
                .await?;

            if options.include_schema {
                let ddl = self
                    .retry
                    .run(|| self.source.table_ddl(table), classify)
                    .await
                    .map_err(|e| e.into_inner())?;
                let sql_path = output_dir.join(format!("{table}.sql"));
                tokio::fs::write(&sql_path, format!("{ddl};\n")).await?;
                let sql_artifact = self.finalize_artifact(sql_path, options.compress).await?;
                let sql_hash = hash_file(&sql_artifact).await?;
                let sql_name = sql_artifact
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("{table}.sql"));
                self.jobs
                    .attach_artifact(job_id, &sql_name, sql_artifact.display().to_string())
                    .await?;
                self.jobs
                    .attach_artifact(job_id, format!("{sql_name}.blake3"), &sql_hash)
                    .await?;
            }

            info!(table, rows, artifact = %artifact.display(), "Exported table");
            exports.push(TableExport {
                table: table.clone(),
                rows,
                path: artifact.display().to_string(),
                checksum,
            });

            self.jobs
                .merge_progress(
                    job_id,
                    JobProgress {
                        total: None,
                        current: (index + 1) as u64,
                        message: Some(format!("table {table}")),
                    },
                )
                .await?;
        }

        Ok(exports)
    }

    /// Gzips the finished file in place when requested, returning the
    /// final artifact path.
    async fn finalize_artifact(
        &self,
        path: PathBuf,
        compress: bool,
    ) -> Result<PathBuf, ExportError> {
        if !compress {
            return Ok(path);
        }
        tokio::task::spawn_blocking(move || -> Result<PathBuf, ExportError> {
            let input = std::fs::File::open(&path)?;
            let gz_path = path.with_extension(format!(
                "{}.gz",
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default()
            ));
            let output = std::fs::File::create(&gz_path)?;
            let mut encoder =
                flate2::write::GzEncoder::new(output, flate2::Compression::default());
            let mut reader = std::io::BufReader::new(input);
            std::io::copy(&mut reader, &mut encoder)?;
            encoder.finish()?;
            std::fs::remove_file(&path)?;
            Ok(gz_path)
        })
        .await
        .map_err(|e| ExportError::Io(std::io::Error::other(e)))?
    }
}

async fn hash_file(path: &Path) -> Result<String, ExportError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
