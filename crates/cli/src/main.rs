use crate::{context::AppContext, error::CliError};
use clap::Parser;
use commands::Commands;
use connectors::{
    images::ImageFetcher,
    source::{SourceStore, mysql::MySqlSourceStore, schema::SourceSchema},
};
use engine_core::state::StateStore;
use engine_processing::images::{pipeline::ImagePipeline, resolver::ImageResolver};
use engine_runtime::{
    discovery,
    export::{ExportEngine, ExportOptions},
    migration::{self, MigrateOptions, MigrationOrchestrator},
};
use model::job::JobKind;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "caravel", version = "0.1.0", about = "Catalog migration tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr } => {
            let addr: SocketAddr = addr.parse().map_err(|_| CliError::InvalidAddr(addr))?;
            let ctx = AppContext::from_env().await?;
            let state = api::AppState {
                config: ctx.config,
                source: ctx.source,
                commerce: ctx.commerce,
                blob: ctx.blob,
                state: ctx.state,
                jobs: ctx.jobs,
                export_dir: context::default_export_dir()?,
                cancellations: Default::default(),
            };
            api::serve(addr, state).await?;
        }
        Commands::Discover { output } => {
            let ctx = AppContext::from_env().await?;
            let outcome = discovery::run(ctx.source.as_ref(), &ctx.jobs, &ctx.state).await?;
            let document = serde_json::json!({
                "job_id": outcome.job.id,
                "tables": outcome.result.tables.len(),
                "candidates": outcome.result.candidates,
                "mapping": outcome.mapping,
            });
            match output {
                Some(path) => {
                    let json = serde_json::to_string_pretty(&document)
                        .map_err(CliError::JsonSerialize)?;
                    tokio::fs::write(&path, json).await?;
                    info!(path = %path, "Discovery result written");
                }
                None => output::print_json(&document)?,
            }
        }
        Commands::Migrate {
            resume,
            dry_run,
            reseed,
            batch_size,
            max_products,
            mapping_job,
            mapping_file,
        } => {
            let options = MigrateOptions {
                resume_from_checkpoint: resume,
                dry_run,
                reseed,
                batch_size,
                max_products,
                mapping_job_id: mapping_job,
                mapping_path: mapping_file,
            };
            run_migration(options).await?;
        }
        Commands::Export {
            tables,
            schema,
            compress,
            output,
        } => {
            if tables.is_empty() {
                return Err(CliError::Unexpected(
                    "No tables specified; pass --tables a,b,c".into(),
                ));
            }
            let options = ExportOptions {
                tables,
                include_schema: schema,
                compress,
                ..Default::default()
            };
            run_export(options, output.map(PathBuf::from)).await?;
        }
        Commands::Job { id, json } => {
            show_job(&id, json).await?;
        }
    }

    Ok(())
}

async fn run_migration(options: MigrateOptions) -> Result<(), CliError> {
    let ctx = AppContext::from_env().await?;
    let params = serde_json::to_value(&options).map_err(CliError::JsonSerialize)?;
    let job = ctx.jobs.create(JobKind::Migrate, params).await?;
    info!(job_id = %job.id, "Starting migration");

    let mapping = match migration::resolve_mapping(&options, &ctx.state).await {
        Ok(mapping) => mapping,
        Err(err) => {
            // Unusable mapping is a fatal-init condition: fail the job.
            ctx.jobs.append_error(&job.id, err.to_string(), None).await?;
            ctx.jobs
                .set_status(&job.id, model::job::JobStatus::Failed)
                .await?;
            return Err(err.into());
        }
    };
    let source = match mapping {
        Some(mapping) => {
            let mapped = MySqlSourceStore::connect(
                &ctx.config.source_database_url,
                SourceSchema::with_mapping(&mapping),
                ctx.config.request_timeout,
            )
            .await?;
            Arc::new(mapped) as Arc<dyn SourceStore>
        }
        None => ctx.source.clone(),
    };

    let orchestrator = build_orchestrator(&ctx, source)?;
    let cancel = CancellationToken::new();
    shutdown::register_handlers(cancel.clone());

    let checkpoint = orchestrator.run(&job.id, options, cancel).await?;
    output::print_checkpoint(&checkpoint);
    Ok(())
}

async fn run_export(options: ExportOptions, output: Option<PathBuf>) -> Result<(), CliError> {
    let ctx = AppContext::from_env().await?;
    let params = serde_json::to_value(&options).map_err(CliError::JsonSerialize)?;
    let job = ctx.jobs.create(JobKind::Backup, params).await?;
    let output_dir = output.unwrap_or_else(|| PathBuf::from("./backup"));
    info!(job_id = %job.id, dir = %output_dir.display(), "Starting export");

    let engine = ExportEngine::new(
        ctx.source.clone(),
        ctx.jobs.clone(),
        ctx.state.clone(),
        ctx.config.retry_policy(),
    );
    let exports = engine.run(&job.id, &options, &output_dir).await?;

    println!("Exported {} table(s):", exports.len());
    for export in &exports {
        println!("  {:<24} {:>8} rows  {}", export.table, export.rows, export.path);
        println!("  {:<24} blake3 {}", "", export.checksum);
    }
    Ok(())
}

async fn show_job(id: &str, as_json: bool) -> Result<(), CliError> {
    let state = context::open_state_store()?;
    let jobs = engine_core::jobs::JobService::new(state.clone());
    let job = jobs.get(id).await?;

    if as_json {
        output::print_json(&job)?;
        return Ok(());
    }

    output::print_job(&job);
    if job.kind == JobKind::Migrate {
        if let Some(checkpoint) = state.load_checkpoint(id).await? {
            println!();
            output::print_checkpoint(&checkpoint);
        }
    }
    Ok(())
}

fn build_orchestrator(
    ctx: &AppContext,
    source: Arc<dyn SourceStore>,
) -> Result<MigrationOrchestrator, CliError> {
    let config = &ctx.config;
    let fetcher = Arc::new(ImageFetcher::new(config.request_timeout)?);
    let resolver = Arc::new(
        ImageResolver::new(
            fetcher.clone(),
            &config.media_base_url,
            &config.placeholder_image_url,
        )
        .map_err(|err| CliError::Unexpected(format!("Image resolver setup failed: {err}")))?,
    );
    let images = Arc::new(ImagePipeline::new(
        fetcher,
        ctx.blob.clone(),
        resolver,
        config.image_workers,
        config.retry_policy(),
        &config.blob_key_prefix,
    ));

    Ok(MigrationOrchestrator::new(
        source,
        ctx.commerce.clone(),
        images,
        ctx.state.clone(),
        ctx.jobs.clone(),
        config.retry_policy(),
        &config.currency_code,
        config.batch_size,
    ))
}
