use crate::{
    error::{MigrationError, RecordError},
    migration::entities::EntityCache,
    report,
};
use chrono::Utc;
use connectors::{
    commerce::{CommerceApi, EntityKind},
    source::SourceStore,
};
use engine_core::{jobs::JobService, retry::RetryPolicy, state::StateStore};
use engine_processing::{
    images::pipeline::ImagePipeline,
    retry::classify,
    transform::{
        payload::{self, ResolvedReferences},
        taxonomy, text,
    },
};
use model::{
    checkpoint::MigrationCheckpoint,
    image::ResolveReason,
    job::{JobKind, JobProgress, JobStatus},
    record::{CategoryNode, SourceRecord},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct MigrateOptions {
    /// Continue strictly after the cursor of the most recent persisted
    /// checkpoint instead of starting from the beginning.
    pub resume_from_checkpoint: bool,
    /// Extract, transform and resolve images, but upload and create
    /// nothing at the target.
    pub dry_run: bool,
    /// DESTRUCTIVE: delete any existing target product with the computed
    /// handle before creating the replacement. Without this flag re-runs
    /// create new products under uniquified handles.
    pub reseed: bool,
    pub batch_size: Option<u32>,
    /// Stop cleanly after this many records, mid-batch if necessary.
    pub max_products: Option<u64>,
    /// Extract through the field mapping persisted by this discovery job
    /// instead of the default column layout.
    pub mapping_job_id: Option<String>,
    /// Extract through a field mapping read from this JSON file. Mutually
    /// exclusive with `mapping_job_id`.
    pub mapping_path: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ImageStats {
    uploaded: u32,
    failed: u32,
}

struct RunOutcome {
    checkpoint: MigrationCheckpoint,
    cancelled: bool,
}

/// Drives one migration job end to end: initialization, sequential
/// batch/record loop, per-record checkpointing and progress, terminal
/// status and report. Owns all per-job mutable state (entity cache,
/// image pipeline dedup map, checkpoint); construct one per job.
pub struct MigrationOrchestrator {
    source: Arc<dyn SourceStore>,
    commerce: Arc<dyn CommerceApi>,
    images: Arc<ImagePipeline>,
    state: Arc<dyn StateStore>,
    jobs: JobService,
    retry: RetryPolicy,
    currency_code: String,
    default_batch_size: u32,
}

impl MigrationOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn SourceStore>,
        commerce: Arc<dyn CommerceApi>,
        images: Arc<ImagePipeline>,
        state: Arc<dyn StateStore>,
        jobs: JobService,
        retry: RetryPolicy,
        currency_code: &str,
        default_batch_size: u32,
    ) -> Self {
        MigrationOrchestrator {
            source,
            commerce,
            images,
            state,
            jobs,
            retry,
            currency_code: currency_code.to_string(),
            default_batch_size: default_batch_size.max(1),
        }
    }

    pub async fn run(
        &self,
        job_id: &str,
        options: MigrateOptions,
        cancel: CancellationToken,
    ) -> Result<MigrationCheckpoint, MigrationError> {
        self.jobs.set_status(job_id, JobStatus::Running).await?;

        match self.execute(job_id, &options, &cancel).await {
            Ok(outcome) => {
                let status = if outcome.cancelled {
                    JobStatus::Cancelled
                } else {
                    JobStatus::Completed
                };
                let job = self.jobs.set_status(job_id, status).await?;
                let summary = report::migration_report(&job, Some(&outcome.checkpoint));
                self.state.save_report(job_id, &summary).await?;
                info!(
                    job_id,
                    status = %status,
                    processed = outcome.checkpoint.processed,
                    succeeded = outcome.checkpoint.succeeded,
                    failed = outcome.checkpoint.failed,
                    "Migration finished"
                );
                Ok(outcome.checkpoint)
            }
            Err(err) => {
                if let Err(log_err) = self
                    .jobs
                    .append_error(job_id, err.to_string(), None)
                    .await
                {
                    warn!(job_id, error = %log_err, "Could not record job error");
                }
                if let Err(status_err) = self.jobs.set_status(job_id, JobStatus::Failed).await {
                    warn!(job_id, error = %status_err, "Could not mark job failed");
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        job_id: &str,
        options: &MigrateOptions,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, MigrationError> {
        let batch_size = options.batch_size.unwrap_or(self.default_batch_size).max(1);

        // No record can be created without the singleton prerequisites, so
        // a failure here aborts the whole job.
        let sales_channel_id = if options.dry_run {
            "dry-run".to_string()
        } else {
            let location = self
                .retry
                .run(|| self.commerce.default_stock_location(), classify)
                .await
                .map_err(|e| MigrationError::Init(e.into_inner()))?;
            let channel = self
                .retry
                .run(|| self.commerce.default_sales_channel(), classify)
                .await
                .map_err(|e| MigrationError::Init(e.into_inner()))?;
            info!(location = %location.name, channel = %channel.name, "Resolved target prerequisites");
            channel.id
        };

        let tree = self
            .retry
            .run(|| self.source.load_category_tree(), classify)
            .await
            .map_err(|e| MigrationError::Connector(e.into_inner()))?;
        let total = self.source.count_records().await?;

        let mut checkpoint = MigrationCheckpoint::new(job_id);
        if options.resume_from_checkpoint {
            let prior = self
                .latest_checkpoint()
                .await?
                .ok_or(MigrationError::NoCheckpoint)?;
            info!(
                cursor = prior.last_source_record_id,
                processed = prior.processed,
                "Resuming after prior checkpoint"
            );
            checkpoint.last_source_record_id = prior.last_source_record_id;
            checkpoint.processed = prior.processed;
            checkpoint.succeeded = prior.succeeded;
            checkpoint.failed = prior.failed;
            checkpoint.images_uploaded = prior.images_uploaded;
            checkpoint.images_failed = prior.images_failed;
        }

        self.jobs
            .merge_progress(
                job_id,
                JobProgress {
                    total: Some(total),
                    current: checkpoint.processed,
                    message: Some("starting".to_string()),
                },
            )
            .await?;

        let mut cache = EntityCache::new(self.commerce.clone(), self.retry.clone());
        // Re-runs create new products under uniquified handles unless the
        // caller opted into destructive reseeding.
        let handle_suffix =
            (!options.reseed).then(|| text::base36_suffix(Utc::now().timestamp()));

        let mut processed_this_run = 0u64;
        let mut cancelled = false;
        let mut exhausted = false;

        'batches: while !exhausted {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let cursor = checkpoint.last_source_record_id;
            let batch = self
                .retry
                .run(|| self.source.fetch_batch(cursor, batch_size), classify)
                .await
                .map_err(|e| MigrationError::Connector(e.into_inner()))?;
            exhausted = batch.is_exhausted(batch_size);

            for record in &batch.records {
                // Stop requests are honored at record boundaries only.
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'batches;
                }
                if let Some(max) = options.max_products
                    && processed_this_run >= max
                {
                    info!(max, "Record limit reached, stopping cleanly");
                    break 'batches;
                }

                let record_id = record.id;
                match self
                    .process_record(
                        record,
                        &tree,
                        &mut cache,
                        &sales_channel_id,
                        options,
                        handle_suffix.as_deref(),
                    )
                    .await
                {
                    Ok(images) => {
                        checkpoint.record_success(record_id);
                        checkpoint
                            .add_image_counts(images.uploaded as u64, images.failed as u64);
                    }
                    Err(err) => {
                        warn!(record_id, error = %err, "Record failed, continuing");
                        self.jobs
                            .append_error(
                                job_id,
                                err.to_string(),
                                Some(format!("record {record_id}")),
                            )
                            .await?;
                        checkpoint.record_failure(record_id);
                    }
                }
                processed_this_run += 1;

                self.state.save_checkpoint(&checkpoint).await?;
                self.jobs
                    .merge_progress(
                        job_id,
                        JobProgress {
                            total: None,
                            current: checkpoint.processed,
                            message: Some(format!("record {record_id}")),
                        },
                    )
                    .await?;
            }
        }

        Ok(RunOutcome {
            checkpoint,
            cancelled,
        })
    }

    /// One record's full pipeline: taxonomy and reference entities, image
    /// set, payload assembly, create. Failures here are per-record.
    async fn process_record(
        &self,
        record: &SourceRecord,
        tree: &HashMap<u64, CategoryNode>,
        cache: &mut EntityCache,
        sales_channel_id: &str,
        options: &MigrateOptions,
        handle_suffix: Option<&str>,
    ) -> Result<ImageStats, RecordError> {
        let mut refs = ResolvedReferences {
            sales_channel_id: sales_channel_id.to_string(),
            ..Default::default()
        };
        let mut primary_path: Option<Vec<String>> = None;

        if record.categories.is_empty() {
            if let Some(trail) = taxonomy::keyword_trail(&record.name) {
                debug!(record_id = record.id, trail = ?trail, "Keyword category fallback");
                if !options.dry_run {
                    let ids = cache.ensure_category_path(&trail).await?;
                    if let Some(leaf) = ids.last() {
                        refs.category_ids.push(leaf.clone());
                    }
                }
                primary_path = Some(trail);
            }
        } else {
            let primary_id = taxonomy::primary_category(&record.categories)
                .map(|assoc| assoc.category_id);
            for assoc in &record.categories {
                let path = taxonomy::category_path(tree, assoc.category_id);
                if path.is_empty() {
                    continue;
                }
                if primary_id == Some(assoc.category_id) {
                    primary_path = Some(path.clone());
                }
                if !options.dry_run {
                    let ids = cache.ensure_category_path(&path).await?;
                    if let Some(leaf) = ids.last()
                        && !refs.category_ids.contains(leaf)
                    {
                        refs.category_ids.push(leaf.clone());
                    }
                }
            }
        }

        if !options.dry_run {
            // The leaf of the primary path doubles as the product type.
            if let Some(type_name) = primary_path.as_ref().and_then(|p| p.last()) {
                refs.type_id =
                    Some(cache.upsert(EntityKind::ProductType, type_name, None).await?);
            }
            if let Some(brand) = &record.brand {
                refs.collection_id =
                    Some(cache.upsert(EntityKind::Collection, brand, None).await?);
            }
            for tag in &record.tags {
                let id = cache.upsert(EntityKind::Tag, tag, None).await?;
                if !refs.tag_ids.contains(&id) {
                    refs.tag_ids.push(id);
                }
            }
        }

        let (image_urls, stats) = if options.dry_run {
            let resolved = self.images.resolve_only(record).await;
            let failed = resolved
                .iter()
                .filter(|r| r.reason == ResolveReason::Placeholder)
                .count() as u32;
            let mut urls: Vec<String> = resolved
                .iter()
                .filter(|r| r.reason != ResolveReason::Placeholder)
                .map(|r| r.resolved_url.clone())
                .collect();
            if urls.is_empty() {
                urls.push(self.images.placeholder_url().to_string());
            }
            (urls, ImageStats { uploaded: 0, failed })
        } else {
            let outcome = self.images.process(record).await;
            let stats = ImageStats {
                uploaded: outcome.uploaded,
                failed: outcome.failed,
            };
            (outcome.urls, stats)
        };

        let payload = payload::assemble(
            record,
            &image_urls,
            refs,
            &self.currency_code,
            Utc::now(),
            handle_suffix,
        )?;

        if options.dry_run {
            debug!(record_id = record.id, handle = %payload.handle, "Dry run, skipping create");
            return Ok(stats);
        }

        if options.reseed
            && let Some(existing) = self
                .retry
                .run(|| self.commerce.find_product_by_handle(&payload.handle), classify)
                .await
                .map_err(|e| e.into_inner())?
        {
            warn!(
                record_id = record.id,
                handle = %payload.handle,
                product_id = %existing,
                "Reseed: deleting existing product"
            );
            self.retry
                .run(|| self.commerce.delete_product(&existing), classify)
                .await
                .map_err(|e| e.into_inner())?;
        }

        let product_id = self
            .retry
            .run(|| self.commerce.create_product(&payload), classify)
            .await
            .map_err(|e| e.into_inner())?;
        info!(
            record_id = record.id,
            product_id = %product_id,
            handle = %payload.handle,
            "Created product"
        );
        Ok(stats)
    }

    /// Most recent persisted migration checkpoint, if any. Jobs are listed
    /// newest-first by the store.
    async fn latest_checkpoint(&self) -> Result<Option<MigrationCheckpoint>, MigrationError> {
        for job in self.jobs.list().await? {
            if job.kind != JobKind::Migrate {
                continue;
            }
            if let Some(cp) = self.state.load_checkpoint(&job.id).await? {
                return Ok(Some(cp));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connectors::{
        blob::HttpBlobStore,
        commerce::EntityRef,
        error::ConnectorError,
        images::ImageFetcher,
        source::TablePage,
    };
    use engine_core::state::sled_store::SledStateStore;
    use engine_processing::images::resolver::ImageResolver;
    use model::{
        mapping::DiscoveredTable,
        payload::TargetPayload,
        record::{CategoryAssociation, RecordBatch},
    };
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeSource {
        records: Vec<SourceRecord>,
        tree: HashMap<u64, CategoryNode>,
        cursors: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl SourceStore for FakeSource {
        async fn fetch_batch(
            &self,
            cursor: u64,
            limit: u32,
        ) -> Result<RecordBatch, ConnectorError> {
            self.cursors.lock().unwrap().push(cursor);
            let records: Vec<SourceRecord> = self
                .records
                .iter()
                .filter(|r| r.id > cursor)
                .take(limit as usize)
                .cloned()
                .collect();
            let next_cursor = records.last().map(|r| r.id).unwrap_or(cursor);
            Ok(RecordBatch {
                records,
                next_cursor,
            })
        }

        async fn count_records(&self) -> Result<u64, ConnectorError> {
            Ok(self.records.len() as u64)
        }

        async fn load_category_tree(
            &self,
        ) -> Result<HashMap<u64, CategoryNode>, ConnectorError> {
            Ok(self.tree.clone())
        }

        async fn list_tables(&self) -> Result<Vec<DiscoveredTable>, ConnectorError> {
            unimplemented!()
        }
        async fn table_ddl(&self, _table: &str) -> Result<String, ConnectorError> {
            unimplemented!()
        }
        async fn fetch_page(
            &self,
            _table: &str,
            _offset: u64,
            _limit: u32,
        ) -> Result<TablePage, ConnectorError> {
            unimplemented!()
        }
    }

    #[derive(Default)]
    struct FakeCommerce {
        entities: Mutex<Vec<(EntityKind, String, Option<String>, String)>>,
        products: Mutex<Vec<TargetPayload>>,
        existing_handles: Mutex<HashMap<String, String>>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommerceApi for FakeCommerce {
        async fn default_sales_channel(&self) -> Result<EntityRef, ConnectorError> {
            Ok(EntityRef {
                id: "sc_default".into(),
                name: "Default".into(),
            })
        }

        async fn default_stock_location(&self) -> Result<EntityRef, ConnectorError> {
            Ok(EntityRef {
                id: "loc_default".into(),
                name: "Warehouse".into(),
            })
        }

        async fn find_entity(
            &self,
            kind: EntityKind,
            name: &str,
            parent_id: Option<&str>,
        ) -> Result<Option<EntityRef>, ConnectorError> {
            Ok(self
                .entities
                .lock()
                .unwrap()
                .iter()
                .find(|(k, n, p, _)| {
                    *k == kind
                        && n.eq_ignore_ascii_case(name)
                        && p.as_deref() == parent_id
                })
                .map(|(_, n, _, id)| EntityRef {
                    id: id.clone(),
                    name: n.clone(),
                }))
        }

        async fn create_entity(
            &self,
            kind: EntityKind,
            name: &str,
            parent_id: Option<&str>,
        ) -> Result<EntityRef, ConnectorError> {
            let mut entities = self.entities.lock().unwrap();
            let id = format!("ent_{}", entities.len() + 1);
            entities.push((
                kind,
                name.to_string(),
                parent_id.map(|p| p.to_string()),
                id.clone(),
            ));
            Ok(EntityRef {
                id,
                name: name.to_string(),
            })
        }

        async fn find_product_by_handle(
            &self,
            handle: &str,
        ) -> Result<Option<String>, ConnectorError> {
            Ok(self.existing_handles.lock().unwrap().get(handle).cloned())
        }

        async fn create_product(
            &self,
            payload: &TargetPayload,
        ) -> Result<String, ConnectorError> {
            let mut products = self.products.lock().unwrap();
            products.push(payload.clone());
            Ok(format!("prod_{}", products.len()))
        }

        async fn delete_product(&self, product_id: &str) -> Result<(), ConnectorError> {
            self.deleted.lock().unwrap().push(product_id.to_string());
            Ok(())
        }
    }

    fn record(id: u64, name: &str, price: f64) -> SourceRecord {
        SourceRecord {
            id,
            sku: format!("SKU-{id}"),
            name: name.to_string(),
            brand: Some("Acme".into()),
            regular_price: price,
            categories: vec![CategoryAssociation {
                category_id: 11,
                depth: 2,
                sort_order: 1,
                is_main: true,
            }],
            tags: vec!["steel".into()],
            ..Default::default()
        }
    }

    fn tree() -> HashMap<u64, CategoryNode> {
        let mut tree = HashMap::new();
        tree.insert(
            10,
            CategoryNode {
                id: 10,
                name: "Kitchen".into(),
                parent_id: None,
                depth: 1,
                sort_order: 1,
            },
        );
        tree.insert(
            11,
            CategoryNode {
                id: 11,
                name: "Cookware".into(),
                parent_id: Some(10),
                depth: 2,
                sort_order: 1,
            },
        );
        tree
    }

    struct Harness {
        orchestrator: MigrationOrchestrator,
        commerce: Arc<FakeCommerce>,
        source: Arc<FakeSource>,
        jobs: JobService,
        state: Arc<dyn StateStore>,
        _dir: tempfile::TempDir,
    }

    fn harness(records: Vec<SourceRecord>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let state: Arc<dyn StateStore> =
            Arc::new(SledStateStore::open(dir.path()).expect("open sled"));
        let jobs = JobService::new(state.clone());
        let source = Arc::new(FakeSource {
            records,
            tree: tree(),
            cursors: Mutex::new(Vec::new()),
        });
        let commerce = Arc::new(FakeCommerce::default());

        let fetcher = Arc::new(ImageFetcher::new(Duration::from_millis(100)).unwrap());
        let resolver = Arc::new(
            ImageResolver::new(
                fetcher.clone(),
                "http://127.0.0.1:9",
                "https://cdn.example/placeholder.png",
            )
            .unwrap(),
        );
        let blob =
            Arc::new(HttpBlobStore::new("http://127.0.0.1:9", Duration::from_millis(100)).unwrap());
        let images = Arc::new(ImagePipeline::new(
            fetcher,
            blob,
            resolver,
            2,
            RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1)),
            "catalog",
        ));

        let orchestrator = MigrationOrchestrator::new(
            source.clone(),
            commerce.clone(),
            images,
            state.clone(),
            jobs.clone(),
            RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1)),
            "EUR",
            2,
        );
        Harness {
            orchestrator,
            commerce,
            source,
            jobs,
            state,
            _dir: dir,
        }
    }

    async fn start_job(h: &Harness) -> String {
        h.jobs
            .create(JobKind::Migrate, serde_json::Value::Null)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn processes_every_record_and_checkpoints() {
        let h = harness((1..=5).map(|i| record(i, &format!("Pan {i}"), 10.0)).collect());
        let job_id = start_job(&h).await;

        let cp = h
            .orchestrator
            .run(&job_id, MigrateOptions::default(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(cp.processed, 5);
        assert_eq!(cp.succeeded, 5);
        assert_eq!(cp.last_source_record_id, 5);
        assert!(cp.is_consistent());

        let job = h.jobs.get(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress.total, Some(5));
        assert_eq!(job.progress.current, 5);

        let products = h.commerce.products.lock().unwrap();
        assert_eq!(products.len(), 5);
        // Default policy uniquifies handles with a suffix.
        assert!(products[0].handle.starts_with("pan-1-"));
        assert_eq!(products[0].type_id.is_some(), true);
        assert!(h.state.load_report(&job_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn repeated_tags_reference_one_id() {
        let mut records = vec![record(1, "Steel Pan", 10.0)];
        records[0].tags = vec!["steel".into(), "Steel".into(), "steel".into()];
        let h = harness(records);
        let job_id = start_job(&h).await;

        h.orchestrator
            .run(&job_id, MigrateOptions::default(), CancellationToken::new())
            .await
            .unwrap();

        let products = h.commerce.products.lock().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].tag_ids.len(), 1);
    }

    #[tokio::test]
    async fn record_failures_are_isolated() {
        let mut records: Vec<SourceRecord> =
            (1..=3).map(|i| record(i, &format!("Pan {i}"), 10.0)).collect();
        records[1].regular_price = 0.0;
        let h = harness(records);
        let job_id = start_job(&h).await;

        let cp = h
            .orchestrator
            .run(&job_id, MigrateOptions::default(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(cp.succeeded, 2);
        assert_eq!(cp.failed, 1);
        assert!(cp.is_consistent());

        let job = h.jobs.get(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.errors.len(), 1);
        assert_eq!(job.errors[0].context.as_deref(), Some("record 2"));
    }

    #[tokio::test]
    async fn max_products_stops_cleanly_mid_batch() {
        let h = harness((1..=5).map(|i| record(i, &format!("Pan {i}"), 10.0)).collect());
        let job_id = start_job(&h).await;

        let cp = h
            .orchestrator
            .run(
                &job_id,
                MigrateOptions {
                    max_products: Some(3),
                    ..Default::default()
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(cp.processed, 3);
        assert_eq!(cp.last_source_record_id, 3);
        let job = h.jobs.get(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn resume_continues_strictly_after_the_cursor() {
        let h = harness((1..=5).map(|i| record(i, &format!("Pan {i}"), 10.0)).collect());

        let first = start_job(&h).await;
        h.orchestrator
            .run(
                &first,
                MigrateOptions {
                    max_products: Some(3),
                    ..Default::default()
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let second = start_job(&h).await;
        let cp = h
            .orchestrator
            .run(
                &second,
                MigrateOptions {
                    resume_from_checkpoint: true,
                    ..Default::default()
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(cp.processed, 5);
        assert_eq!(cp.last_source_record_id, 5);
        // The resumed run's first fetch starts after the prior cursor.
        assert!(h.source.cursors.lock().unwrap().contains(&3));
        assert_eq!(h.commerce.products.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn resume_without_a_checkpoint_fails_the_job() {
        let h = harness(vec![record(1, "Pan", 10.0)]);
        let job_id = start_job(&h).await;

        let err = h
            .orchestrator
            .run(
                &job_id,
                MigrateOptions {
                    resume_from_checkpoint: true,
                    ..Default::default()
                },
                CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::NoCheckpoint));
        let job = h.jobs.get(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(!job.errors.is_empty());
    }

    #[tokio::test]
    async fn reseed_deletes_the_existing_product_first() {
        let h = harness(vec![record(1, "Steel Pan", 10.0)]);
        h.commerce
            .existing_handles
            .lock()
            .unwrap()
            .insert("steel-pan".to_string(), "prod_old".to_string());
        let job_id = start_job(&h).await;

        h.orchestrator
            .run(
                &job_id,
                MigrateOptions {
                    reseed: true,
                    ..Default::default()
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(*h.commerce.deleted.lock().unwrap(), vec!["prod_old"]);
        let products = h.commerce.products.lock().unwrap();
        // Reseed keeps the original handle instead of suffixing.
        assert_eq!(products[0].handle, "steel-pan");
    }

    #[tokio::test]
    async fn dry_run_creates_nothing_at_the_target() {
        let h = harness((1..=3).map(|i| record(i, &format!("Pan {i}"), 10.0)).collect());
        let job_id = start_job(&h).await;

        let cp = h
            .orchestrator
            .run(
                &job_id,
                MigrateOptions {
                    dry_run: true,
                    ..Default::default()
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(cp.succeeded, 3);
        assert!(h.commerce.products.lock().unwrap().is_empty());
        assert!(h.commerce.entities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pre_cancelled_job_stops_before_any_record() {
        let h = harness((1..=3).map(|i| record(i, &format!("Pan {i}"), 10.0)).collect());
        let job_id = start_job(&h).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let cp = h
            .orchestrator
            .run(&job_id, MigrateOptions::default(), cancel)
            .await
            .unwrap();

        assert_eq!(cp.processed, 0);
        let job = h.jobs.get(&job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
    }
}
