pub mod entities;
pub mod orchestrator;

pub use orchestrator::{MigrateOptions, MigrationOrchestrator};

use crate::error::MigrationError;
use engine_core::state::StateStore;
use model::mapping::FieldMapping;
use std::sync::Arc;

/// Resolves the field mapping a migration should extract through, if any:
/// either the mapping persisted by a prior discovery job, or one read from
/// a JSON file. Asking for both is an error.
pub async fn resolve_mapping(
    options: &MigrateOptions,
    state: &Arc<dyn StateStore>,
) -> Result<Option<FieldMapping>, MigrationError> {
    match (&options.mapping_job_id, &options.mapping_path) {
        (Some(_), Some(_)) => Err(MigrationError::Mapping(
            "mapping_job_id and mapping_path are mutually exclusive".into(),
        )),
        (Some(job_id), None) => {
            let mapping = state.load_mapping(job_id).await?.ok_or_else(|| {
                MigrationError::Mapping(format!("No mapping stored for job {job_id}"))
            })?;
            Ok(Some(mapping))
        }
        (None, Some(path)) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .map_err(|err| MigrationError::Mapping(format!("Could not read {path}: {err}")))?;
            let mapping = serde_json::from_str(&raw)
                .map_err(|err| MigrationError::Mapping(format!("Could not parse {path}: {err}")))?;
            Ok(Some(mapping))
        }
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::state::sled_store::SledStateStore;
    use std::collections::BTreeMap;

    fn store() -> (tempfile::TempDir, Arc<dyn StateStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn StateStore> = Arc::new(SledStateStore::open(dir.path()).unwrap());
        (dir, store)
    }

    #[tokio::test]
    async fn loads_the_mapping_saved_by_a_discovery_job() {
        let (_dir, state) = store();
        let mapping = FieldMapping {
            fields: BTreeMap::from([("sku".to_string(), "item_code".to_string())]),
            source_table: Some("products_flat".to_string()),
        };
        state.save_mapping("job-1", &mapping).await.unwrap();

        let options = MigrateOptions {
            mapping_job_id: Some("job-1".to_string()),
            ..Default::default()
        };
        let resolved = resolve_mapping(&options, &state).await.unwrap();
        assert_eq!(resolved, Some(mapping));
    }

    #[tokio::test]
    async fn missing_mapping_and_conflicting_selectors_are_rejected() {
        let (_dir, state) = store();

        let options = MigrateOptions {
            mapping_job_id: Some("absent".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_mapping(&options, &state).await,
            Err(MigrationError::Mapping(_))
        ));

        let options = MigrateOptions {
            mapping_job_id: Some("a".to_string()),
            mapping_path: Some("b.json".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_mapping(&options, &state).await,
            Err(MigrationError::Mapping(_))
        ));
    }

    #[tokio::test]
    async fn reads_a_mapping_from_a_json_file() {
        let (_dir, state) = store();
        let file = tempfile::NamedTempFile::new().unwrap();
        let mapping = FieldMapping {
            fields: BTreeMap::from([("name".to_string(), "title".to_string())]),
            source_table: None,
        };
        std::fs::write(file.path(), serde_json::to_vec(&mapping).unwrap()).unwrap();

        let options = MigrateOptions {
            mapping_path: Some(file.path().to_string_lossy().into_owned()),
            ..Default::default()
        };
        let resolved = resolve_mapping(&options, &state).await.unwrap();
        assert_eq!(resolved, Some(mapping));
    }
}
