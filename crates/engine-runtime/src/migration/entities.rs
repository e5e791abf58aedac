use connectors::{
    commerce::{CommerceApi, EntityKind},
    error::ConnectorError,
};
use engine_core::retry::RetryPolicy;
use engine_processing::retry::classify;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

/// Per-job get-or-create memo for reference entities. The key carries the
/// parent id so same-named children under different parents stay distinct.
/// Lives in memory for one job run only; never persisted.
pub struct EntityCache {
    api: Arc<dyn CommerceApi>,
    retry: RetryPolicy,
    cache: HashMap<(EntityKind, String, Option<String>), String>,
}

impl EntityCache {
    pub fn new(api: Arc<dyn CommerceApi>, retry: RetryPolicy) -> Self {
        EntityCache {
            api,
            retry,
            cache: HashMap::new(),
        }
    }

    /// Memory, then API lookup, then create. A duplicate-conflict on
    /// create means another actor won the race, so the lookup is retried
    /// once before giving up.
    pub async fn upsert(
        &mut self,
        kind: EntityKind,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<String, ConnectorError> {
        let key = (
            kind,
            name.to_lowercase(),
            parent_id.map(|p| p.to_string()),
        );
        if let Some(id) = self.cache.get(&key) {
            return Ok(id.clone());
        }

        let found = self
            .retry
            .run(|| self.api.find_entity(kind, name, parent_id), classify)
            .await
            .map_err(|e| e.into_inner())?;

        let entity = match found {
            Some(entity) => entity,
            None => {
                match self
                    .retry
                    .run(|| self.api.create_entity(kind, name, parent_id), classify)
                    .await
                {
                    Ok(entity) => {
                        debug!(kind = kind.as_str(), name, "Created reference entity");
                        entity
                    }
                    Err(err) => match err.into_inner() {
                        ConnectorError::DuplicateConflict { .. } => self
                            .api
                            .find_entity(kind, name, parent_id)
                            .await?
                            .ok_or_else(|| ConnectorError::UnexpectedResponse(format!(
                                "{} '{name}' reported duplicate but is not listed",
                                kind.as_str()
                            )))?,
                        other => return Err(other),
                    },
                }
            }
        };

        self.cache.insert(key, entity.id.clone());
        Ok(entity.id)
    }

    /// Upserts every category along a root-to-leaf name path, chaining
    /// parent ids, and returns the ids in path order.
    pub async fn ensure_category_path(
        &mut self,
        path: &[String],
    ) -> Result<Vec<String>, ConnectorError> {
        let mut ids = Vec::with_capacity(path.len());
        let mut parent: Option<String> = None;
        for name in path {
            let id = self
                .upsert(EntityKind::Category, name, parent.as_deref())
                .await?;
            parent = Some(id.clone());
            ids.push(id);
        }
        Ok(ids)
    }
}
