pub mod http;

use crate::error::ConnectorError;
use async_trait::async_trait;
use model::payload::TargetPayload;
use serde::{Deserialize, Serialize};

/// Reference entity kinds the migration gets-or-creates at the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Category,
    Collection,
    ProductType,
    Tag,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Collection => "collection",
            EntityKind::ProductType => "product-type",
            EntityKind::Tag => "tag",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}

/// Typed surface of the target commerce admin API. One well-defined
/// interface instead of runtime capability probing; everything the
/// pipeline needs and nothing more.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Returns the default sales channel, creating one when none exists.
    async fn default_sales_channel(&self) -> Result<EntityRef, ConnectorError>;

    /// Returns the default stock location, creating one when none exists.
    async fn default_stock_location(&self) -> Result<EntityRef, ConnectorError>;

    /// Finds an entity by name (case-insensitive), scoped to a parent for
    /// kinds that form hierarchies.
    async fn find_entity(
        &self,
        kind: EntityKind,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<EntityRef>, ConnectorError>;

    async fn create_entity(
        &self,
        kind: EntityKind,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<EntityRef, ConnectorError>;

    async fn find_product_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<String>, ConnectorError>;

    async fn create_product(&self, payload: &TargetPayload) -> Result<String, ConnectorError>;

    /// Used only by reseed mode. Destructive.
    async fn delete_product(&self, product_id: &str) -> Result<(), ConnectorError>;
}
