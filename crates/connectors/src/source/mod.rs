pub mod discovery;
pub mod mysql;
pub mod schema;

use crate::error::ConnectorError;
use async_trait::async_trait;
use model::{
    mapping::DiscoveredTable,
    record::{CategoryNode, RecordBatch},
};
use std::collections::HashMap;

/// One LIMIT/OFFSET page of an arbitrary table, stringified for export.
#[derive(Debug, Clone, Default)]
pub struct TablePage {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Tabular access to the legacy storefront. Batch extraction is
/// strictly-increasing-id based; the offset variant exists only for the
/// point-in-time backup path.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Returns records with id strictly greater than `cursor`, at most
    /// `limit` of them, ordered by id.
    async fn fetch_batch(&self, cursor: u64, limit: u32) -> Result<RecordBatch, ConnectorError>;

    async fn count_records(&self) -> Result<u64, ConnectorError>;

    async fn load_category_tree(&self) -> Result<HashMap<u64, CategoryNode>, ConnectorError>;

    async fn list_tables(&self) -> Result<Vec<DiscoveredTable>, ConnectorError>;

    async fn table_ddl(&self, table: &str) -> Result<String, ConnectorError>;

    async fn fetch_page(
        &self,
        table: &str,
        offset: u64,
        limit: u32,
    ) -> Result<TablePage, ConnectorError>;
}
