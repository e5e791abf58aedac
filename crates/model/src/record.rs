use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw image reference as stored by the legacy storefront: a relative
/// media path plus gallery ordering.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: String,
    pub position: u32,
    pub is_main: bool,
}

/// A category the record is associated with. Depth/sort/main come from the
/// legacy category tables and drive primary-category selection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CategoryAssociation {
    pub category_id: u64,
    pub depth: u32,
    pub sort_order: u32,
    pub is_main: bool,
}

/// A physical measurement with the unit label the source stored it under.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

/// Optional time-bounded promotional price, in major currency units as the
/// source stores it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpecialPrice {
    pub amount: f64,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Flattened projection of the legacy product schema. Read-only: produced
/// by the extractor, consumed by the transform layer.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    pub id: u64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub regular_price: f64,
    pub special_price: Option<SpecialPrice>,
    pub weight: Option<Measurement>,
    pub length: Option<Measurement>,
    pub width: Option<Measurement>,
    pub height: Option<Measurement>,
    pub images: Vec<SourceImage>,
    pub categories: Vec<CategoryAssociation>,
    pub tags: Vec<String>,
}

/// One page of extraction. `next_cursor` is the highest record id in the
/// page; extraction is exhausted when fewer than the requested limit of
/// records come back.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub records: Vec<SourceRecord>,
    pub next_cursor: u64,
}

impl RecordBatch {
    pub fn is_exhausted(&self, limit: u32) -> bool {
        self.records.len() < limit as usize
    }
}

/// A node in a resolved category path (root first).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub id: u64,
    pub name: String,
    pub parent_id: Option<u64>,
    pub depth: u32,
    pub sort_order: u32,
}
