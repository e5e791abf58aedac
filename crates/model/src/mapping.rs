use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A column observed during schema discovery.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTable {
    pub name: String,
    pub row_count: Option<u64>,
    pub columns: Vec<DiscoveredColumn>,
}

/// A table ranked by how strongly its column names hint at product or
/// image data. Higher score means a better candidate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TableCandidate {
    pub table: String,
    pub score: u32,
    /// The column names that contributed to the score.
    pub matched_columns: Vec<String>,
}

/// Source-field to target-field dictionary generated by discovery.
/// Advisory metadata consumed by the transform configuration, not
/// hard-wired logic.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    /// target field name -> source column name
    pub fields: BTreeMap<String, String>,
    /// Table the mapping was generated from, when discovery picked one.
    pub source_table: Option<String>,
}

impl FieldMapping {
    pub fn source_column(&self, target_field: &str) -> Option<&str> {
        self.fields.get(target_field).map(String::as_str)
    }
}

/// Full discovery output: everything seen plus the ranked shortlist.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DiscoveryResult {
    pub tables: Vec<DiscoveredTable>,
    pub candidates: Vec<TableCandidate>,
}
