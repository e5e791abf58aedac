use model::mapping::{DiscoveredTable, DiscoveryResult, FieldMapping, TableCandidate};

/// Weighted column-name hints. A table's score is the sum of weights for
/// every hint any of its columns matches; the shortlist ranks tables by
/// that score.
const COLUMN_HINTS: &[(&str, u32)] = &[
    ("sku", 5),
    ("price", 4),
    ("image", 4),
    ("thumbnail", 3),
    ("gallery", 3),
    ("product", 3),
    ("name", 2),
    ("title", 2),
    ("description", 2),
    ("brand", 2),
    ("weight", 2),
    ("category", 2),
    ("stock", 1),
    ("qty", 1),
    ("quantity", 1),
    ("tag", 1),
];

/// Target payload fields and the column-name fragments that usually carry
/// them, in preference order.
const FIELD_SYNONYMS: &[(&str, &[&str])] = &[
    ("id", &["id", "entity_id", "product_id"]),
    ("sku", &["sku", "article", "item_code"]),
    ("name", &["name", "title", "label"]),
    ("description", &["description", "desc", "body"]),
    ("brand", &["brand", "manufacturer", "vendor"]),
    ("price", &["price", "amount", "cost"]),
    ("special_price", &["special_price", "sale_price", "discount_price"]),
    ("special_from", &["special_from", "sale_from", "special_from_date"]),
    ("special_to", &["special_to", "sale_to", "special_to_date"]),
    ("weight", &["weight"]),
    ("weight_unit", &["weight_unit", "weight_uom"]),
    ("length", &["length", "depth"]),
    ("width", &["width"]),
    ("height", &["height"]),
    ("dimension_unit", &["dimension_unit", "size_unit", "dim_uom"]),
];

pub fn score_table(table: &DiscoveredTable) -> TableCandidate {
    let mut score = 0;
    let mut matched = Vec::new();
    for column in &table.columns {
        let lowered = column.name.to_lowercase();
        let mut column_hit = false;
        for (hint, weight) in COLUMN_HINTS {
            if lowered.contains(hint) {
                score += weight;
                column_hit = true;
            }
        }
        if column_hit {
            matched.push(column.name.clone());
        }
    }
    TableCandidate {
        table: table.name.clone(),
        score,
        matched_columns: matched,
    }
}

/// Ranks all tables and generates an advisory default field mapping from
/// the best-scoring one.
pub fn rank_and_map(tables: Vec<DiscoveredTable>) -> (DiscoveryResult, FieldMapping) {
    let mut candidates: Vec<TableCandidate> = tables.iter().map(score_table).collect();
    candidates.sort_by(|a, b| b.score.cmp(&a.score).then(a.table.cmp(&b.table)));
    candidates.retain(|c| c.score > 0);

    let mapping = candidates
        .first()
        .and_then(|best| tables.iter().find(|t| t.name == best.table))
        .map(generate_mapping)
        .unwrap_or_default();

    (
        DiscoveryResult { tables, candidates },
        mapping,
    )
}

/// Best-effort source-column assignment for each target field: first
/// synonym wins, exact match preferred over substring match.
pub fn generate_mapping(table: &DiscoveredTable) -> FieldMapping {
    let mut mapping = FieldMapping {
        source_table: Some(table.name.clone()),
        ..Default::default()
    };

    for (field, synonyms) in FIELD_SYNONYMS {
        let exact = table.columns.iter().find(|c| {
            let lowered = c.name.to_lowercase();
            synonyms.iter().any(|s| lowered == *s)
        });
        let fuzzy = || {
            table.columns.iter().find(|c| {
                let lowered = c.name.to_lowercase();
                synonyms.iter().any(|s| lowered.contains(s))
            })
        };
        if let Some(column) = exact.or_else(fuzzy) {
            mapping
                .fields
                .insert(field.to_string(), column.name.clone());
        }
    }
    mapping
}
