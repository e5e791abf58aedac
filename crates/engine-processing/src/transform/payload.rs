use crate::{
    error::TransformError,
    transform::{options, pricing, text, units},
};
use chrono::{DateTime, Utc};
use model::{
    payload::{ProductDimensions, TargetPayload},
    record::SourceRecord,
};
use std::collections::HashMap;

/// Resolved references the orchestrator supplies for one record.
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    pub category_ids: Vec<String>,
    pub collection_id: Option<String>,
    pub type_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub sales_channel_id: String,
}

/// Builds the fully normalized payload for one source record. `image_urls`
/// is the ordered output of the image pipeline and is never empty (the
/// pipeline substitutes a placeholder when everything failed).
pub fn assemble(
    record: &SourceRecord,
    image_urls: &[String],
    refs: ResolvedReferences,
    currency_code: &str,
    now: DateTime<Utc>,
    handle_suffix: Option<&str>,
) -> Result<TargetPayload, TransformError> {
    if record.regular_price <= 0.0 {
        return Err(TransformError::MissingPrice {
            record_id: record.id,
        });
    }

    let price = pricing::resolve_price(
        record.regular_price,
        record.special_price.as_ref(),
        now,
        currency_code,
    );

    let (product_options, mut variant) = options::synthesize(&record.name, &record.sku);
    variant.price_minor = price.effective_minor;
    variant.weight_g = units::to_inventory_g(record.weight.as_ref());
    variant.length_mm = units::to_inventory_mm(record.length.as_ref());
    variant.width_mm = units::to_inventory_mm(record.width.as_ref());
    variant.height_mm = units::to_inventory_mm(record.height.as_ref());

    let base_handle = text::slugify(&record.name);
    let handle = match handle_suffix {
        Some(suffix) => format!("{base_handle}-{suffix}"),
        None => base_handle.clone(),
    };

    let mut metadata = HashMap::new();
    metadata.insert("source_record_id".to_string(), record.id.to_string());
    metadata.insert("source_sku".to_string(), record.sku.clone());
    metadata.insert("source_handle".to_string(), base_handle);
    metadata.insert("migrated_at".to_string(), now.to_rfc3339());

    let thumbnail = image_urls
        .first()
        .cloned()
        .unwrap_or_default();

    let payload = TargetPayload {
        handle,
        title: record.name.clone(),
        description: record
            .description
            .as_deref()
            .and_then(text::sanitize_description),
        thumbnail,
        images: image_urls.to_vec(),
        dimensions: ProductDimensions {
            weight_kg: units::to_display_kg(record.weight.as_ref()),
            length_cm: units::to_display_cm(record.length.as_ref()),
            width_cm: units::to_display_cm(record.width.as_ref()),
            height_cm: units::to_display_cm(record.height.as_ref()),
        },
        options: product_options,
        variants: vec![variant],
        currency_code: currency_code.to_string(),
        discount_percent: price.discount_percent,
        category_ids: refs.category_ids,
        collection_id: refs.collection_id,
        type_id: refs.type_id,
        tag_ids: refs.tag_ids,
        sales_channel_id: refs.sales_channel_id,
        metadata,
    };

    payload.validate().map_err(|source| TransformError::InvalidPayload {
        record_id: record.id,
        source,
    })?;
    Ok(payload)
}
