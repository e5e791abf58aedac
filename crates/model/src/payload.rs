use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload has no variants")]
    NoVariants,

    #[error("Payload has variants but no options with values")]
    VariantsWithoutOptions,

    #[error("Variant '{0}' carries no option values")]
    VariantWithoutValues(String),

    #[error("Payload has no images")]
    NoImages,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProductOption {
    pub title: String,
    pub values: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProductVariant {
    pub title: String,
    pub sku: String,
    /// option title -> value. Never a bare positional list.
    pub options: HashMap<String, String>,
    pub price_minor: i64,
    pub inventory_quantity: u32,
    pub weight_g: Option<i64>,
    pub length_mm: Option<i64>,
    pub width_mm: Option<i64>,
    pub height_mm: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProductDimensions {
    pub weight_kg: Option<f64>,
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
}

/// The fully normalized record ready for the target commerce API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TargetPayload {
    pub handle: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    /// Ordered image URLs; never empty (a placeholder stands in when every
    /// resolution attempt failed).
    pub images: Vec<String>,
    pub dimensions: ProductDimensions,
    pub options: Vec<ProductOption>,
    pub variants: Vec<ProductVariant>,
    pub currency_code: String,
    pub discount_percent: u8,
    pub category_ids: Vec<String>,
    pub collection_id: Option<String>,
    pub type_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub sales_channel_id: String,
    /// Traceability back to the source record (id, sku, original handle).
    pub metadata: HashMap<String, String>,
}

impl TargetPayload {
    /// Rejects payloads that would be invalid at the target API: an empty
    /// variant list, variants without a populated option set, or an empty
    /// image list.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.variants.is_empty() {
            return Err(PayloadError::NoVariants);
        }
        if !self.options.iter().any(|o| !o.values.is_empty()) {
            return Err(PayloadError::VariantsWithoutOptions);
        }
        for variant in &self.variants {
            if variant.options.is_empty() {
                return Err(PayloadError::VariantWithoutValues(variant.title.clone()));
            }
        }
        if self.images.is_empty() {
            return Err(PayloadError::NoImages);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(title: &str, option: Option<(&str, &str)>) -> ProductVariant {
        let mut options = HashMap::new();
        if let Some((k, v)) = option {
            options.insert(k.to_string(), v.to_string());
        }
        ProductVariant {
            title: title.to_string(),
            sku: format!("sku-{title}"),
            options,
            price_minor: 1000,
            inventory_quantity: 0,
            weight_g: None,
            length_mm: None,
            width_mm: None,
            height_mm: None,
        }
    }

    fn payload() -> TargetPayload {
        TargetPayload {
            handle: "kettle".into(),
            title: "Kettle".into(),
            description: None,
            thumbnail: "https://img/x.jpg".into(),
            images: vec!["https://img/x.jpg".into()],
            dimensions: ProductDimensions::default(),
            options: vec![ProductOption {
                title: "Title".into(),
                values: vec!["Default".into()],
            }],
            variants: vec![variant("Default", Some(("Title", "Default")))],
            currency_code: "EUR".into(),
            discount_percent: 0,
            category_ids: vec![],
            collection_id: None,
            type_id: None,
            tag_ids: vec![],
            sales_channel_id: "sc_1".into(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert_eq!(payload().validate(), Ok(()));
    }

    #[test]
    fn variants_without_options_are_rejected() {
        let mut p = payload();
        p.options.clear();
        assert_eq!(p.validate(), Err(PayloadError::VariantsWithoutOptions));

        let mut p = payload();
        p.options[0].values.clear();
        assert_eq!(p.validate(), Err(PayloadError::VariantsWithoutOptions));
    }

    #[test]
    fn empty_variants_are_rejected() {
        let mut p = payload();
        p.variants.clear();
        assert_eq!(p.validate(), Err(PayloadError::NoVariants));
    }

    #[test]
    fn variant_with_no_values_is_rejected() {
        let mut p = payload();
        p.variants.push(variant("Bare", None));
        assert!(matches!(
            p.validate(),
            Err(PayloadError::VariantWithoutValues(_))
        ));
    }
}
