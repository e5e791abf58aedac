use lazy_static::lazy_static;
use model::payload::{ProductOption, ProductVariant};
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    /// Capacity mentioned in a product name: "2L", "1.5 Ltr", "750ml", ...
    static ref CAPACITY_RE: Regex =
        Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(l|ltr|litre|liter|ml)\b").expect("valid regex");
}

/// Extracts and normalizes a capacity from a product name: litres render
/// as "2L" / "1.5L", millilitres as "750ml" (or litres when they divide
/// evenly into thousands).
pub fn extract_capacity(name: &str) -> Option<String> {
    let caps = CAPACITY_RE.captures(name)?;
    let raw_value = caps[1].replace(',', ".");
    let value: f64 = raw_value.parse().ok()?;
    if value <= 0.0 {
        return None;
    }
    let unit = caps[2].to_lowercase();

    if unit == "ml" {
        let ml = value.round() as i64;
        if ml % 1000 == 0 {
            return Some(format!("{}L", ml / 1000));
        }
        return Some(format!("{ml}ml"));
    }

    // Litre variants normalize to "L" with trailing zeros trimmed.
    let formatted = if (value.fract()).abs() < f64::EPSILON {
        format!("{}L", value as i64)
    } else {
        format!("{value}L")
    };
    Some(formatted)
}

/// Synthesizes the option/variant pair for a single-variant record so the
/// payload invariant (variants imply a populated option) always holds.
/// A capacity found in the name becomes a "Capacity" option; otherwise the
/// variant's title becomes the value of a "Title" option.
pub fn synthesize(name: &str, sku: &str) -> (Vec<ProductOption>, ProductVariant) {
    let (option_title, value, variant_title) = match extract_capacity(name) {
        Some(capacity) => ("Capacity", capacity.clone(), capacity),
        None => ("Title", name.to_string(), name.to_string()),
    };

    let options = vec![ProductOption {
        title: option_title.to_string(),
        values: vec![value.clone()],
    }];

    let mut option_values = HashMap::new();
    option_values.insert(option_title.to_string(), value);

    let variant = ProductVariant {
        title: variant_title,
        sku: sku.to_string(),
        options: option_values,
        price_minor: 0,
        inventory_quantity: 0,
        weight_g: None,
        length_mm: None,
        width_mm: None,
        height_mm: None,
    };

    (options, variant)
}
