use model::record::Measurement;
use tracing::warn;

/// Millimetres per unit of each recognised length label.
fn length_mm_factor(unit: &str) -> Option<f64> {
    match unit.trim().to_lowercase().as_str() {
        "mm" => Some(1.0),
        "cm" => Some(10.0),
        "m" => Some(1000.0),
        "in" | "inch" | "inches" => Some(25.4),
        _ => None,
    }
}

/// Grams per unit of each recognised weight label.
fn weight_g_factor(unit: &str) -> Option<f64> {
    match unit.trim().to_lowercase().as_str() {
        "g" => Some(1.0),
        "kg" => Some(1000.0),
        "lb" | "lbs" => Some(453.592),
        "oz" => Some(28.3495),
        _ => None,
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Product-level display value: centimetres, one decimal. Missing, zero
/// or unrecognised measurements are omitted, never defaulted.
pub fn to_display_cm(m: Option<&Measurement>) -> Option<f64> {
    let m = m?;
    if m.value <= 0.0 {
        return None;
    }
    match length_mm_factor(&m.unit) {
        Some(factor) => Some(round_to(m.value * factor / 10.0, 1)),
        None => {
            warn!(unit = %m.unit, "Unrecognised length unit, omitting measurement");
            None
        }
    }
}

/// Inventory-item value: integer millimetres.
pub fn to_inventory_mm(m: Option<&Measurement>) -> Option<i64> {
    let m = m?;
    if m.value <= 0.0 {
        return None;
    }
    match length_mm_factor(&m.unit) {
        Some(factor) => Some((m.value * factor).round() as i64),
        None => None,
    }
}

/// Product-level display value: kilograms, two decimals.
pub fn to_display_kg(m: Option<&Measurement>) -> Option<f64> {
    let m = m?;
    if m.value <= 0.0 {
        return None;
    }
    match weight_g_factor(&m.unit) {
        Some(factor) => Some(round_to(m.value * factor / 1000.0, 2)),
        None => {
            warn!(unit = %m.unit, "Unrecognised weight unit, omitting measurement");
            None
        }
    }
}

/// Inventory-item value: integer grams.
pub fn to_inventory_g(m: Option<&Measurement>) -> Option<i64> {
    let m = m?;
    if m.value <= 0.0 {
        return None;
    }
    weight_g_factor(&m.unit).map(|factor| (m.value * factor).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(value: f64, unit: &str) -> Measurement {
        Measurement {
            value,
            unit: unit.to_string(),
        }
    }

    #[test]
    fn ten_mm_is_one_cm_and_ten_mm() {
        assert_eq!(to_display_cm(Some(&m(10.0, "mm"))), Some(1.0));
        assert_eq!(to_inventory_mm(Some(&m(10.0, "mm"))), Some(10));
    }

    #[test]
    fn one_metre_is_100_cm_and_1000_mm() {
        assert_eq!(to_display_cm(Some(&m(1.0, "m"))), Some(100.0));
        assert_eq!(to_inventory_mm(Some(&m(1.0, "m"))), Some(1000));
    }

    #[test]
    fn weights_convert_to_both_representations() {
        assert_eq!(to_display_kg(Some(&m(2500.0, "g"))), Some(2.5));
        assert_eq!(to_inventory_g(Some(&m(2.5, "kg"))), Some(2500));
        assert_eq!(to_inventory_g(Some(&m(1.0, "lb"))), Some(454));
    }

    #[test]
    fn zero_and_missing_values_are_omitted() {
        assert_eq!(to_display_cm(Some(&m(0.0, "cm"))), None);
        assert_eq!(to_display_cm(None), None);
        assert_eq!(to_inventory_g(Some(&m(-1.0, "kg"))), None);
    }

    #[test]
    fn unknown_units_are_omitted_not_guessed() {
        assert_eq!(to_display_cm(Some(&m(5.0, "cubits"))), None);
    }

    #[test]
    fn display_rounding() {
        assert_eq!(to_display_cm(Some(&m(12.34, "mm"))), Some(1.2));
        assert_eq!(to_display_kg(Some(&m(1234.0, "g"))), Some(1.23));
    }
}
