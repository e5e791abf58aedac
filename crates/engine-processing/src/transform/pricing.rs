use chrono::{DateTime, Utc};
use model::record::SpecialPrice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub regular_minor: i64,
    pub effective_minor: i64,
    pub discount_percent: u8,
}

/// Minor units per major unit for the configured currency. Zero-decimal
/// currencies store whole amounts.
pub fn minor_units_per_major(currency_code: &str) -> i64 {
    match currency_code.to_uppercase().as_str() {
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 1,
        _ => 100,
    }
}

fn to_minor(amount: f64, factor: i64) -> i64 {
    (amount * factor as f64).round() as i64
}

/// The effective price is the special price only when it is present,
/// inside its validity window at `now`, and strictly below the regular
/// price; otherwise the regular price applies. Amounts are rounded to the
/// currency's smallest unit; no fractional units are ever persisted.
pub fn resolve_price(
    regular: f64,
    special: Option<&SpecialPrice>,
    now: DateTime<Utc>,
    currency_code: &str,
) -> ResolvedPrice {
    let factor = minor_units_per_major(currency_code);
    let regular_minor = to_minor(regular, factor);

    let special_minor = special.and_then(|sp| {
        let window_open = sp.from.map(|from| from <= now).unwrap_or(true);
        let window_not_closed = sp.to.map(|to| now <= to).unwrap_or(true);
        if !(window_open && window_not_closed) {
            return None;
        }
        let candidate = to_minor(sp.amount, factor);
        (candidate < regular_minor).then_some(candidate)
    });

    let effective_minor = special_minor.unwrap_or(regular_minor);
    let discount_percent = if effective_minor < regular_minor && regular_minor > 0 {
        (((regular_minor - effective_minor) as f64 / regular_minor as f64) * 100.0).round() as u8
    } else {
        0
    };

    ResolvedPrice {
        regular_minor,
        effective_minor,
        discount_percent,
    }
}
