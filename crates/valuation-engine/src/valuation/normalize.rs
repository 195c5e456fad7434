use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::domain::Comp;

/// Coerces a loosely-typed value into a finite number. Blank strings,
/// non-numeric text, NaN, and infinities all collapse to `None`.
pub fn safe_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => finite(number.as_f64()),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            finite(trimmed.parse::<f64>().ok())
        }
        _ => None,
    }
}

/// Guards an already-numeric optional against NaN and infinities.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|n| n.is_finite())
}

/// Serde adapter so wire payloads may carry numbers, numeric strings, or
/// null in any numeric slot.
pub(crate) fn flexible_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(safe_number))
}

/// Re-normalizes a comp constructed in code rather than deserialized, so
/// downstream stages never see a non-finite number.
pub fn normalize_comp(comp: Comp) -> Comp {
    Comp {
        price: finite(comp.price),
        sqft: finite(comp.sqft),
        beds: finite(comp.beds),
        baths: finite(comp.baths),
        lot_sqft: finite(comp.lot_sqft),
        year_built: finite(comp.year_built),
        distance_miles: finite(comp.distance_miles),
        price_adjusted: finite(comp.price_adjusted),
        market_time_adjustment: comp.market_time_adjustment.map(|adjustment| {
            super::domain::MarketTimeAdjustment {
                factor: finite(adjustment.factor),
                applied: adjustment.applied,
            }
        }),
        ..comp
    }
}
