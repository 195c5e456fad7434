use serde_json::{Map, Value};

/// Hex digest of a JSON value with object keys sorted recursively, so
/// logically identical payloads hash identically regardless of field or
/// map ordering.
pub(crate) fn stable_hash(value: &Value) -> String {
    let canonical = canonicalize(value);
    let serialized =
        serde_json::to_vec(&canonical).unwrap_or_else(|_| canonical.to_string().into_bytes());
    blake3::hash(&serialized).to_hex().to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (key, nested) in sorted {
                out.insert(key.clone(), canonicalize(nested));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
