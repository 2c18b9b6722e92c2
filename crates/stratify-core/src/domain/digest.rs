//! Canonical JSON form and content digest of a blueprint.
//!
//! Object keys are sorted by UTF-16 code units and integer-valued floats are
//! written as integers, so two blueprints that differ only in key order or
//! number spelling share a digest.

use sha2::{Digest, Sha256};

use crate::domain::component::StrategyComponent;

fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.clone(), canonicalize(v));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(canonicalize).collect())
        }
        serde_json::Value::Number(n) if !(n.is_i64() || n.is_u64()) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                serde_json::Value::Number(serde_json::Number::from(f as i64))
            }
            _ => serde_json::Value::Number(n.clone()),
        },
        other => other.clone(),
    }
}

/// Compact canonical JSON for `value`.
pub fn canonical_json(value: &serde_json::Value) -> String {
    canonicalize(value).to_string()
}

/// SHA-256 hex digest of the canonical JSON form of `components`.
pub fn blueprint_digest(components: &[StrategyComponent]) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(components)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(&value).as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
