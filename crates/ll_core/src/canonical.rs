//! Canonical JSON encoding and content digests for journaled job output.

use crate::app_error::{AppError, AppResult};
use serde::Serialize;
use serde_json::Value;

const DIGEST_PREFIX: &str = "blake3:";

fn canonical_error(message: &str, details: Value) -> AppError {
    AppError::new("LL_CANONICAL_JSON_FAILED", "canonical", message, false, details)
}

fn find_float(value: &Value) -> Option<&serde_json::Number> {
    match value {
        Value::Number(n) if n.is_f64() => Some(n),
        Value::Array(items) => items.iter().find_map(find_float),
        Value::Object(map) => map.values().find_map(find_float),
        _ => None,
    }
}

/// Compact JSON with sorted object keys; floats are refused. Key order relies on
/// `serde_json::Map` being a `BTreeMap` (no `preserve_order` feature in this workspace).
pub fn to_canonical_string<T: Serialize>(value: &T) -> AppResult<String> {
    let value = serde_json::to_value(value).map_err(|e| {
        canonical_error(
            "failed to convert value to json",
            serde_json::json!({ "error": e.to_string() }),
        )
    })?;
    if let Some(n) = find_float(&value) {
        return Err(canonical_error(
            "floats are forbidden in checkpoint output",
            serde_json::json!({ "value": n.to_string() }),
        ));
    }
    serde_json::to_string(&value).map_err(|e| {
        canonical_error(
            "failed to encode checkpoint json",
            serde_json::json!({ "error": e.to_string() }),
        )
    })
}

pub fn blake3_hex_prefixed(bytes: &[u8]) -> String {
    format!("{}{}", DIGEST_PREFIX, blake3::hash(bytes).to_hex())
}

pub fn verify_digest(bytes: &[u8], expected: &str) -> AppResult<()> {
    if !expected.starts_with(DIGEST_PREFIX) {
        return Err(AppError::new(
            "LL_HASH_INVALID_FORMAT",
            "canonical",
            "digest must start with blake3:",
            false,
            serde_json::json!({ "value": expected }),
        ));
    }
    let actual = blake3_hex_prefixed(bytes);
    if actual != expected {
        return Err(AppError::new(
            "LL_HASH_MISMATCH",
            "canonical",
            "content digest does not match recorded digest",
            false,
            serde_json::json!({ "expected": expected, "actual": actual }),
        ));
    }
    Ok(())
}
