//! Canonical JSON and content fingerprinting
//!
//! Staleness detection only works if the snapshot-writing side and the
//! verification side canonicalize identically, so the whole algorithm
//! lives here as one shared pure function: sort object keys
//! recursively, preserve array order, serialize stably, SHA-256 the
//! bytes.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Serialize a JSON value canonically: object keys sorted recursively,
/// array order preserved, no whitespace.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => escape_string(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let parts: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", escape_string(k), canonical_json(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// Compute the lowercase SHA-256 hex digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Fingerprint a record set: canonicalize the records as a JSON array
/// (record order preserved, keys sorted within each record) and hash
/// the result. Both snapshot producers and the freshness verifier use
/// this exact function.
pub fn fingerprint_records(records: &[Value]) -> String {
    let array = Value::Array(records.to_vec());
    sha256_hex(canonical_json(&array).as_bytes())
}

// JSON string escaping per serde_json; strings alone cannot fail to
// serialize, so the fallback is unreachable in practice.
fn escape_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
