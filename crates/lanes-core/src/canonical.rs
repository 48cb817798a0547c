//! Canonical JSON rendering.
//!
//! Everything this crate persists (log lines, the snapshot cache, clock
//! state) goes through this writer: compact output, object keys sorted
//! lexicographically at every nesting depth, array order preserved.
//! Two independent processes serializing the same logical value therefore
//! produce byte-identical output, which is what makes appends idempotent
//! for diff-based tooling and snapshot comparison byte-exact.

use serde::Serialize;
use serde_json::Value;

/// Serialize any value to canonical JSON.
///
/// # Errors
///
/// Returns `serde_json::Error` if the value cannot be represented as JSON.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    Ok(canonical_json(&value))
}

/// Render a [`serde_json::Value`] as canonical JSON.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use lanes_core::canonical::canonical_json;
///
/// let val = json!({"wp_id": "WP-01", "actor": "alice", "force": false});
/// assert_eq!(
///     canonical_json(&val),
///     r#"{"actor":"alice","force":false,"wp_id":"WP-01"}"#
/// );
/// ```
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    render(value, &mut out);
    out
}

fn render(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => push_escaped(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_escaped(key, out);
                out.push(':');
                if let Some(val) = map.get(*key) {
                    render(val, out);
                }
            }
            out.push('}');
        }
    }
}

fn push_escaped(s: &str, out: &mut String) {
    // serde_json's escaping rules, so output matches what other tools emit.
    out.push_str(&serde_json::to_string(s).expect("string serialization cannot fail"));
}
