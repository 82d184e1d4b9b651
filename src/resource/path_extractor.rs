//! Path-based value extraction from JSON
//!
//! Used to locate the item payload inside a response envelope
//! (e.g. `/data` or `/data/items`).

use serde_json::Value;

/// Extract a value from JSON using a path expression.
///
/// Paths use '/' as separator and support:
/// - Object field access: "/field"
/// - Nested access: "/field/subfield"
/// - Array flattening: when encountering an array, extracts from all items
///
/// A bare key without a leading slash ("data") is accepted as well.
///
/// Returns `Value::Null` if the path does not resolve.
pub fn extract_by_path(json: &Value, path: &str) -> Value {
    if path.is_empty() || path == "/" {
        return json.clone();
    }

    let parts: Vec<&str> = path
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    extract_by_parts(json, &parts)
}

fn extract_by_parts(json: &Value, parts: &[&str]) -> Value {
    let Some((part, remaining)) = parts.split_first() else {
        return json.clone();
    };

    match json {
        Value::Object(map) => match map.get(*part) {
            Some(value) => extract_by_parts(value, remaining),
            None => Value::Null,
        },
        Value::Array(arr) => {
            // When we hit an array, extract from each item and collect results
            let mut results: Vec<Value> = arr
                .iter()
                .map(|item| extract_by_parts(item, parts))
                .filter(|v| !v.is_null())
                .collect();

            match results.len() {
                0 => Value::Null,
                1 => results.remove(0),
                _ => Value::Array(results),
            }
        }
        _ => Value::Null,
    }
}

/// Extract a list of items from JSON using a path expression.
///
/// A single object under the path is treated as a one-item list, a missing
/// or null payload as an empty list.
pub fn extract_list(json: &Value, path: &str) -> Vec<Value> {
    match extract_by_path(json, path) {
        Value::Array(arr) => arr,
        Value::Null => vec![],
        other => vec![other],
    }
}

/// Render a scalar JSON value as the string sent on the wire.
///
/// Returns `None` for null and empty strings; composite values are rendered
/// as compact JSON text.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
