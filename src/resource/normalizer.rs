//! Result normalization
//!
//! Flattens whatever the driver returned (an accumulated page list, a bare
//! array, or a single enveloped object) into one record per item.

use super::path_extractor::extract_list;
use serde::Serialize;
use serde_json::Value;

/// Default envelope key holding the item payload of list responses
pub const DEFAULT_ENVELOPE_KEY: &str = "data";

/// One output record, paired with the input item that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub json: Value,
    pub paired_item: usize,
}

impl OutputRecord {
    pub fn new(json: Value, paired_item: usize) -> Self {
        Self { json, paired_item }
    }
}

/// Normalize a raw transport result into records.
///
/// Arrays are flattened one level whatever `full_response` says. For a
/// single response, `full_response` keeps it whole; otherwise the payload
/// under `envelope_key` is unwrapped. A response without that payload
/// yields no records.
pub fn normalize(raw: Value, full_response: bool, envelope_key: &str) -> Vec<Value> {
    match raw {
        Value::Array(items) => items,
        other if full_response => vec![other],
        Value::Null => vec![],
        other => extract_list(&other, envelope_key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope() -> Value {
        json!({
            "data": [{"id": "s1"}, {"id": "s2"}],
            "meta": {"total": 2}
        })
    }

    #[test]
    fn test_full_response_emits_raw_object() {
        let records = normalize(envelope(), true, DEFAULT_ENVELOPE_KEY);
        assert_eq!(records, vec![envelope()]);
    }

    #[test]
    fn test_unwrap_emits_each_payload_element() {
        let records = normalize(envelope(), false, DEFAULT_ENVELOPE_KEY);
        assert_eq!(records, vec![json!({"id": "s1"}), json!({"id": "s2"})]);
    }

    #[test]
    fn test_array_flattened_regardless_of_flag() {
        let raw = json!([{"id": 1}, {"id": 2}]);
        assert_eq!(normalize(raw.clone(), true, "data").len(), 2);
        assert_eq!(normalize(raw, false, "data").len(), 2);
    }

    #[test]
    fn test_single_object_payload() {
        let raw = json!({"data": {"id": "c1", "subject": "Hello"}});
        assert_eq!(
            normalize(raw, false, "data"),
            vec![json!({"id": "c1", "subject": "Hello"})]
        );
    }

    #[test]
    fn test_missing_payload_yields_nothing() {
        assert!(normalize(json!({"message": "deleted"}), false, "data").is_empty());
        assert!(normalize(Value::Null, false, "data").is_empty());
    }

    #[test]
    fn test_custom_envelope_key() {
        let raw = json!({"result": {"items": [1, 2, 3]}});
        assert_eq!(normalize(raw, false, "/result/items").len(), 3);
    }
}
