//! Parameter lookup
//!
//! The host owns the parameter values; the dispatcher only reads them by key
//! and item index while a request is being assembled.

use serde_json::{Map, Value};

/// Read access to the per-item parameter namespace
pub trait ParameterSource {
    /// Value declared for `key` on item `item_index`, if any
    fn get(&self, key: &str, item_index: usize) -> Option<Value>;

    /// Value for `key`, falling back to `default` when the host has none
    fn get_or(&self, key: &str, item_index: usize, default: Value) -> Value {
        self.get(key, item_index).unwrap_or(default)
    }

    fn get_bool(&self, key: &str, item_index: usize) -> bool {
        match self.get(key, item_index) {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => matches!(s.as_str(), "true" | "True" | "TRUE" | "1"),
            Some(Value::Number(n)) => n.as_u64().map(|n| n != 0).unwrap_or(false),
            _ => false,
        }
    }

    fn get_u64(&self, key: &str, item_index: usize) -> Option<u64> {
        self.get(key, item_index).as_ref().and_then(value_as_u64)
    }
}

/// Interpret a JSON number or numeric string as an unsigned integer
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parameter source backed by one JSON object per input item
#[derive(Debug, Clone, Default)]
pub struct JsonItems {
    items: Vec<Map<String, Value>>,
}

impl JsonItems {
    pub fn new(items: Vec<Map<String, Value>>) -> Self {
        Self { items }
    }

    /// Build from a JSON document: either one object (a single item) or an
    /// array of objects. Non-object array entries become empty items.
    pub fn from_value(value: Value) -> Self {
        let items = match value {
            Value::Array(arr) => arr
                .into_iter()
                .map(|v| match v {
                    Value::Object(map) => map,
                    _ => Map::new(),
                })
                .collect(),
            Value::Object(map) => vec![map],
            _ => vec![Map::new()],
        };
        Self { items }
    }

    /// Set `key` on every item, overriding what the item declared
    pub fn set_all(&mut self, key: &str, value: Value) {
        for item in &mut self.items {
            item.insert(key.to_string(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ParameterSource for JsonItems {
    fn get(&self, key: &str, item_index: usize) -> Option<Value> {
        self.items
            .get(item_index)
            .and_then(|item| item.get(key))
            .cloned()
    }
}
