//! Request assembly
//!
//! Turns an [`OperationSchema`] plus the host's parameters for one item into
//! a concrete [`RequestDescriptor`]. Pure apart from parameter reads.

use super::error::DispatchError;
use super::params::ParameterSource;
use super::path_extractor::value_to_string;
use super::protocol::{OperationSchema, RequestDescriptor};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::trace;

/// Build the request for item `item_index`.
///
/// Fails only when a path placeholder has no usable value.
pub fn assemble(
    schema: &OperationSchema,
    params: &dyn ParameterSource,
    item_index: usize,
) -> Result<RequestDescriptor, DispatchError> {
    let substitutions: HashMap<&str, Option<String>> = schema
        .path_params
        .iter()
        .map(|p| {
            let value = params
                .get(&p.param, item_index)
                .and_then(|v| value_to_string(&v));
            (p.placeholder.as_str(), value)
        })
        .collect();

    let path = substitute_path(&schema.path, &substitutions)?;
    let mut request = RequestDescriptor::new(schema.method, path);
    let prefix = schema.group_prefix();

    for q in &schema.query_params {
        let value = params.get_or(&q.param, item_index, Value::Null);
        request.query.insert(q.key.clone(), value);
    }

    if let Some(group_key) = &schema.optional_query_group {
        let group = params.get_or(group_key, item_index, Value::Object(Map::new()));
        merge_prefixed_group(&mut request.query, &group, prefix);
    }

    if let Some(raw_key) = &schema.raw_body_group {
        request.body = raw_body(params.get(raw_key, item_index));
        trace!("Raw body from '{}': {:?}", raw_key, request.body);
        return Ok(request);
    }

    for b in &schema.body_params {
        let value = params.get_or(&b.param, item_index, Value::Null);
        request.body.insert(b.key.clone(), value);
    }

    if let Some(group_key) = &schema.optional_body_group {
        let group = params.get_or(group_key, item_index, Value::Object(Map::new()));
        merge_prefixed_group(&mut request.body, &group, prefix);
    }

    Ok(request)
}

/// Replace every `{name}` token in `template`, percent-encoding the values.
///
/// A token whose value is absent (or was rendered as `None`) fails with
/// [`DispatchError::MissingPathParameter`]. An unterminated `{` is copied
/// through unchanged.
pub fn substitute_path(
    template: &str,
    values: &HashMap<&str, Option<String>>,
) -> Result<String, DispatchError> {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        let value = values
            .get(name)
            .and_then(|v| v.as_deref())
            .ok_or_else(|| DispatchError::MissingPathParameter {
                placeholder: name.to_string(),
            })?;

        path.push_str(&rest[..start]);
        path.push_str(&urlencoding::encode(value));
        rest = &after[end + 1..];
    }

    path.push_str(rest);
    Ok(path)
}

/// Names of all `{placeholder}` tokens in a path template, in order
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Merge a group of optional fields into `target`, stripping `prefix` from
/// each key. Later keys override earlier values. Non-object groups are ignored.
pub fn merge_prefixed_group(target: &mut Map<String, Value>, group: &Value, prefix: &str) {
    let Value::Object(fields) = group else {
        return;
    };

    for (key, value) in fields {
        let bare = key.strip_prefix(prefix).unwrap_or(key);
        target.insert(bare.to_string(), value.clone());
    }
}

/// The raw body group: an object, or a JSON string holding one
fn raw_body(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}
