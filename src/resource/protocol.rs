//! Operation schema definitions
//!
//! This module defines the data structures that describe one newsletter API
//! operation in a data-driven way, so that every endpoint is declared in the
//! JSON catalog rather than hard-coded in Rust.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Prefix that namespaces the optional fields of a query/body group
/// (e.g. `query_status` becomes `status` on the wire).
pub const DEFAULT_GROUP_PREFIX: &str = "query_";

/// HTTP methods accepted by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::Get
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pagination strategies understood by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// Single request, no paging parameters
    None,
    /// `skip`/`limit` cursor
    Offset,
    /// `page`/`per_page` cursor
    Page,
}

impl Default for PaginationMode {
    fn default() -> Self {
        PaginationMode::None
    }
}

/// Binds a `{placeholder}` in the path template to a parameter key
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PathParam {
    pub placeholder: String,
    pub param: String,
}

/// Binds a query string key or body key to a parameter key
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldParam {
    /// Name on the wire
    pub key: String,
    /// Name in the parameter namespace
    pub param: String,
}

/// Configuration for a single API operation
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OperationSchema {
    #[serde(default)]
    pub method: HttpMethod,

    /// URL path template, e.g. "/lists/{list_id}/subscribers"
    pub path: String,

    #[serde(default)]
    pub pagination: PaginationMode,

    #[serde(default)]
    pub path_params: Vec<PathParam>,

    #[serde(default)]
    pub query_params: Vec<FieldParam>,

    /// Parameter holding a map of optional query fields
    #[serde(default)]
    pub optional_query_group: Option<String>,

    #[serde(default)]
    pub body_params: Vec<FieldParam>,

    /// Parameter holding a map of optional body fields
    #[serde(default)]
    pub optional_body_group: Option<String>,

    /// Parameter whose map value is sent as the whole body.
    /// Takes precedence over `body_params` and `optional_body_group`.
    #[serde(default)]
    pub raw_body_group: Option<String>,

    /// Prefix stripped from group keys; defaults to [`DEFAULT_GROUP_PREFIX`]
    #[serde(default)]
    pub group_prefix: Option<String>,
}

impl OperationSchema {
    pub fn group_prefix(&self) -> &str {
        self.group_prefix.as_deref().unwrap_or(DEFAULT_GROUP_PREFIX)
    }

    pub fn is_get(&self) -> bool {
        self.method == HttpMethod::Get
    }
}

/// A fully assembled request, ready for the transport
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub query: Map<String, Value>,
    pub body: Map<String, Value>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Map::new(),
            body: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_deserialize() {
        let method: HttpMethod = serde_json::from_str(r#""GET""#).unwrap();
        assert_eq!(method, HttpMethod::Get);

        let method: HttpMethod = serde_json::from_str(r#""DELETE""#).unwrap();
        assert_eq!(method, HttpMethod::Delete);
        assert_eq!(method.to_string(), "DELETE");
    }

    #[test]
    fn test_pagination_mode_deserialize() {
        let mode: PaginationMode = serde_json::from_str(r#""offset""#).unwrap();
        assert_eq!(mode, PaginationMode::Offset);

        let mode: PaginationMode = serde_json::from_str(r#""page""#).unwrap();
        assert_eq!(mode, PaginationMode::Page);
    }

    #[test]
    fn test_operation_schema_defaults() {
        let json = r#"{"path": "/campaigns"}"#;
        let schema: OperationSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.method, HttpMethod::Get);
        assert_eq!(schema.pagination, PaginationMode::None);
        assert!(schema.path_params.is_empty());
        assert_eq!(schema.group_prefix(), "query_");
    }

    #[test]
    fn test_operation_schema_deserialize() {
        let json = r#"{
            "method": "POST",
            "path": "/lists/{list_id}/subscribers",
            "path_params": [{"placeholder": "list_id", "param": "listId"}],
            "body_params": [{"key": "email", "param": "email"}],
            "optional_body_group": "additionalFields"
        }"#;
        let schema: OperationSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.method, HttpMethod::Post);
        assert_eq!(schema.path_params[0].placeholder, "list_id");
        assert_eq!(schema.body_params[0].key, "email");
        assert_eq!(
            schema.optional_body_group,
            Some("additionalFields".to_string())
        );
        assert!(!schema.is_get());
    }
}
