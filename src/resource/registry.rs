//! Operation catalog
//!
//! Maps resource name -> operation name -> [`OperationSchema`]. The built-in
//! catalog is embedded at compile time, parsed and validated once, and shared
//! read-only for the rest of the process.

use super::assembler::placeholders;
use super::protocol::OperationSchema;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

const BUILTIN_CATALOG: &str = include_str!("catalog/newsletter.json");

static CATALOG: OnceLock<OperationCatalog> = OnceLock::new();

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Could not read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid operation {resource}.{operation}: {reason}")]
    Invalid {
        resource: String,
        operation: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct OperationCatalog {
    resources: BTreeMap<String, BTreeMap<String, OperationSchema>>,
}

impl OperationCatalog {
    /// The embedded catalog, parsed on first use
    pub fn builtin() -> Result<&'static OperationCatalog, CatalogError> {
        if let Some(catalog) = CATALOG.get() {
            return Ok(catalog);
        }
        let catalog = Self::from_json(BUILTIN_CATALOG)?;
        Ok(CATALOG.get_or_init(|| catalog))
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: OperationCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        debug!(
            "Loaded catalog with {} resources",
            catalog.resources.len()
        );
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Look up one operation
    pub fn get(&self, resource: &str, operation: &str) -> Option<&OperationSchema> {
        self.resources.get(resource)?.get(operation)
    }

    /// Resource names, sorted
    pub fn resources(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Operation names of one resource, sorted
    pub fn operations(&self, resource: &str) -> Vec<&str> {
        self.resources
            .get(resource)
            .map(|ops| ops.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Check every schema's path template against its path parameters
    fn validate(&self) -> Result<(), CatalogError> {
        for (resource, operations) in &self.resources {
            for (operation, schema) in operations {
                validate_schema(schema).map_err(|reason| CatalogError::Invalid {
                    resource: resource.clone(),
                    operation: operation.clone(),
                    reason,
                })?;
            }
        }
        Ok(())
    }
}

fn validate_schema(schema: &OperationSchema) -> Result<(), String> {
    let opens = schema.path.matches('{').count();
    let closes = schema.path.matches('}').count();
    if opens != closes {
        return Err(format!("unbalanced braces in path '{}'", schema.path));
    }

    let tokens = placeholders(&schema.path);
    if tokens.len() != opens {
        return Err(format!("malformed placeholder in path '{}'", schema.path));
    }

    let mut seen = HashSet::new();
    for param in &schema.path_params {
        if !seen.insert(param.placeholder.as_str()) {
            return Err(format!(
                "placeholder '{}' is bound more than once",
                param.placeholder
            ));
        }
        if !tokens.contains(&param.placeholder.as_str()) {
            return Err(format!(
                "path parameter '{}' does not appear in '{}'",
                param.placeholder, schema.path
            ));
        }
    }

    for token in tokens {
        if token.is_empty() || token.contains('{') {
            return Err(format!("malformed placeholder in path '{}'", schema.path));
        }
        if !seen.contains(token) {
            return Err(format!("placeholder '{}' has no path parameter", token));
        }
    }

    Ok(())
}
