//! Dispatch error taxonomy

use super::transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown operation '{operation}' for resource '{resource}'")]
    UnknownOperation { resource: String, operation: String },

    /// A `{placeholder}` resolved to a missing, null or empty value.
    /// Raised before any request is sent.
    #[error("Missing value for path parameter '{placeholder}'")]
    MissingPathParameter { placeholder: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A dispatch failure attributed to the input item that caused it
#[derive(Debug, Error)]
#[error("{operation} failed for item {item_index}: {source}")]
pub struct ItemError {
    /// "resource.operation"
    pub operation: String,
    pub item_index: usize,
    #[source]
    pub source: DispatchError,
}

impl ItemError {
    pub fn new(resource: &str, operation: &str, item_index: usize, source: DispatchError) -> Self {
        Self {
            operation: format!("{}.{}", resource, operation),
            item_index,
            source,
        }
    }

    /// HTTP status of the underlying transport failure, if any
    pub fn status(&self) -> Option<u16> {
        match &self.source {
            DispatchError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Short user-facing description of the failure
    pub fn summary(&self) -> String {
        let detail = match &self.source {
            DispatchError::Transport(TransportError::Network(_)) => {
                "Connection failed - check network and base URL".to_string()
            }
            DispatchError::Transport(TransportError::Http { status, .. }) => match status {
                401 => "Invalid API key - check credentials".to_string(),
                403 => "Access denied - check API key permissions".to_string(),
                404 => "Not found - check the identifiers".to_string(),
                422 => "Request rejected - check the parameters".to_string(),
                429 => "Rate limited - try again later".to_string(),
                500..=599 => format!("Server error ({})", status),
                _ => truncate(&self.source.to_string(), 120),
            },
            other => truncate(&other.to_string(), 120),
        };
        format!("{} (item {}): {}", self.operation, self.item_index, detail)
    }
}

fn truncate(message: &str, max: usize) -> String {
    if message.chars().count() > max {
        let cut: String = message.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        message.to_string()
    }
}
