//! Transport seam between the dispatcher and the HTTP layer

use super::protocol::HttpMethod;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while talking to the newsletter API
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server answered with a non-success status
    #[error("API request failed ({status}): {payload}")]
    Http { status: u16, payload: Value },

    /// Connection, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be decoded
    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    Request(String),
}

impl TransportError {
    /// HTTP status, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Issues one authenticated request and returns the parsed response body.
///
/// Implementations must not retry on behalf of the dispatcher's callers
/// unless that is their own documented policy.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: &Map<String, Value>,
        query: &Map<String, Value>,
    ) -> Result<Value, TransportError>;
}

#[cfg(test)]
pub(crate) mod stub {
    //! Scripted transport used by the driver and dispatcher tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedCall {
        pub method: HttpMethod,
        pub path: String,
        pub body: Map<String, Value>,
        pub query: Map<String, Value>,
    }

    /// Replays queued responses in order and records every call
    #[derive(Default)]
    pub struct StubTransport {
        responses: Mutex<VecDeque<Result<Value, TransportError>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl StubTransport {
        pub fn new(responses: Vec<Result<Value, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn ok(responses: Vec<Value>) -> Self {
            Self::new(responses.into_iter().map(Ok).collect())
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn query_values(&self, key: &str) -> Vec<Value> {
            self.calls()
                .iter()
                .map(|c| c.query.get(key).cloned().unwrap_or(Value::Null))
                .collect()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(
            &self,
            method: HttpMethod,
            path: &str,
            body: &Map<String, Value>,
            query: &Map<String, Value>,
        ) -> Result<Value, TransportError> {
            self.calls.lock().unwrap().push(RecordedCall {
                method,
                path: path.to_string(),
                body: body.clone(),
                query: query.clone(),
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Value::Array(vec![])))
        }
    }
}
