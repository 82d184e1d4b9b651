//! HTTP transport for the newsletter API
//!
//! Bearer-token authenticated JSON over reqwest. Implements the dispatcher's
//! [`Transport`] seam; no retries are attempted here.

use crate::resource::protocol::HttpMethod;
use crate::resource::transport::{Transport, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

use super::credentials::{mask_credential, Credentials};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Newsletter API HTTP client
pub struct ApiHttpClient {
    http_client: Client,
    base_url: Url,
    api_key: String,
}

impl ApiHttpClient {
    /// Create a new client for `base_url`
    pub fn new(
        credentials: &Credentials,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = parse_base_url(base_url)?;
        debug!(
            "Creating API HTTP client for {}, api_key: {}",
            base_url,
            mask_credential(&credentials.api_key)
        );

        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            api_key: credentials.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join the base URL and an operation path, keeping any base path prefix
    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| TransportError::Request(format!("{}: {}", joined, e)))
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, TransportError> {
    let url = Url::parse(base_url.trim())
        .map_err(|e| TransportError::Request(format!("Invalid base URL '{}': {}", base_url, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TransportError::Request(format!(
            "Unsupported URL scheme '{}'",
            other
        ))),
    }
}

/// Flatten the query map into wire pairs.
///
/// Scalars use their string form, arrays repeat the key once per element,
/// null becomes an empty value and objects are sent as JSON text.
pub fn encode_query(query: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(query.len());
    for (key, value) in query {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), scalar_text(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Parse a response body; an empty body is `null`
fn parse_body(text: &str) -> Result<Value, TransportError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| TransportError::Decode(e.to_string()))
}

#[async_trait]
impl Transport for ApiHttpClient {
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: &Map<String, Value>,
        query: &Map<String, Value>,
    ) -> Result<Value, TransportError> {
        let url = self.endpoint(path)?;
        let pairs = encode_query(query);
        debug!("API request: method={}, url={}", method, url);
        trace!("Query pairs: {:?}", pairs);

        let mut request = match method {
            HttpMethod::Get => self.http_client.get(url.clone()),
            HttpMethod::Post => self.http_client.post(url.clone()),
            HttpMethod::Put => self.http_client.put(url.clone()),
            HttpMethod::Patch => self.http_client.patch(url.clone()),
            HttpMethod::Delete => self.http_client.delete(url.clone()),
        };

        request = request
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json");

        if !pairs.is_empty() {
            request = request.query(&pairs);
        }

        if !body.is_empty() {
            trace!("Request body: {}", serde_json::Value::Object(body.clone()));
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        debug!("Response status: {}", status);
        trace!(
            "Response body (first 2000 chars): {}",
            text.chars().take(2000).collect::<String>()
        );

        if !status.is_success() {
            warn!(
                "API request failed: status={}, body={}",
                status,
                text.chars().take(500).collect::<String>()
            );
            let payload = parse_body(&text).unwrap_or(Value::String(text));
            return Err(TransportError::Http {
                status: status.as_u16(),
                payload,
            });
        }

        parse_body(&text)
    }
}
