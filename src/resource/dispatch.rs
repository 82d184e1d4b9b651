//! Newsletter API dispatcher
//!
//! Runs one catalog operation over a batch of input items:
//! - resolve the schema for (resource, operation)
//! - assemble the request from the item's parameters
//! - drive pagination through the transport
//! - normalize the result into records
//!
//! Items are processed one at a time, in input order.

use super::assembler::assemble;
use super::error::{DispatchError, ItemError};
use super::normalizer::{normalize, OutputRecord, DEFAULT_ENVELOPE_KEY};
use super::paginator::{Paginator, DEFAULT_PAGE_SIZE};
use super::params::ParameterSource;
use super::registry::OperationCatalog;
use super::transport::Transport;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Fetch every page instead of a single one
pub const RETURN_ALL_KEY: &str = "return_all";
/// Page size for single-page and fetch-all runs
pub const LIMIT_KEY: &str = "limit";
/// Emit single responses whole instead of unwrapping the envelope
pub const FULL_RESPONSE_KEY: &str = "full_response";

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Path of the item payload inside list envelopes
    pub envelope_key: String,
    pub default_page_size: u64,
    /// Turn a failing item into an error record instead of aborting the batch
    pub continue_on_fail: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            envelope_key: DEFAULT_ENVELOPE_KEY.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            continue_on_fail: false,
        }
    }
}

pub struct Dispatcher<'a> {
    catalog: &'a OperationCatalog,
    transport: &'a dyn Transport,
    options: DispatchOptions,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        catalog: &'a OperationCatalog,
        transport: &'a dyn Transport,
        options: DispatchOptions,
    ) -> Self {
        Self {
            catalog,
            transport,
            options,
        }
    }

    /// Run `resource.operation` for items `0..item_count`.
    ///
    /// Records from all items are concatenated in input order. Without
    /// `continue_on_fail` the first failing item aborts the batch.
    pub async fn execute(
        &self,
        resource: &str,
        operation: &str,
        params: &dyn ParameterSource,
        item_count: usize,
    ) -> Result<Vec<OutputRecord>, ItemError> {
        let mut records = Vec::new();

        for item_index in 0..item_count {
            match self.invoke(resource, operation, params, item_index).await {
                Ok(items) => {
                    records.extend(
                        items
                            .into_iter()
                            .map(|json| OutputRecord::new(json, item_index)),
                    );
                }
                Err(source) => {
                    let err = ItemError::new(resource, operation, item_index, source);
                    if !self.options.continue_on_fail {
                        return Err(err);
                    }
                    warn!("{}", err);
                    records.push(OutputRecord::new(error_record(&err), item_index));
                }
            }
        }

        Ok(records)
    }

    /// Run one operation for a single item
    pub async fn invoke(
        &self,
        resource: &str,
        operation: &str,
        params: &dyn ParameterSource,
        item_index: usize,
    ) -> Result<Vec<Value>, DispatchError> {
        let schema = self.catalog.get(resource, operation).ok_or_else(|| {
            DispatchError::UnknownOperation {
                resource: resource.to_string(),
                operation: operation.to_string(),
            }
        })?;

        let request = assemble(schema, params, item_index)?;
        debug!(
            "Dispatching {}.{} item {}: {} {}",
            resource, operation, item_index, request.method, request.path
        );

        let fetch_all = params.get_bool(RETURN_ALL_KEY, item_index);
        let page_size = params.get_u64(LIMIT_KEY, item_index);
        let full_response = params.get_bool(FULL_RESPONSE_KEY, item_index);

        let raw = Paginator::new(self.transport, &self.options.envelope_key)
            .with_default_page_size(self.options.default_page_size)
            .drive(request, schema, fetch_all, page_size)
            .await?;

        Ok(normalize(raw, full_response, &self.options.envelope_key))
    }
}

fn error_record(err: &ItemError) -> Value {
    let mut record = json!({ "error": err.source.to_string() });
    if let Some(status) = err.status() {
        record["status"] = json!(status);
    }
    record
}
