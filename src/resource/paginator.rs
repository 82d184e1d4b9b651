//! Pagination driver
//!
//! Issues one or more transport calls for an assembled request. Three modes:
//! - none: a single call
//! - offset: `skip`/`limit`, advancing `skip` by the page size
//! - page: `page`/`per_page`, advancing `page` by one
//!
//! There is no total-count field to rely on: a fetch-all run ends on the
//! first page holding fewer items than requested. When the last page is
//! exactly full this costs one extra call that comes back empty.

use super::params::value_as_u64;
use super::path_extractor::extract_list;
use super::protocol::{OperationSchema, PaginationMode, RequestDescriptor};
use super::transport::{Transport, TransportError};
use serde_json::{json, Value};
use tracing::{debug, trace};

pub const DEFAULT_PAGE_SIZE: u64 = 100;

pub const SKIP_PARAM: &str = "skip";
pub const LIMIT_PARAM: &str = "limit";
pub const PAGE_PARAM: &str = "page";
pub const PER_PAGE_PARAM: &str = "per_page";

/// Cursor and accumulated items for one fetch-all run
#[derive(Debug)]
struct PaginationState {
    cursor: u64,
    items: Vec<Value>,
    has_more: bool,
}

impl PaginationState {
    fn new(start: u64) -> Self {
        Self {
            cursor: start,
            items: Vec::new(),
            has_more: true,
        }
    }

    /// Append one page; a page shorter than `page_size` ends the run
    fn absorb(&mut self, page: Vec<Value>, page_size: u64) {
        if (page.len() as u64) < page_size {
            self.has_more = false;
        }
        self.items.extend(page);
    }
}

/// Drives the transport for one input item
pub struct Paginator<'a> {
    transport: &'a dyn Transport,
    envelope_key: &'a str,
    default_page_size: u64,
}

impl<'a> Paginator<'a> {
    pub fn new(transport: &'a dyn Transport, envelope_key: &'a str) -> Self {
        Self {
            transport,
            envelope_key,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_default_page_size(mut self, page_size: u64) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }

    /// Run `request` according to the schema's pagination mode.
    ///
    /// Fetch-all runs return the accumulated items as a JSON array. Single
    /// calls return the response body unchanged. Any transport error aborts
    /// the run and nothing accumulated so far is returned.
    pub async fn drive(
        &self,
        mut request: RequestDescriptor,
        schema: &OperationSchema,
        fetch_all: bool,
        page_size: Option<u64>,
    ) -> Result<Value, TransportError> {
        if !schema.is_get() {
            return self.send(&request).await;
        }

        match (schema.pagination, fetch_all) {
            (PaginationMode::None, _) => self.send(&request).await,
            (mode, false) => {
                self.inject_single_page(&mut request, mode, page_size);
                self.send(&request).await
            }
            (PaginationMode::Offset, true) => Ok(Value::Array(
                self.fetch_all_offset(request, page_size).await?,
            )),
            (PaginationMode::Page, true) => Ok(Value::Array(
                self.fetch_all_pages(request, page_size).await?,
            )),
        }
    }

    fn inject_single_page(
        &self,
        request: &mut RequestDescriptor,
        mode: PaginationMode,
        page_size: Option<u64>,
    ) {
        let size = page_size.unwrap_or(self.default_page_size);
        let (size_key, cursor_key, first) = match mode {
            PaginationMode::Offset => (LIMIT_PARAM, SKIP_PARAM, 0),
            PaginationMode::Page => (PER_PAGE_PARAM, PAGE_PARAM, 1),
            PaginationMode::None => return,
        };
        request.query.insert(size_key.to_string(), json!(size));
        request
            .query
            .entry(cursor_key.to_string())
            .or_insert_with(|| json!(first));
    }

    async fn fetch_all_offset(
        &self,
        mut request: RequestDescriptor,
        page_size: Option<u64>,
    ) -> Result<Vec<Value>, TransportError> {
        let size = self.resolve_page_size(&request, LIMIT_PARAM, page_size);
        let start = cursor_from(&request, SKIP_PARAM).unwrap_or(0);
        let mut state = PaginationState::new(start);

        while state.has_more {
            request.query.insert(SKIP_PARAM.to_string(), json!(state.cursor));
            request.query.insert(LIMIT_PARAM.to_string(), json!(size));
            debug!("Fetching {} skip={} limit={}", request.path, state.cursor, size);

            let page = self.page_items(&self.send(&request).await?);
            state.absorb(page, size);
            state.cursor += size;
        }

        debug!("Fetched {} items from {}", state.items.len(), request.path);
        Ok(state.items)
    }

    async fn fetch_all_pages(
        &self,
        mut request: RequestDescriptor,
        page_size: Option<u64>,
    ) -> Result<Vec<Value>, TransportError> {
        let size = self.resolve_page_size(&request, PER_PAGE_PARAM, page_size);
        let start = cursor_from(&request, PAGE_PARAM).unwrap_or(1);
        let mut state = PaginationState::new(start);

        while state.has_more {
            request.query.insert(PAGE_PARAM.to_string(), json!(state.cursor));
            request.query.insert(PER_PAGE_PARAM.to_string(), json!(size));
            debug!("Fetching {} page={} per_page={}", request.path, state.cursor, size);

            let page = self.page_items(&self.send(&request).await?);
            state.absorb(page, size);
            state.cursor += 1;
        }

        debug!("Fetched {} items from {}", state.items.len(), request.path);
        Ok(state.items)
    }

    /// Explicit limit, then the size already on the request, then the default
    fn resolve_page_size(
        &self,
        request: &RequestDescriptor,
        size_key: &str,
        page_size: Option<u64>,
    ) -> u64 {
        page_size
            .or_else(|| cursor_from(request, size_key))
            .unwrap_or(self.default_page_size)
            .max(1)
    }

    fn page_items(&self, fragment: &Value) -> Vec<Value> {
        match fragment {
            Value::Array(items) => items.clone(),
            other => extract_list(other, self.envelope_key),
        }
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<Value, TransportError> {
        trace!("Query: {:?}", request.query);
        self.transport
            .send(request.method, &request.path, &request.body, &request.query)
            .await
    }
}

fn cursor_from(request: &RequestDescriptor, key: &str) -> Option<u64> {
    request.query.get(key).and_then(value_as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::protocol::HttpMethod;
    use crate::resource::transport::stub::StubTransport;

    fn schema(mode: PaginationMode) -> OperationSchema {
        OperationSchema {
            method: HttpMethod::Get,
            path: "/subscribers".to_string(),
            pagination: mode,
            ..Default::default()
        }
    }

    fn request() -> RequestDescriptor {
        RequestDescriptor::new(HttpMethod::Get, "/subscribers")
    }

    #[tokio::test]
    async fn test_offset_fetch_all_stops_on_short_page() {
        let transport = StubTransport::ok(vec![json!(["a", "b"]), json!(["c"])]);
        let paginator = Paginator::new(&transport, "data");

        let result = paginator
            .drive(request(), &schema(PaginationMode::Offset), true, Some(2))
            .await
            .unwrap();

        assert_eq!(result, json!(["a", "b", "c"]));
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(transport.query_values("skip"), vec![json!(0), json!(2)]);
        assert_eq!(transport.query_values("limit"), vec![json!(2), json!(2)]);
    }

    #[tokio::test]
    async fn test_offset_fetch_all_empty_first_page() {
        let transport = StubTransport::ok(vec![json!([])]);
        let paginator = Paginator::new(&transport, "data");

        let result = paginator
            .drive(request(), &schema(PaginationMode::Offset), true, Some(2))
            .await
            .unwrap();

        assert_eq!(result, json!([]));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_offset_fetch_all_exact_multiple_costs_one_extra_call() {
        let transport = StubTransport::ok(vec![json!(["a", "b"]), json!(["c", "d"]), json!([])]);
        let paginator = Paginator::new(&transport, "data");

        let result = paginator
            .drive(request(), &schema(PaginationMode::Offset), true, Some(2))
            .await
            .unwrap();

        assert_eq!(result, json!(["a", "b", "c", "d"]));
        assert_eq!(
            transport.query_values("skip"),
            vec![json!(0), json!(2), json!(4)]
        );
    }

    #[tokio::test]
    async fn test_offset_fetch_all_starts_from_existing_skip() {
        let transport = StubTransport::ok(vec![json!({"data": ["x"]})]);
        let paginator = Paginator::new(&transport, "data");
        let mut req = request();
        req.query.insert("skip".to_string(), json!("10"));

        let result = paginator
            .drive(req, &schema(PaginationMode::Offset), true, Some(5))
            .await
            .unwrap();

        assert_eq!(result, json!(["x"]));
        assert_eq!(transport.query_values("skip"), vec![json!(10)]);
    }

    #[tokio::test]
    async fn test_offset_fetch_all_uses_default_page_size() {
        let transport = StubTransport::ok(vec![json!([1])]);
        let paginator = Paginator::new(&transport, "data").with_default_page_size(7);

        paginator
            .drive(request(), &schema(PaginationMode::Offset), true, None)
            .await
            .unwrap();

        assert_eq!(transport.query_values("limit"), vec![json!(7)]);
    }

    #[tokio::test]
    async fn test_page_fetch_all() {
        let transport = StubTransport::ok(vec![json!(["a", "b"]), json!(["c", "d"]), json!([])]);
        let paginator = Paginator::new(&transport, "data");

        let result = paginator
            .drive(request(), &schema(PaginationMode::Page), true, Some(2))
            .await
            .unwrap();

        assert_eq!(result, json!(["a", "b", "c", "d"]));
        assert_eq!(
            transport.query_values("page"),
            vec![json!(1), json!(2), json!(3)]
        );
        assert_eq!(
            transport.query_values("per_page"),
            vec![json!(2), json!(2), json!(2)]
        );
    }

    #[tokio::test]
    async fn test_page_fetch_all_reads_envelope_and_existing_cursor() {
        let transport = StubTransport::ok(vec![
            json!({"data": [{"id": 1}, {"id": 2}], "meta": {"page": 3}}),
            json!({"data": [{"id": 3}], "meta": {"page": 4}}),
        ]);
        let paginator = Paginator::new(&transport, "data");
        let mut req = request();
        req.query.insert("page".to_string(), json!(3));
        req.query.insert("per_page".to_string(), json!(2));

        let result = paginator
            .drive(req, &schema(PaginationMode::Page), true, None)
            .await
            .unwrap();

        assert_eq!(result, json!([{"id": 1}, {"id": 2}, {"id": 3}]));
        assert_eq!(transport.query_values("page"), vec![json!(3), json!(4)]);
    }

    #[tokio::test]
    async fn test_single_page_offset_injects_limit_and_skip() {
        let transport = StubTransport::ok(vec![json!({"data": (0..10).collect::<Vec<_>>()})]);
        let paginator = Paginator::new(&transport, "data");

        let result = paginator
            .drive(request(), &schema(PaginationMode::Offset), false, Some(10))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query.get("skip"), Some(&json!(0)));
        assert_eq!(calls[0].query.get("limit"), Some(&json!(10)));
        assert!(result.is_object());
    }

    #[tokio::test]
    async fn test_single_page_keeps_caller_cursor() {
        let transport = StubTransport::ok(vec![json!([])]);
        let paginator = Paginator::new(&transport, "data");
        let mut req = request();
        req.query.insert("page".to_string(), json!(4));

        paginator
            .drive(req, &schema(PaginationMode::Page), false, Some(25))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].query.get("page"), Some(&json!(4)));
        assert_eq!(calls[0].query.get("per_page"), Some(&json!(25)));
    }

    #[tokio::test]
    async fn test_no_pagination_sends_request_as_given() {
        let transport = StubTransport::ok(vec![json!({"id": "c1"})]);
        let paginator = Paginator::new(&transport, "data");

        let result = paginator
            .drive(request(), &schema(PaginationMode::None), true, Some(2))
            .await
            .unwrap();

        assert_eq!(result, json!({"id": "c1"}));
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].query.is_empty());
    }

    #[tokio::test]
    async fn test_non_get_never_paginates() {
        let transport = StubTransport::ok(vec![json!({"ok": true})]);
        let paginator = Paginator::new(&transport, "data");
        let mut post = schema(PaginationMode::Offset);
        post.method = HttpMethod::Post;

        paginator
            .drive(
                RequestDescriptor::new(HttpMethod::Post, "/subscribers"),
                &post,
                false,
                Some(10),
            )
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].query.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_mid_pagination_aborts() {
        let transport = StubTransport::new(vec![
            Ok(json!(["a", "b"])),
            Err(TransportError::Http {
                status: 500,
                payload: json!({"message": "boom"}),
            }),
            Ok(json!(["c"])),
        ]);
        let paginator = Paginator::new(&transport, "data");

        let err = paginator
            .drive(request(), &schema(PaginationMode::Offset), true, Some(2))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(transport.calls().len(), 2);
    }
}
