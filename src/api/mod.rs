pub mod client;
pub mod credentials;
pub mod http;

pub use client::{load_catalog, ApiClient, ClientSettings, Overrides};
pub use http::ApiHttpClient;
