//! mailroom - declarative dispatcher for a newsletter-management REST API
//!
//! Operations are declared in a JSON catalog (method, path template,
//! parameter wiring, pagination mode). The [`resource`] module turns a
//! catalog entry plus per-item parameters into HTTP calls and normalizes
//! the responses; the [`api`] module provides the authenticated transport.

pub mod api;
pub mod resource;
