//! # Token Introspection Library
//!
//! Validates opaque bearer tokens against an OAuth 2.0 introspection
//! endpoint (RFC 7662), caches the answers and hands them to request
//! handlers.
//!
//! Modules:
//! - `introspection`: the outbound call, result type, errors and discovery
//! - `config`: builder options and the YAML service config
//! - `cache`: pluggable result cache with a TTL in-memory default
//! - `pipeline`: credential extraction, cache lookup, coalescing
//! - `server`: axum middleware, extractors and the forward-auth route

pub mod cache;
pub mod config;
pub mod introspection;
pub mod pipeline;
pub mod tests;
pub mod observability;
pub mod server;
pub mod helpers;
pub mod utils;

pub use crate::cache::{InMemoryCache, ResultCache};
pub use crate::config::introspection::ServiceConfig;
pub use crate::config::options::IntrospectionConfig;
pub use crate::introspection::{endpoint_from_discovery, must, Introspection, IntrospectionError};
pub use crate::pipeline::Validator;
