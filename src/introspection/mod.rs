pub mod client;
pub mod discovery;
pub mod error;
pub mod result;

pub use client::introspect;
pub use discovery::{endpoint_from_discovery, must, DiscoveryError};
pub use error::{DecodeError, IntrospectionError};
pub use result::Introspection;
