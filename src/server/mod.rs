pub mod middleware;
pub mod server;
pub mod validate;

pub use middleware::{introspect, Introspected, IntrospectionOutcome};
