pub mod common;
pub mod discovery_flow;
pub mod expiration_and_cache;
