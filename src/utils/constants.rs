//! Shared constants and invariants

pub const DEFAULT_INTROSPECTION_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

// Introspection request (RFC 7662 §2.1)
pub const TOKEN_FIELD: &str = "token";
pub const TOKEN_TYPE_HINT_FIELD: &str = "token_type_hint";
pub const TOKEN_TYPE_HINT_VALUE: &str = "access_token";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

// Bearer credentials (RFC 6750 §2.1, §2.2)
pub const BEARER_SCHEME: &str = "bearer";
pub const FORM_TOKEN_FIELD: &str = "access_token";
pub const FORM_BODY_LIMIT_BYTES: usize = 64 * 1024;

pub const DISCOVERY_PATH: &str = ".well-known/openid-configuration";
