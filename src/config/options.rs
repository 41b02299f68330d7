use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use reqwest::Client;

use crate::cache::result_cache::{InMemoryCache, ResultCache};
use crate::utils::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_INTROSPECTION_TIMEOUT_MS, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE,
    TOKEN_FIELD, TOKEN_TYPE_HINT_FIELD, TOKEN_TYPE_HINT_VALUE,
};

/// Form fields of the introspection request. Multi-valued like any urlencoded form.
pub type FormFields = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("invalid basic auth credentials: {0}")]
    BasicAuth(#[from] http::header::InvalidHeaderValue),
}

/// Fully resolved request parameters. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct IntrospectionConfig<C = InMemoryCache> {
    endpoint: String,
    headers: HeaderMap,
    body: FormFields,
    client: Client,
    cache: Option<C>,
    cache_ttl: Duration,
    form_token_fallback: bool,
}

impl IntrospectionConfig<InMemoryCache> {
    /// Builder seeded with the protocol defaults:
    /// `Content-Type: application/x-www-form-urlencoded`, `Accept: application/json`,
    /// `token=""`, `token_type_hint=access_token`, 2s timeout, no cache.
    pub fn builder(endpoint: impl Into<String>) -> ConfigBuilder<InMemoryCache> {
        ConfigBuilder::new(endpoint.into())
    }
}

impl<C: ResultCache> IntrospectionConfig<C> {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &FormFields {
        &self.body
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn cache(&self) -> Option<&C> {
        self.cache.as_ref()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn form_token_fallback(&self) -> bool {
        self.form_token_fallback
    }
}

/// Applies options in call order. Header and body options only add keys that
/// are not present yet; the first value written for a key wins.
#[derive(Debug)]
pub struct ConfigBuilder<C> {
    endpoint: String,
    headers: HeaderMap,
    body: FormFields,
    client: Option<Client>,
    timeout: Duration,
    cache: Option<C>,
    cache_ttl: Duration,
    form_token_fallback: bool,
}

impl ConfigBuilder<InMemoryCache> {
    fn new(endpoint: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let mut body = FormFields::new();
        body.insert(TOKEN_FIELD.to_owned(), vec![String::new()]);
        body.insert(
            TOKEN_TYPE_HINT_FIELD.to_owned(),
            vec![TOKEN_TYPE_HINT_VALUE.to_owned()],
        );

        Self {
            endpoint,
            headers,
            body,
            client: None,
            timeout: Duration::from_millis(DEFAULT_INTROSPECTION_TIMEOUT_MS),
            cache: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            form_token_fallback: false,
        }
    }
}

impl<C: ResultCache> ConfigBuilder<C> {
    /// Adds headers whose names are not set yet. Names compare case-insensitively.
    pub fn with_added_headers(mut self, headers: &HeaderMap) -> Self {
        for name in headers.keys() {
            if self.headers.contains_key(name) {
                continue;
            }
            for value in headers.get_all(name) {
                self.headers.append(name.clone(), value.clone());
            }
        }
        self
    }

    /// Adds form fields whose names are not set yet.
    pub fn with_added_body<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut added = FormFields::new();
        for (name, value) in fields {
            added.entry(name.into()).or_default().push(value.into());
        }
        for (name, values) in added {
            self.body.entry(name).or_insert(values);
        }
        self
    }

    /// Client authentication for the authority (RFC 7662 §2.1), as an added header.
    pub fn with_basic_auth(self, client_id: &str, client_secret: &str) -> Result<Self, ConfigError> {
        let encoded = STANDARD.encode(format!("{}:{}", client_id, client_secret));
        let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(self.with_added_headers(&headers))
    }

    /// Caches successful results in `cache` for `ttl`.
    pub fn with_cache<D: ResultCache>(self, cache: D, ttl: Duration) -> ConfigBuilder<D> {
        ConfigBuilder {
            endpoint: self.endpoint,
            headers: self.headers,
            body: self.body,
            client: self.client,
            timeout: self.timeout,
            cache: Some(cache),
            cache_ttl: ttl,
            form_token_fallback: self.form_token_fallback,
        }
    }

    /// Timeout of the whole outbound call. Ignored when a client is supplied.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a preconfigured transport. Its own timeout governs the call.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Also accept the token from an `access_token` POST form field.
    pub fn with_form_token_fallback(mut self) -> Self {
        self.form_token_fallback = true;
        self
    }

    pub fn build(self) -> Result<IntrospectionConfig<C>, ConfigError> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder().timeout(self.timeout).build()?,
        };

        Ok(IntrospectionConfig {
            endpoint: self.endpoint,
            headers: self.headers,
            body: self.body,
            client,
            cache: self.cache,
            cache_ttl: self.cache_ttl,
            form_token_fallback: self.form_token_fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderName;

    #[test]
    fn defaults_are_seeded() {
        let config = IntrospectionConfig::builder("http://localhost/introspect")
            .build()
            .unwrap();

        assert_eq!(config.headers()[CONTENT_TYPE], FORM_CONTENT_TYPE);
        assert_eq!(config.headers()[ACCEPT], JSON_CONTENT_TYPE);
        assert_eq!(config.body()[TOKEN_FIELD], vec![String::new()]);
        assert_eq!(config.body()[TOKEN_TYPE_HINT_FIELD], vec!["access_token"]);
        assert!(config.cache().is_none());
        assert!(!config.form_token_fallback());
    }

    #[test]
    fn added_headers_never_override_existing_names() {
        let mut added = HeaderMap::new();
        added.insert(
            HeaderName::from_static("content-type"),
            HeaderValue::from_static("text/plain"),
        );
        added.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        added.append("x-api-key", HeaderValue::from_static("one"));
        added.append("x-api-key", HeaderValue::from_static("two"));

        let mut later = HeaderMap::new();
        later.insert(
            HeaderName::from_bytes(b"X-API-KEY").unwrap(),
            HeaderValue::from_static("three"),
        );

        let config = IntrospectionConfig::builder("http://localhost/introspect")
            .with_added_headers(&added)
            .with_added_headers(&later)
            .build()
            .unwrap();

        assert_eq!(config.headers()[CONTENT_TYPE], FORM_CONTENT_TYPE);
        assert_eq!(config.headers()[ACCEPT], JSON_CONTENT_TYPE);
        let keys: Vec<_> = config.headers().get_all("x-api-key").iter().collect();
        assert_eq!(keys, vec!["one", "two"]);
    }

    #[test]
    fn added_body_never_overrides_existing_fields() {
        let config = IntrospectionConfig::builder("http://localhost/introspect")
            .with_added_body([
                ("api", "hell"),
                ("token", "wrong-token"),
                ("token_type_hint", "refresh_token"),
            ])
            .with_added_body([("api", "other"), ("api_secret", "yeah")])
            .build()
            .unwrap();

        assert_eq!(config.body()["api"], vec!["hell"]);
        assert_eq!(config.body()["api_secret"], vec!["yeah"]);
        assert_eq!(config.body()[TOKEN_FIELD], vec![String::new()]);
        assert_eq!(config.body()[TOKEN_TYPE_HINT_FIELD], vec!["access_token"]);
    }

    #[test]
    fn basic_auth_is_an_added_header() {
        let config = IntrospectionConfig::builder("http://localhost/introspect")
            .with_basic_auth("hell", "yeah")
            .unwrap()
            .build()
            .unwrap();

        let value = &config.headers()[AUTHORIZATION];
        assert_eq!(value, "Basic aGVsbDp5ZWFo");
        assert!(value.is_sensitive());
    }

    #[tokio::test]
    async fn cache_option_switches_cache_type() {
        let config = IntrospectionConfig::builder("http://localhost/introspect")
            .with_cache(InMemoryCache::new(), Duration::from_secs(5))
            .with_form_token_fallback()
            .build()
            .unwrap();

        assert!(config.cache().is_some());
        assert_eq!(config.cache_ttl(), Duration::from_secs(5));
        assert!(config.form_token_fallback());
    }
}
