use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use http::HeaderMap;
use serde::Deserialize;

use crate::cache::result_cache::InMemoryCache;
use crate::config::options::IntrospectionConfig;
use crate::config::settings::SettingsConfig;
use crate::introspection::discovery::endpoint_from_discovery;
use crate::utils::constants::DEFAULT_INTROSPECTION_TIMEOUT_MS;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub introspection: IntrospectionSettings,
}

/// ================================
/// Introspection authority
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct IntrospectionSettings {
    /// invariant: exactly one of `endpoint` / `issuer`
    pub endpoint: Option<String>,
    /// resolved through discovery at startup
    pub issuer: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// extra request headers, never overriding Content-Type / Accept
    #[serde(default, with = "http_serde::header_map")]
    pub headers: HeaderMap,
    /// extra form fields, never overriding token / token_type_hint
    #[serde(default)]
    pub body: BTreeMap<String, String>,
    pub client_auth: Option<ClientAuthConfig>,
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub accept_form_token: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl IntrospectionSettings {
    /// Configured endpoint, or the one published by the issuer. Fails fast on discovery errors.
    pub async fn resolve_endpoint(&self) -> Result<String> {
        match (&self.endpoint, &self.issuer) {
            (Some(endpoint), _) => Ok(endpoint.to_owned()),
            (None, Some(issuer)) => endpoint_from_discovery(issuer)
                .await
                .with_context(|| format!("discovery failed for issuer '{}'", issuer)),
            (None, None) => Err(anyhow!("introspection: neither 'endpoint' nor 'issuer' set")),
        }
    }

    pub fn build_config(&self, endpoint: String) -> Result<IntrospectionConfig<InMemoryCache>> {
        let mut builder = IntrospectionConfig::builder(endpoint)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_added_headers(&self.headers)
            .with_added_body(self.body.clone());

        if let Some(client_auth) = &self.client_auth {
            builder = builder
                .with_basic_auth(&client_auth.client_id, &client_auth.client_secret)
                .context("invalid client_auth")?;
        }
        if self.accept_form_token {
            builder = builder.with_form_token_fallback();
        }
        if let Some(cache) = &self.cache {
            builder = builder.with_cache(InMemoryCache::new(), Duration::from_secs(cache.ttl_seconds));
        }

        builder.build().context("failed to build introspection config")
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_INTROSPECTION_TIMEOUT_MS
}
