//! OpenID Connect discovery of the introspection endpoint.
//!
//! Used once at startup to turn an issuer URL into the `endpoint` of an
//! [`IntrospectionConfig`](crate::config::options::IntrospectionConfig). Not on the request path.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use crate::observability::metrics::get_metrics;
use crate::utils::constants::{DEFAULT_DISCOVERY_TIMEOUT_MS, DISCOVERY_PATH};

#[derive(Debug, Clone, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no issuer passed")]
    EmptyIssuer,
    #[error("invalid issuer url '{issuer}': {source}")]
    InvalidIssuer {
        issuer: String,
        #[source]
        source: url::ParseError,
    },
    #[error("discovery request failed: {0}")]
    Transport(#[source] Arc<reqwest::Error>),
    #[error("discovery document request returned status {0}")]
    Status(StatusCode),
    #[error("discovery document is not valid JSON: {0}")]
    Decode(#[source] Arc<serde_json::Error>),
    #[error("discovery document has no introspection_endpoint")]
    MissingEndpoint,
}

impl From<reqwest::Error> for DiscoveryError {
    fn from(err: reqwest::Error) -> Self {
        DiscoveryError::Transport(Arc::new(err))
    }
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    introspection_endpoint: Option<String>,
}

/// `<issuer>/.well-known/openid-configuration`, with or without a trailing slash on the issuer.
pub fn discovery_url(issuer: &str) -> Result<Url, DiscoveryError> {
    if issuer.is_empty() {
        return Err(DiscoveryError::EmptyIssuer);
    }
    let base = if issuer.ends_with('/') {
        issuer.to_owned()
    } else {
        format!("{}/", issuer)
    };
    Url::parse(&base)
        .and_then(|base| base.join(DISCOVERY_PATH))
        .map_err(|source| DiscoveryError::InvalidIssuer {
            issuer: issuer.to_owned(),
            source,
        })
}

/// Fetch the issuer's discovery document and return its `introspection_endpoint`.
pub async fn endpoint_from_discovery(issuer: &str) -> Result<String, DiscoveryError> {
    let client = Client::builder()
        .timeout(Duration::from_millis(DEFAULT_DISCOVERY_TIMEOUT_MS))
        .build()?;
    endpoint_from_discovery_with(&client, issuer).await
}

/// Same as [`endpoint_from_discovery`] with a caller-supplied client.
pub async fn endpoint_from_discovery_with(
    client: &Client,
    issuer: &str,
) -> Result<String, DiscoveryError> {
    let result = fetch_endpoint(client, issuer).await;
    match &result {
        Ok(endpoint) => info!(issuer, endpoint = %endpoint, "introspection endpoint discovered"),
        Err(err) => {
            get_metrics().await.discovery_failures.inc();
            error!(issuer, error = %err, "introspection endpoint discovery failed");
        }
    }
    result
}

async fn fetch_endpoint(client: &Client, issuer: &str) -> Result<String, DiscoveryError> {
    let url = discovery_url(issuer)?;

    let response = client.get(url).send().await?;
    if response.status() != StatusCode::OK {
        return Err(DiscoveryError::Status(response.status()));
    }

    let body = response.bytes().await?;
    let document: DiscoveryDocument =
        serde_json::from_slice(&body).map_err(|e| DiscoveryError::Decode(Arc::new(e)))?;

    document
        .introspection_endpoint
        .filter(|endpoint| !endpoint.is_empty())
        .ok_or(DiscoveryError::MissingEndpoint)
}

/// Unwraps a configuration-time result, panicking on error.
///
/// Meant for startup code such as `must(endpoint_from_discovery(iss).await)`,
/// where an unreachable authority is a deployment error.
///
/// # Panics
///
/// Panics with the error's message when `result` is `Err`.
pub fn must<T, E: Display>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{}", err),
    }
}
