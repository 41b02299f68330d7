use std::sync::Arc;

use axum::extract::{FromRef, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use http::{header::CONTENT_TYPE, StatusCode};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::error;

use crate::config::settings::MetricsConfig;

/// Prometheus scrape endpoint. Mounted only when metrics are enabled.
#[derive(Clone)]
pub struct MetricsState {
    pub registry: Arc<Registry>,
}

impl MetricsState {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn router<S>(&self, metrics_config: &MetricsConfig) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
        MetricsState: FromRef<S>,
    {
        if !metrics_config.is_enabled {
            return Router::new();
        }
        Router::new().route(metrics_config.path.as_str(), get(scrape))
    }
}

async fn scrape(State(state): State<MetricsState>) -> Response {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&state.registry.gather(), &mut buffer) {
        error!("failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response();
    }

    (
        StatusCode::OK,
        [(CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        buffer,
    )
        .into_response()
}
