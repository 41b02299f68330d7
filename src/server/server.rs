use anyhow::{Context, Result};
use axum::extract::FromRef;
use axum::middleware::from_fn_with_state;
use axum::routing::any;
use axum::Router;
use tracing::info;

use crate::cache::result_cache::InMemoryCache;
use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::pipeline::validator::Validator;
use crate::server::middleware::introspect;
use crate::server::validate::validate;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub validator: Validator,
}

impl AppState {
    pub fn new(metrics: &Metrics, validator: Validator) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            validator,
        }
    }
}

impl FromRef<AppState> for MetricsState {
    fn from_ref(state: &AppState) -> Self {
        state.metrics_state.clone()
    }
}

/// Metrics route plus the forward-auth route behind the introspection middleware.
pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    let validate_route = Router::new()
        .route(settings_config.server.validate_path.as_str(), any(validate))
        .route_layer(from_fn_with_state(
            state.validator.clone(),
            introspect::<InMemoryCache>,
        ));

    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(validate_route)
        .with_state(state)
}

/// Serve the forward-auth and metrics routes until ctrl-c.
pub async fn start(settings_config: &SettingsConfig, validator: Validator) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(settings_config, AppState::new(metrics, validator));

    let bind_addr = format!(
        "{}:{}",
        settings_config.server.host, settings_config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!(address = %bind_addr, "listening");

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    metrics.up.set(0);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
