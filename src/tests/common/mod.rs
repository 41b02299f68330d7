// tests/common/mod.rs
pub use axum::{Router, body::Body};
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use http::{HeaderMap, HeaderValue};
use http::header::AUTHORIZATION;
use reqwest::Client;

use crate::config::options::IntrospectionConfig;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

/// Authority on `/introspect` answering `body` after `delay`, counting calls.
pub async fn spawn_counting_authority(
    body: serde_json::Value,
    delay: Duration,
) -> (JoinHandle<()>, String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let router = Router::new().route(
        "/introspect",
        post(move || {
            let calls = calls_clone.clone();
            let body = body.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                axum::Json(body)
            }
        }),
    );
    let (handle, addr) = spawn_axum(router).await;
    (handle, format!("http://{}/introspect", addr), calls)
}

pub fn config_for(endpoint: &str) -> IntrospectionConfig {
    IntrospectionConfig::builder(endpoint)
        .with_client(build_reqwest_client())
        .build()
        .expect("introspection config")
}
