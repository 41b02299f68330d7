use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::introspection::result::Introspection;
use crate::observability::metrics::get_metrics;
use crate::server::middleware::IntrospectionOutcome;

static SUBJECT_HEADER: HeaderName = HeaderName::from_static("x-auth-subject");
static CLIENT_ID_HEADER: HeaderName = HeaderName::from_static("x-auth-client-id");
static SCOPE_HEADER: HeaderName = HeaderName::from_static("x-auth-scope");

/// Forward-auth endpoint (nginx `auth_request`, traefik `forwardAuth`, ...).
///
/// 200 with the introspection JSON and `x-auth-*` headers for an active
/// token, 401 for an inactive or missing one, error mapping otherwise.
pub async fn validate(IntrospectionOutcome(outcome): IntrospectionOutcome) -> Response {
    let response = match outcome {
        Ok(result) if result.is_active() => {
            (StatusCode::OK, identity_headers(&result), Json(result.as_ref())).into_response()
        }
        Ok(_) => (StatusCode::UNAUTHORIZED, Json(json!({ "active": false }))).into_response(),
        Err(e) => e.into_response(),
    };

    get_metrics()
        .await
        .validation_responses
        .with_label_values(&[response.status().as_str()])
        .inc();
    response
}

fn identity_headers(result: &Introspection) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let values = [
        (&SUBJECT_HEADER, result.sub()),
        (&CLIENT_ID_HEADER, result.client_id()),
        (&SCOPE_HEADER, result.scope()),
    ];
    for (name, value) in values {
        if let Some(value) = value.and_then(|v| HeaderValue::from_str(&v).ok()) {
            headers.insert(name.clone(), value);
        }
    }
    headers
}
