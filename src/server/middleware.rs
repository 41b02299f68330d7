//! Axum wiring of the validation pipeline.
//!
//! [`introspect`] runs the pipeline once per request and attaches the
//! [`Outcome`] to the request extensions. Handlers read it back with the
//! [`IntrospectionOutcome`] or [`Introspected`] extractors; reading it on a
//! route the middleware does not cover yields `NotYetValidated`.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/orders", get(list_orders))
//!     .route_layer(middleware::from_fn_with_state(validator, introspect::<InMemoryCache>));
//!
//! async fn list_orders(Introspected(token): Introspected) -> impl IntoResponse { .. }
//! ```

use std::convert::Infallible;
use std::future::poll_fn;
use std::pin::pin;
use std::sync::Arc;

use axum::body::{Body, HttpBody};
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::cache::result_cache::ResultCache;
use crate::introspection::error::IntrospectionError;
use crate::introspection::result::Introspection;
use crate::pipeline::extract::{bearer_from_headers, extract_token, is_form_post};
use crate::pipeline::outcome::{self, Outcome};
use crate::pipeline::validator::Validator;
use crate::utils::constants::FORM_BODY_LIMIT_BYTES;

/// Validate the request's credential and attach the outcome. Never rejects on
/// its own; what to do with a failed outcome is up to the handler.
pub async fn introspect<C: ResultCache>(
    State(validator): State<Validator<C>>,
    req: Request,
    next: Next,
) -> Response {
    let (mut req, outcome) = match validate_request(&validator, req).await {
        Ok(validated) => validated,
        Err(response) => return response,
    };
    outcome::attach(req.extensions_mut(), outcome);
    next.run(req).await
}

async fn validate_request<C: ResultCache>(
    validator: &Validator<C>,
    req: Request,
) -> Result<(Request, Outcome), Response> {
    if let Some(token) = bearer_from_headers(req.headers()) {
        let token = token.to_owned();
        let outcome = validator.validate(&token).await;
        return Ok((req, outcome));
    }

    if !validator.config().form_token_fallback() || !is_form_post(req.method(), req.headers()) {
        return Ok((req, Err(IntrospectionError::NoCredential)));
    }

    // the body is buffered to look for access_token and handed on unchanged
    let (parts, body) = req.into_parts();
    let bytes = read_form_body(body, FORM_BODY_LIMIT_BYTES).await?;

    let outcome = match extract_token(&parts.headers, Some(bytes.as_slice())) {
        Ok(token) => validator.validate(&token).await,
        Err(e) => Err(e),
    };
    Ok((Request::from_parts(parts, Body::from(bytes)), outcome))
}

/// Buffer at most `limit` bytes: 413 past the limit, 400 when the body stream fails.
async fn read_form_body(body: Body, limit: usize) -> Result<Vec<u8>, Response> {
    let mut body = pin!(body);
    let mut buffer = Vec::new();

    while let Some(frame) = poll_fn(|cx| body.as_mut().poll_frame(cx)).await {
        let frame = frame.map_err(|e| {
            warn!(error = %e, "failed to read form body");
            (StatusCode::BAD_REQUEST, "failed to read request body").into_response()
        })?;
        let Ok(data) = frame.into_data() else {
            continue;
        };
        if buffer.len() + data.len() > limit {
            warn!(limit, "form body exceeds limit");
            return Err((StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response());
        }
        buffer.extend_from_slice(&data);
    }
    Ok(buffer)
}

/// The attached outcome as is. Never rejects.
#[derive(Debug, Clone)]
pub struct IntrospectionOutcome(pub Outcome);

impl<S: Send + Sync> FromRequestParts<S> for IntrospectionOutcome {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(outcome::from_extensions(&parts.extensions)))
    }
}

/// The authority's answer. Rejects with the [`IntrospectionError`] response
/// when there is none. `active` is not checked here.
#[derive(Debug, Clone)]
pub struct Introspected(pub Arc<Introspection>);

impl<S: Send + Sync> FromRequestParts<S> for Introspected {
    type Rejection = IntrospectionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        outcome::from_extensions(&parts.extensions).map(Self)
    }
}
