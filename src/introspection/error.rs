use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Every way a validation can end without a usable [`Introspection`](super::Introspection).
///
/// Sources are held in `Arc` so a single outcome can be handed to every
/// coalesced waiter and stored in request extensions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IntrospectionError {
    /// The request carried no bearer credential. Nothing was validated.
    #[error("no bearer")]
    NoCredential,

    /// The authority could not be reached (connect, DNS, timeout, malformed endpoint).
    #[error("introspection request failed: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// The authority answered with something other than `200 OK`.
    #[error("status does not indicate success: code: {status}")]
    AuthorityRejected { status: StatusCode },

    /// The authority answered `200 OK` with a body we cannot accept.
    #[error("invalid introspection response: {0}")]
    Decode(#[from] DecodeError),

    /// The outcome was requested before the pipeline ran for this request.
    #[error("introspection middleware didn't execute")]
    NotYetValidated,
}

impl IntrospectionError {
    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            IntrospectionError::NoCredential => "no_credential",
            IntrospectionError::Transport(_) => "transport",
            IntrospectionError::AuthorityRejected { .. } => "authority_rejected",
            IntrospectionError::Decode(_) => "decode",
            IntrospectionError::NotYetValidated => "not_yet_validated",
        }
    }
}

impl From<reqwest::Error> for IntrospectionError {
    fn from(err: reqwest::Error) -> Self {
        IntrospectionError::Transport(Arc::new(err))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
    #[error("body is not valid JSON: {0}")]
    Malformed(#[source] Arc<serde_json::Error>),

    #[error("body is not a JSON object")]
    NotAnObject,

    #[error("mandatory field 'active' is missing")]
    MissingActive,

    #[error("field 'active' is not a boolean: {0}")]
    InvalidActive(#[source] Arc<serde_json::Error>),
}

impl IntoResponse for IntrospectionError {
    fn into_response(self) -> Response {
        let status = match self {
            IntrospectionError::NoCredential => StatusCode::UNAUTHORIZED,
            IntrospectionError::Transport(_)
            | IntrospectionError::AuthorityRejected { .. }
            | IntrospectionError::Decode(_) => StatusCode::BAD_GATEWAY,
            IntrospectionError::NotYetValidated => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "active": false,
            "error": self.reason(),
            "error_description": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
