use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method};

use crate::introspection::error::IntrospectionError;
use crate::utils::constants::{BEARER_SCHEME, FORM_CONTENT_TYPE, FORM_TOKEN_FIELD};

/// Token from `Authorization: Bearer <token>`. Scheme match is case-insensitive.
pub fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Token from the `access_token` field of an urlencoded body.
pub fn token_from_form(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(name, _)| name == FORM_TOKEN_FIELD)
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

/// Whether the request could carry a form-encoded token at all.
pub fn is_form_post(method: &Method, headers: &HeaderMap) -> bool {
    if method != Method::POST {
        return false;
    }
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// Header first, then the form body when one is given. First hit wins.
pub fn extract_token(headers: &HeaderMap, form: Option<&[u8]>) -> Result<String, IntrospectionError> {
    if let Some(token) = bearer_from_headers(headers) {
        return Ok(token.to_owned());
    }
    form.and_then(token_from_form)
        .ok_or(IntrospectionError::NoCredential)
}
