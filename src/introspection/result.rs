use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::introspection::error::DecodeError;

const ACTIVE_FIELD: &str = "active";

/// Decoded introspection response (RFC 7662 §2.2).
///
/// Only `active` is interpreted. Every other top-level member is kept as the
/// raw JSON text the authority sent, so callers decode what they need and
/// vendor extensions survive untouched.
#[derive(Debug, Clone)]
pub struct Introspection {
    active: bool,
    fields: BTreeMap<String, Box<RawValue>>,
}

impl Introspection {
    pub fn new(active: bool) -> Self {
        Self {
            active,
            fields: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a member. `active` cannot be set this way.
    pub fn with_field<T: Serialize>(mut self, name: &str, value: T) -> Result<Self, serde_json::Error> {
        if name != ACTIVE_FIELD {
            self.fields
                .insert(name.to_owned(), serde_json::value::to_raw_value(&value)?);
        }
        Ok(self)
    }

    /// Decode a response body.
    ///
    /// Fails when the body is not a JSON object, or when `active` is absent or
    /// not a boolean. A missing `active` is never read as `false`.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        let raw: &RawValue =
            serde_json::from_slice(body).map_err(|e| DecodeError::Malformed(Arc::new(e)))?;
        if !raw.get().trim_start().starts_with('{') {
            return Err(DecodeError::NotAnObject);
        }

        let mut fields: BTreeMap<String, Box<RawValue>> =
            serde_json::from_str(raw.get()).map_err(|e| DecodeError::Malformed(Arc::new(e)))?;

        let active = fields.remove(ACTIVE_FIELD).ok_or(DecodeError::MissingActive)?;
        let active: bool = serde_json::from_str(active.get())
            .map_err(|e| DecodeError::InvalidActive(Arc::new(e)))?;

        Ok(Self { active, fields })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Raw JSON of a member other than `active`.
    pub fn raw(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name).map(|v| v.as_ref())
    }

    /// Decode a single member into `T`. `None` when the member is absent.
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Option<Result<T, serde_json::Error>> {
        self.raw(name).map(|raw| serde_json::from_str(raw.get()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// All members except `active`, in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    // ----------------------------------------------------------------
    // RFC 7662 registered members. A member of the wrong type reads as None.
    // ----------------------------------------------------------------

    pub fn scope(&self) -> Option<String> {
        self.lenient("scope")
    }

    /// `scope` split on whitespace.
    pub fn scopes(&self) -> Vec<String> {
        self.scope()
            .map(|s| s.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn client_id(&self) -> Option<String> {
        self.lenient("client_id")
    }

    pub fn username(&self) -> Option<String> {
        self.lenient("username")
    }

    pub fn token_type(&self) -> Option<String> {
        self.lenient("token_type")
    }

    pub fn exp(&self) -> Option<i64> {
        self.lenient("exp")
    }

    pub fn iat(&self) -> Option<i64> {
        self.lenient("iat")
    }

    pub fn nbf(&self) -> Option<i64> {
        self.lenient("nbf")
    }

    pub fn sub(&self) -> Option<String> {
        self.lenient("sub")
    }

    /// `aud` may be a single string or a list of strings.
    pub fn aud(&self) -> Vec<String> {
        match self.lenient::<Audience>("aud") {
            Some(Audience::One(aud)) => vec![aud],
            Some(Audience::Many(aud)) => aud,
            None => Vec::new(),
        }
    }

    pub fn iss(&self) -> Option<String> {
        self.lenient("iss")
    }

    pub fn jti(&self) -> Option<String> {
        self.lenient("jti")
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp().and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    fn lenient<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.field(name).and_then(Result::ok)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl PartialEq for Introspection {
    fn eq(&self, other: &Self) -> bool {
        self.active == other.active
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va.get() == vb.get())
    }
}

impl Eq for Introspection {}

/// Serializes back to the flat object shape of the authority's response.
impl Serialize for Introspection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ACTIVE_FIELD, &self.active)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
