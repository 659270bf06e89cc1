//! Signed, opaque pagination cursors.
//!
//! Wire format: `base64(JSON{p: base64(JSON token), m: base64(HMAC-SHA256(secret, p))})`,
//! all base64 in the URL-safe alphabet without padding so cursors can travel in
//! query strings untouched.

use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::NaiveDateTime;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::search::sort::{SortDirection, SortParam};

type HmacSha256 = Hmac<Sha256>;

/// Reasons a cursor is rejected. All of them surface as `INVALID_CURSOR`.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("cursor is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("cursor is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cursor signature mismatch")]
    Signature,

    #[error("cursor payload has an invalid shape: {0}")]
    Shape(String),

    #[error("cursor does not match the requested sort order")]
    SortMismatch,
}

/// Errors raised while setting up a signer. These are startup-fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorSecretError {
    #[error("cursor secret must not be empty")]
    Empty,

    #[error("cursor secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// Process-wide HMAC secret. Its `Debug` output never shows the value.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct CursorSecret(String);

impl CursorSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Debug for CursorSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("CursorSecret(<redacted>)")
    }
}

/// Typed value of a single sort key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "t", content = "v", rename_all = "lowercase")]
pub enum CursorValue {
    Int(i64),
    Text(String),
    Timestamp(NaiveDateTime),
    Bool(bool),
}

impl PartialOrd for CursorValue {
    /// Values of different kinds are not comparable.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (CursorValue::Int(a), CursorValue::Int(b)) => Some(a.cmp(b)),
            (CursorValue::Text(a), CursorValue::Text(b)) => Some(a.cmp(b)),
            (CursorValue::Timestamp(a), CursorValue::Timestamp(b)) => Some(a.cmp(b)),
            (CursorValue::Bool(a), CursorValue::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<i32> for CursorValue {
    fn from(value: i32) -> Self {
        CursorValue::Int(i64::from(value))
    }
}

impl From<i64> for CursorValue {
    fn from(value: i64) -> Self {
        CursorValue::Int(value)
    }
}

impl From<String> for CursorValue {
    fn from(value: String) -> Self {
        CursorValue::Text(value)
    }
}

impl From<&str> for CursorValue {
    fn from(value: &str) -> Self {
        CursorValue::Text(value.to_string())
    }
}

impl From<NaiveDateTime> for CursorValue {
    fn from(value: NaiveDateTime) -> Self {
        CursorValue::Timestamp(value)
    }
}

impl From<bool> for CursorValue {
    fn from(value: bool) -> Self {
        CursorValue::Bool(value)
    }
}

/// Last-seen value of one sort field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CursorKey {
    #[serde(rename = "f")]
    pub field: String,
    #[serde(rename = "d")]
    pub direction: SortDirection,
    #[serde(rename = "v")]
    pub value: CursorValue,
}

impl CursorKey {
    pub fn new(field: impl Into<String>, direction: SortDirection, value: CursorValue) -> Self {
        Self {
            field: field.into(),
            direction,
            value,
        }
    }
}

/// Resume position: the composite sort key of the last row handed out.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CursorToken {
    #[serde(rename = "k")]
    keys: Vec<CursorKey>,
}

impl CursorToken {
    pub fn new(keys: Vec<CursorKey>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[CursorKey] {
        &self.keys
    }

    pub fn into_keys(self) -> Vec<CursorKey> {
        self.keys
    }

    /// Whether the token was produced under exactly this sort order.
    pub fn matches_sorts(&self, sorts: &[SortParam]) -> bool {
        self.keys.len() == sorts.len()
            && self
                .keys
                .iter()
                .zip(sorts)
                .all(|(key, sort)| key.field == sort.field && key.direction == sort.direction)
    }

    fn validate(&self) -> Result<(), CursorError> {
        if self.keys.is_empty() {
            return Err(CursorError::Shape("no sort keys".to_string()));
        }
        for (idx, key) in self.keys.iter().enumerate() {
            if key.field.trim().is_empty() {
                return Err(CursorError::Shape(format!("key {idx} has an empty field")));
            }
            if self.keys[..idx].iter().any(|prev| prev.field == key.field) {
                return Err(CursorError::Shape(format!(
                    "field {} appears more than once",
                    key.field
                )));
            }
        }
        Ok(())
    }
}

/// Turns resume positions into opaque strings and back.
pub trait CursorSigner {
    /// Serializes and signs `token`.
    fn sign(&self, token: &CursorToken) -> Result<String, CursorError>;

    /// Checks the signature of `cursor` and decodes the token inside it.
    fn verify(&self, cursor: &str) -> Result<CursorToken, CursorError>;
}

impl<T: CursorSigner + ?Sized> CursorSigner for &T {
    fn sign(&self, token: &CursorToken) -> Result<String, CursorError> {
        (**self).sign(token)
    }

    fn verify(&self, cursor: &str) -> Result<CursorToken, CursorError> {
        (**self).verify(cursor)
    }
}

impl<T: CursorSigner + ?Sized> CursorSigner for Arc<T> {
    fn sign(&self, token: &CursorToken) -> Result<String, CursorError> {
        (**self).sign(token)
    }

    fn verify(&self, cursor: &str) -> Result<CursorToken, CursorError> {
        (**self).verify(cursor)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SignedEnvelope {
    p: String,
    m: String,
}

/// HMAC-SHA256 [`CursorSigner`].
#[derive(Clone)]
pub struct HmacCursorSigner {
    mac: HmacSha256,
}

impl HmacCursorSigner {
    pub fn new(secret: &CursorSecret) -> Result<Self, CursorSecretError> {
        if secret.is_empty() {
            return Err(CursorSecretError::Empty);
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| CursorSecretError::InvalidKey)?;
        Ok(Self { mac })
    }

    fn mac_for(&self, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac
    }
}

impl Debug for HmacCursorSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("HmacCursorSigner(<redacted>)")
    }
}

impl CursorSigner for HmacCursorSigner {
    fn sign(&self, token: &CursorToken) -> Result<String, CursorError> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(token)?);
        let signature = self.mac_for(&payload).finalize().into_bytes();
        let envelope = SignedEnvelope {
            m: URL_SAFE_NO_PAD.encode(signature),
            p: payload,
        };
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(&envelope)?))
    }

    fn verify(&self, cursor: &str) -> Result<CursorToken, CursorError> {
        let raw = URL_SAFE_NO_PAD.decode(cursor.trim().as_bytes())?;
        let envelope: SignedEnvelope = serde_json::from_slice(&raw)?;

        let signature = URL_SAFE_NO_PAD.decode(envelope.m.as_bytes())?;
        self.mac_for(&envelope.p)
            .verify_slice(&signature)
            .map_err(|_| CursorError::Signature)?;

        let payload = URL_SAFE_NO_PAD.decode(envelope.p.as_bytes())?;
        let token: CursorToken = serde_json::from_slice(&payload)?;
        token.validate()?;
        Ok(token)
    }
}
