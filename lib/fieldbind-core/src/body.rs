//! Body serialization utilities.

use std::any::Any;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Bindable, Result, TypeDescriptor};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Multipart form content type (`multipart/form-data`).
    Multipart,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::Multipart => "multipart/form-data",
            Self::OctetStream => "application/octet-stream",
        }
    }

    /// Match the essence of a `Content-Type` header value (parameters ignored).
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        [Self::Json, Self::FormUrlEncoded, Self::Multipart, Self::OctetStream]
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(essence))
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Structured view of a body-bound value.
///
/// Body formats exchange [`serde_json::Value`] trees with payloads, so any
/// format able to map its documents to that tree can be registered.
pub trait PayloadAccess {
    /// Serialize into a value tree.
    fn to_value(&self) -> Result<serde_json::Value>;

    /// Replace the payload from a value tree.
    ///
    /// The payload is unchanged on error.
    fn replace_from_value(&mut self, value: serde_json::Value) -> Result<()>;
}

/// A field bound to the whole request body.
///
/// # Example
///
/// ```
/// use fieldbind_core::{Bindable, Payload};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct User { name: String }
///
/// let payload = Payload(User { name: "Alice".to_string() });
/// let tree = payload.payload().expect("payload").to_value().expect("serialize");
/// assert_eq!(tree["name"], "Alice");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload<T>(pub T);

impl<T> Payload<T> {
    /// Unwrap the payload.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Payload<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> std::ops::DerefMut for Payload<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Serialize + DeserializeOwned> PayloadAccess for Payload<T> {
    fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.0).map_err(Into::into)
    }

    fn replace_from_value(&mut self, value: serde_json::Value) -> Result<()> {
        self.0 = from_value(value)?;
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned + Send + 'static> Bindable for Payload<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::scalar::<Self>()
    }

    fn descriptor(&self) -> TypeDescriptor {
        Self::describe()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn is_zero(&self) -> bool {
        self.to_value().is_ok_and(|value| value.is_null())
    }

    fn payload(&self) -> Option<&dyn PayloadAccess> {
        Some(self)
    }

    fn payload_mut(&mut self) -> Option<&mut dyn PayloadAccess> {
        Some(self)
    }
}

// ============================================================================
// Body formats
// ============================================================================

/// A body serialization format, selected by name from the `body` directive.
pub trait BodyFormat: Send + Sync {
    /// `Content-Type` of encoded bodies.
    fn content_type(&self) -> &str;

    /// Encode a value tree.
    fn encode(&self, value: &serde_json::Value) -> Result<Bytes>;

    /// Decode a body into a value tree.
    fn decode(&self, body: &[u8]) -> Result<serde_json::Value>;
}

/// The `json` body format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl BodyFormat for JsonFormat {
    fn content_type(&self) -> &str {
        ContentType::Json.as_str()
    }

    fn encode(&self, value: &serde_json::Value) -> Result<Bytes> {
        to_json(value)
    }

    fn decode(&self, body: &[u8]) -> Result<serde_json::Value> {
        from_json(body)
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use fieldbind_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
pub fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

/// Deserialize a value tree with path-aware error messages.
pub fn from_value<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

/// Serialize ordered pairs to form URL-encoded text.
///
/// Uses `serde_html_form`, so repeated keys are kept
/// (e.g., `tags=a&tags=b&tags=c`).
///
/// # Errors
///
/// Returns an error if form serialization fails.
///
/// # Example
///
/// ```
/// use fieldbind_core::to_form;
///
/// let body = to_form(&[("tag", "a b"), ("tag", "c")]).expect("serialize");
/// assert_eq!(body, "tag=a+b&tag=c");
/// ```
pub fn to_form<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Result<String> {
    let pairs: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(key, value)| (key.as_ref(), value.as_ref()))
        .collect();
    serde_html_form::to_string(pairs).map_err(Into::into)
}

/// Parse form URL-encoded text into ordered pairs.
pub fn from_form(body: &[u8]) -> Result<Vec<(String, String)>> {
    serde_urlencoded::from_bytes(body).map_err(Into::into)
}
