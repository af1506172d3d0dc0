//! Request encodings, response decodings and decode targets.
//!
//! Codecs are object-safe: values cross the codec boundary as
//! [`serde_json::Value`], which carries the serde data model for any
//! `Serialize`/`Deserialize` type. The conversion to and from the caller's
//! own type happens where that type is still known, in
//! [`Request::body_encode`](crate::Request::body_encode) and [`Slot`].

use crate::error::BoxError;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Content type used by [`JsonCodec`].
pub const APPLICATION_JSON: &str = "application/json";

/// Content type used by [`FormCodec`] and `body_form`.
pub const APPLICATION_FORM: &str = "application/x-www-form-urlencoded";

/// Something that produces or consumes one content type.
pub trait Encoding: Send + Sync {
    /// The MIME type of the encoded bytes.
    fn content_type(&self) -> &str;
}

/// Encodes request bodies.
pub trait RequestEncoding: Encoding {
    /// Encode `value` into the request body bytes.
    fn encode(&self, value: &Value) -> Result<Bytes, BoxError>;
}

/// Decodes response bodies.
pub trait ResponseEncoding: Encoding {
    /// Decode the response body bytes.
    fn decode(&self, body: &[u8]) -> Result<Value, BoxError>;
}

/// An encoding usable in both directions.
pub trait Codec: RequestEncoding + ResponseEncoding {}

impl<T> Codec for T where T: RequestEncoding + ResponseEncoding {}

/// JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Encoding for JsonCodec {
    fn content_type(&self) -> &str {
        APPLICATION_JSON
    }
}

impl RequestEncoding for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }
}

impl ResponseEncoding for JsonCodec {
    fn decode(&self, body: &[u8]) -> Result<Value, BoxError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// `application/x-www-form-urlencoded` via `serde_urlencoded`.
///
/// Only flat values encode; nested objects and arrays are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl Encoding for FormCodec {
    fn content_type(&self) -> &str {
        APPLICATION_FORM
    }
}

impl RequestEncoding for FormCodec {
    fn encode(&self, value: &Value) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(serde_urlencoded::to_string(value)?))
    }
}

impl ResponseEncoding for FormCodec {
    fn decode(&self, body: &[u8]) -> Result<Value, BoxError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Ok(Value::Object(map))
    }
}

/// Shared cell a response body is decoded into.
///
/// Clones share the same cell, so keep one and hand a clone to the builder:
///
/// ```
/// use rmq_web::Slot;
///
/// let slot: Slot<u32> = Slot::new();
/// let target = slot.clone();
/// target.set(7);
/// assert_eq!(slot.take(), Some(7));
/// ```
pub struct Slot<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Slot<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Store a value, replacing any previous one.
    pub fn set(&self, value: T) {
        *self.inner.lock() = Some(value);
    }

    /// Take the value out, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.inner.lock().take()
    }

    /// Check if a value is present.
    pub fn is_set(&self) -> bool {
        self.inner.lock().is_some()
    }
}

impl<T: Clone> Slot<T> {
    /// A copy of the current value.
    pub fn get(&self) -> Option<T> {
        self.inner.lock().clone()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.inner.lock()).finish()
    }
}

/// Type-erased receiver of a decoded value.
pub(crate) trait DecodeTarget: Send + Sync {
    fn fill(&self, value: Value) -> Result<(), BoxError>;
}

impl<T> DecodeTarget for Slot<T>
where
    T: DeserializeOwned + Send,
{
    fn fill(&self, value: Value) -> Result<(), BoxError> {
        self.set(serde_json::from_value(value)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Greeting {
        text: String,
    }

    #[test]
    fn test_json_keeps_field_order() {
        let body = JsonCodec.encode(&json!({"zeta": 1, "alpha": 2})).unwrap();
        assert_eq!(&body[..], br#"{"zeta":1,"alpha":2}"#);
    }

    #[test]
    fn test_form_encodes_flat_objects() {
        let body = FormCodec
            .encode(&json!({"name": "a b", "page": "2"}))
            .unwrap();
        assert_eq!(&body[..], b"name=a+b&page=2");
        assert!(FormCodec.encode(&json!({"nested": {"x": 1}})).is_err());
    }

    #[test]
    fn test_form_decode() {
        let value = FormCodec.decode(b"text=hi+there").unwrap();
        assert_eq!(value, json!({"text": "hi there"}));
    }

    #[test]
    fn test_slot_fill() {
        let slot: Slot<Greeting> = Slot::new();
        slot.fill(json!({"text": "Hello"})).unwrap();
        assert_eq!(
            slot.take(),
            Some(Greeting {
                text: "Hello".to_string()
            })
        );
        assert!(!slot.is_set());
    }

    #[test]
    fn test_slot_fill_rejects_wrong_shape() {
        let slot: Slot<Greeting> = Slot::new();
        assert!(slot.fill(json!([1, 2, 3])).is_err());
        assert!(!slot.is_set());
    }
}
