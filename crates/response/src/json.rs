use bytes::Bytes;
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::DecodeError;

/// Raw response body as handed over by the transport.
#[derive(Debug, Clone)]
pub enum Payload {
    Bytes(Bytes),
    /// Body the transport already deserialized into a generic value.
    Value(Value),
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static str> for Payload {
    fn from(text: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Immutable, cheaply cloneable JSON tree.
///
/// There is no mutable access to the inner value, so clones can be shared
/// across execution contexts without synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonValue(Arc<Value>);

impl JsonValue {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Deref for JsonValue {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        Self(Arc::new(value))
    }
}

/// Converts raw payloads into [`JsonValue`] trees.
#[derive(Debug, Clone, Copy)]
pub struct JsonDecoder {
    max_payload_size: usize,
}

impl JsonDecoder {
    #[must_use]
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    /// Decode a payload. Top-level scalars are accepted.
    ///
    /// # Errors
    /// Returns `DecodeError::PayloadTooLarge` for byte payloads above the
    /// configured limit and `DecodeError::Json` for malformed input.
    pub fn decode(&self, payload: Payload) -> Result<JsonValue, DecodeError> {
        match payload {
            Payload::Value(value) => Ok(JsonValue::from(value)),
            Payload::Bytes(bytes) => {
                if bytes.len() > self.max_payload_size {
                    return Err(DecodeError::PayloadTooLarge {
                        size: bytes.len(),
                        max: self.max_payload_size,
                    });
                }
                let value: Value = serde_json::from_slice(&bytes)?;
                Ok(JsonValue::from(value))
            }
        }
    }
}
