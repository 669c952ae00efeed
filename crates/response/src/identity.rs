use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Value of a primary key field. Only JSON integers and strings qualify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    String(String),
}

impl KeyValue {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// A mapped object that may only be read on the context that produced it.
///
/// Implementors are typically `!Send`. They cross execution contexts only as
/// their primary key and are re-read from the store on the other side.
pub trait ThreadConfined: 'static {
    /// Name of the primary key field.
    const PRIMARY_KEY: &'static str;

    /// `None` when the object has no usable identity.
    fn primary_key_value(&self) -> Option<KeyValue>;
}
