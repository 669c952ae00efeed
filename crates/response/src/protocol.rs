use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One entry of a GraphQL response's top-level `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<SourceLocation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(u64),
    Field(String),
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        }
    }

    /// Parse one error entry. Entries that don't match the expected shape
    /// keep their `message` when it is a string, or their raw JSON text.
    pub fn from_json(entry: &Value) -> Self {
        if let Ok(error) = Self::deserialize(entry) {
            return error;
        }
        match entry.get("message").and_then(Value::as_str) {
            Some(message) => Self::new(message),
            None => Self::new(entry.to_string()),
        }
    }
}

/// Protocol-level errors found in a response payload, independent of the
/// transport status.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolError {
    errors: Vec<GraphQLError>,
}

impl ProtocolError {
    pub fn new(errors: Vec<GraphQLError>) -> Self {
        Self { errors }
    }

    /// Extract the top-level `errors` array of a response.
    ///
    /// Returns `None` when the key is absent, `null`, or not an array. An
    /// empty array still counts as an error report.
    pub fn from_response(response: &Value) -> Option<Self> {
        let entries = response.get("errors")?.as_array()?;
        Some(Self::new(
            entries.iter().map(GraphQLError::from_json).collect(),
        ))
    }

    pub fn errors(&self) -> &[GraphQLError] {
        &self.errors
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.message.as_str())
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("empty error list");
        }
        for (i, message) in self.messages().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str(message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}
