use thiserror::Error;

use crate::protocol::ProtocolError;

/// Failure reported by the transport layer for a single request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("unacceptable status code: {status}")]
    Status { status: u16 },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload exceeds max size ({size} > {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure raised by a mapping definition while transforming decoded data.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("missing value at {path}")]
    MissingField { path: String },

    #[error("unexpected value at {path}: expected {expected}, found {found}")]
    UnexpectedType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("persisting mapped object failed: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("object not found: {key}={value}")]
    NotFound { key: String, value: String },

    #[error("{0}")]
    Other(String),
}

/// Terminal error of one pipeline run, delivered through the completion callback.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("transport error: {source}")]
    Transport {
        #[source]
        source: TransportError,
        /// Protocol errors decoded from the failed response's body, if any.
        detail: Option<ProtocolError>,
    },

    #[error("query error: {0}")]
    Query(ProtocolError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("refetch failed: {0}")]
    Refetch(#[from] StoreError),

    /// A stage panicked, or an execution context dropped the run's job.
    #[error("response pipeline abandoned before completion")]
    Abandoned,
}

/// Field-less tag of a [`ResponseError`], for logging and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Query,
    Decode,
    Mapping,
    Refetch,
    Abandoned,
}

impl ResponseError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Query(_) => ErrorKind::Query,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Mapping(_) => ErrorKind::Mapping,
            Self::Refetch(_) => ErrorKind::Refetch,
            Self::Abandoned => ErrorKind::Abandoned,
        }
    }

    /// Protocol errors carried by this error, whether reported alongside a
    /// transport failure or in an otherwise successful response.
    #[must_use]
    pub fn protocol_errors(&self) -> Option<&ProtocolError> {
        match self {
            Self::Transport { detail, .. } => detail.as_ref(),
            Self::Query(errors) => Some(errors),
            _ => None,
        }
    }
}
