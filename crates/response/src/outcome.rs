use bytes::Bytes;
use std::collections::HashMap;

use crate::error::TransportError;
use crate::json::Payload;

/// Status line and headers of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    pub status: u16,
    pub headers: HashMap<String, String>,
}

impl Default for ResponseMetadata {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
        }
    }
}

/// What the transport produced for one request. Consumed once by the pipeline.
#[derive(Debug)]
pub enum RawOutcome {
    Success {
        payload: Payload,
        metadata: ResponseMetadata,
    },
    TransportFailure {
        error: TransportError,
        /// Response body received before the failure was reported, if any.
        body: Option<Bytes>,
    },
}

impl RawOutcome {
    pub fn success(payload: impl Into<Payload>) -> Self {
        Self::Success {
            payload: payload.into(),
            metadata: ResponseMetadata::default(),
        }
    }

    pub fn failure(error: TransportError) -> Self {
        Self::TransportFailure { error, body: None }
    }

    pub fn failure_with_body(error: TransportError, body: impl Into<Bytes>) -> Self {
        Self::TransportFailure {
            error,
            body: Some(body.into()),
        }
    }
}
