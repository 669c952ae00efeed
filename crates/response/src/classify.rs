use bytes::Bytes;

use crate::error::ResponseError;
use crate::json::{JsonDecoder, JsonValue, Payload};
use crate::outcome::RawOutcome;
use crate::protocol::ProtocolError;

#[derive(Debug)]
pub enum Classification {
    /// Transport succeeded and the payload carries no protocol errors.
    Proceed(JsonValue),
    Fail(ResponseError),
}

/// Decides whether a transport outcome is a protocol-level success.
///
/// Transport failures are checked first. A successful transport response
/// whose payload carries a top-level `errors` array is still a failure.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    decoder: JsonDecoder,
}

impl Classifier {
    #[must_use]
    pub fn new(decoder: JsonDecoder) -> Self {
        Self { decoder }
    }

    pub fn classify(&self, outcome: RawOutcome) -> Classification {
        match outcome {
            RawOutcome::TransportFailure { error, body } => {
                let detail = body.and_then(|body| self.failure_detail(body));
                Classification::Fail(ResponseError::Transport {
                    source: error,
                    detail,
                })
            }
            RawOutcome::Success { payload, metadata } => {
                let json = match self.decoder.decode(payload) {
                    Ok(json) => json,
                    Err(e) => return Classification::Fail(e.into()),
                };

                if let Some(errors) = ProtocolError::from_response(&json) {
                    tracing::debug!(
                        status = metadata.status,
                        count = errors.errors().len(),
                        "protocol errors in successful response"
                    );
                    return Classification::Fail(ResponseError::Query(errors));
                }

                Classification::Proceed(json)
            }
        }
    }

    /// Best-effort: a body that doesn't decode must not mask the transport error.
    fn failure_detail(&self, body: Bytes) -> Option<ProtocolError> {
        match self.decoder.decode(Payload::Bytes(body)) {
            Ok(json) => ProtocolError::from_response(&json),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring undecodable transport failure body");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, TransportError};
    use serde_json::json;

    fn classifier() -> Classifier {
        Classifier::new(JsonDecoder::new(1_048_576))
    }

    #[test]
    fn clean_payload_proceeds() {
        let outcome = RawOutcome::success(r#"{"data":{"film":{"id":1}},"errors":null}"#);
        match classifier().classify(outcome) {
            Classification::Proceed(json) => assert_eq!(json["data"]["film"]["id"], 1),
            Classification::Fail(e) => panic!("expected Proceed, got: {e:?}"),
        }
    }

    #[test]
    fn protocol_errors_override_transport_success() {
        let outcome = RawOutcome::success(json!({"errors": [{"message": "bad field"}]}));
        match classifier().classify(outcome) {
            Classification::Fail(ResponseError::Query(errors)) => {
                assert_eq!(errors.messages().collect::<Vec<_>>(), vec!["bad field"]);
            }
            other => panic!("expected Query, got: {other:?}"),
        }
    }

    #[test]
    fn partial_data_with_errors_is_a_failure() {
        let outcome = RawOutcome::success(json!({
            "data": {"film": {"id": 1}},
            "errors": [{"message": "partial"}]
        }));
        assert!(matches!(
            classifier().classify(outcome),
            Classification::Fail(ResponseError::Query(_))
        ));
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        let outcome = RawOutcome::success("not json");
        assert!(matches!(
            classifier().classify(outcome),
            Classification::Fail(ResponseError::Decode(DecodeError::Json(_)))
        ));
    }

    #[test]
    fn transport_failure_without_body() {
        let outcome = RawOutcome::failure(TransportError::Timeout);
        match classifier().classify(outcome) {
            Classification::Fail(ResponseError::Transport { source, detail }) => {
                assert!(matches!(source, TransportError::Timeout));
                assert!(detail.is_none());
            }
            other => panic!("expected Transport, got: {other:?}"),
        }
    }

    #[test]
    fn transport_failure_keeps_protocol_detail() {
        let outcome = RawOutcome::failure_with_body(
            TransportError::Status { status: 400 },
            r#"{"errors":[{"message":"syntax error","locations":[{"line":1,"column":2}]}]}"#,
        );
        match classifier().classify(outcome) {
            Classification::Fail(ResponseError::Transport { source, detail }) => {
                assert!(matches!(source, TransportError::Status { status: 400 }));
                let detail = detail.expect("protocol detail");
                assert_eq!(detail.errors()[0].message, "syntax error");
            }
            other => panic!("expected Transport, got: {other:?}"),
        }
    }

    #[test]
    fn undecodable_failure_body_is_swallowed() {
        let outcome = RawOutcome::failure_with_body(
            TransportError::Status { status: 502 },
            "<html>Bad Gateway</html>",
        );
        match classifier().classify(outcome) {
            Classification::Fail(ResponseError::Transport { source, detail }) => {
                assert!(matches!(source, TransportError::Status { status: 502 }));
                assert!(detail.is_none());
            }
            other => panic!("expected Transport, got: {other:?}"),
        }
    }
}
