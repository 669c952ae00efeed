use std::sync::Arc;
use tokio::sync::oneshot;
use ulid::Ulid;

use crate::classify::{Classification, Classifier};
use crate::completion::{Completion, CompletionResult};
use crate::context::ExecutionContext;
use crate::error::ResponseError;
use crate::handoff::Handoff;
use crate::json::{JsonDecoder, JsonValue};
use crate::mapping::{DomainResult, Mapping};
use crate::outcome::RawOutcome;

#[derive(Debug, Clone)]
pub struct ResponseHandlerConfig {
    /// Byte payloads larger than this fail to decode.
    pub max_payload_size: usize,
}

impl Default for ResponseHandlerConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 10_485_760, // 10MB
        }
    }
}

/// Turns transport outcomes into mapped domain results.
///
/// Decoding and classification happen on the calling thread, mapping on the
/// worker context, and refetch plus delivery on the destination context.
pub struct ResponseHandler {
    worker: Arc<dyn ExecutionContext>,
    destination: Arc<dyn ExecutionContext>,
    config: ResponseHandlerConfig,
}

impl ResponseHandler {
    /// `destination` must outlive every run handed to this handler. A
    /// destination that has stopped drops pending completions without
    /// calling them.
    pub fn new(worker: Arc<dyn ExecutionContext>, destination: Arc<dyn ExecutionContext>) -> Self {
        Self {
            worker,
            destination,
            config: ResponseHandlerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ResponseHandlerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResponseHandlerConfig {
        &self.config
    }

    /// Process one transport outcome.
    ///
    /// `mapping` builds the mapping definition. It is called on the worker to
    /// map and may be called again on the destination to re-read confined
    /// objects. `completion` runs exactly once, on the destination context.
    pub fn handle<M, F, C>(&self, outcome: RawOutcome, mapping: F, completion: C)
    where
        M: Mapping + 'static,
        F: Fn() -> M + Send + Sync + 'static,
        C: FnOnce(CompletionResult<DomainResult<M::Object>>) + Send + 'static,
    {
        let run_id = Ulid::new();
        let completion = Completion::new(run_id, self.destination.clone(), completion);

        let classifier = Classifier::new(JsonDecoder::new(self.config.max_payload_size));
        let json = match classifier.classify(outcome) {
            Classification::Proceed(json) => json,
            Classification::Fail(error) => {
                tracing::debug!(%run_id, kind = ?error.kind(), "response classified as failure");
                completion.fail(error);
                return;
            }
        };

        tracing::debug!(%run_id, worker = self.worker.label(), "scheduling mapping");
        let factory = Arc::new(mapping);
        self.worker.execute(Box::new(move || {
            map_and_hand_off(run_id, &json, factory, completion);
        }));
    }

    /// Like [`handle`](Self::handle), resolving to the delivered result.
    ///
    /// Only available for objects that are `Send`. Thread-confined objects
    /// must be consumed inside a `handle` callback on the destination.
    pub async fn handle_async<M, F>(
        &self,
        outcome: RawOutcome,
        mapping: F,
    ) -> CompletionResult<DomainResult<M::Object>>
    where
        M: Mapping + 'static,
        M::Object: Send,
        F: Fn() -> M + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.handle(outcome, mapping, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or(Err(ResponseError::Abandoned))
    }
}

/// Worker half of a run: map, detach, then cross to the destination.
fn map_and_hand_off<M, F>(
    run_id: Ulid,
    json: &JsonValue,
    factory: Arc<F>,
    completion: Completion<DomainResult<M::Object>>,
) where
    M: Mapping,
    F: Fn() -> M + Send + Sync + 'static,
{
    let mapped = factory().map(json);

    let transfer = match mapped {
        Ok(result) => {
            tracing::debug!(%run_id, objects = result.len(), "mapped response");
            <M::Handoff as Handoff<M>>::detach(result)
        }
        Err(e) => {
            completion.fail(ResponseError::Mapping(e));
            return;
        }
    };

    completion.finish(move || {
        <M::Handoff as Handoff<M>>::attach(transfer, &*factory).map_err(ResponseError::from)
    });
}
