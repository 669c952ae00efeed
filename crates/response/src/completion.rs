use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use ulid::Ulid;

use crate::context::ExecutionContext;
use crate::error::ResponseError;

pub type CompletionResult<T> = Result<T, ResponseError>;

type Callback<T> = Box<dyn FnOnce(CompletionResult<T>) + Send>;

/// The single delivery path of one pipeline run.
///
/// Consumed by [`fail`](Self::fail) or [`finish`](Self::finish), both of which
/// schedule the callback on the destination. Dropping an unfired completion
/// delivers [`ResponseError::Abandoned`] instead.
pub(crate) struct Completion<T: 'static> {
    run_id: Ulid,
    destination: Arc<dyn ExecutionContext>,
    callback: Option<Callback<T>>,
}

impl<T: 'static> Completion<T> {
    pub(crate) fn new<C>(run_id: Ulid, destination: Arc<dyn ExecutionContext>, callback: C) -> Self
    where
        C: FnOnce(CompletionResult<T>) + Send + 'static,
    {
        Self {
            run_id,
            destination,
            callback: Some(Box::new(callback)),
        }
    }

    pub(crate) fn fail(self, error: ResponseError) {
        self.finish(move || Err(error));
    }

    /// Run `produce` on the destination and hand its result to the callback.
    pub(crate) fn finish<F>(mut self, produce: F)
    where
        F: FnOnce() -> CompletionResult<T> + Send + 'static,
    {
        if let Some(callback) = self.callback.take() {
            dispatch(self.run_id, &self.destination, callback, produce);
        }
    }
}

impl<T: 'static> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            tracing::warn!(run_id = %self.run_id, "response pipeline dropped before completion");
            dispatch(self.run_id, &self.destination, callback, || {
                Err(ResponseError::Abandoned)
            });
        }
    }
}

fn dispatch<T, F>(
    run_id: Ulid,
    destination: &Arc<dyn ExecutionContext>,
    callback: Callback<T>,
    produce: F,
) where
    T: 'static,
    F: FnOnce() -> CompletionResult<T> + Send + 'static,
{
    destination.execute(Box::new(move || {
        let result = catch_unwind(AssertUnwindSafe(produce)).unwrap_or_else(|_| {
            tracing::error!(%run_id, "destination stage panicked");
            Err(ResponseError::Abandoned)
        });

        match &result {
            Ok(_) => tracing::debug!(%run_id, "response delivered"),
            Err(e) => tracing::debug!(%run_id, kind = ?e.kind(), error = %e, "response failed"),
        }

        callback(result);
    }));
}
