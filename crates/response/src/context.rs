use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::ThreadId;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere a pipeline stage can run.
pub trait ExecutionContext: Send + Sync {
    fn label(&self) -> &str;

    /// Schedule `job`. A context that can no longer run jobs drops it with a warning.
    fn execute(&self, job: Job);
}

/// Worker context backed by tokio's blocking thread pool.
///
/// Jobs run concurrently with no ordering between them.
pub struct BlockingPool {
    handle: Handle,
    label: String,
}

impl BlockingPool {
    pub fn new(handle: Handle, label: impl Into<String>) -> Self {
        Self {
            handle,
            label: label.into(),
        }
    }

    /// Pool on the runtime the caller is running in, if any.
    pub fn current(label: impl Into<String>) -> Option<Self> {
        Handle::try_current()
            .ok()
            .map(|handle| Self::new(handle, label))
    }
}

impl ExecutionContext for BlockingPool {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&self, job: Job) {
        let mut pending = PendingJob {
            job: Some(job),
            pool: self.label.clone(),
        };
        drop(self.handle.spawn_blocking(move || {
            if let Some(job) = pending.job.take() {
                job();
            }
        }));
    }
}

/// A job handed to the blocking pool. Warns if the pool drops it unrun.
struct PendingJob {
    job: Option<Job>,
    pool: String,
}

impl Drop for PendingJob {
    fn drop(&mut self) {
        if self.job.is_some() {
            tracing::warn!(pool = %self.pool, "runtime shut down, dropping job");
        }
    }
}

/// Destination context: one dedicated thread running jobs in submission order.
///
/// Dropping the queue closes it. The thread exits once queued jobs drain.
pub struct SerialQueue {
    label: String,
    tx: mpsc::UnboundedSender<Job>,
    thread: ThreadId,
}

impl SerialQueue {
    /// Start the queue's thread, named after `label`.
    ///
    /// # Errors
    /// Returns the OS error if the thread can't be spawned.
    pub fn spawn(label: impl Into<String>) -> std::io::Result<Self> {
        let label = label.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let queue = label.clone();
        let handle = std::thread::Builder::new()
            .name(label.clone())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::error!(queue = %queue, "job panicked");
                    }
                }
                tracing::debug!(queue = %queue, "serial queue stopped");
            })?;

        Ok(Self {
            label,
            tx,
            thread: handle.thread().id(),
        })
    }

    /// Whether the calling thread is this queue's thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread
    }
}

impl ExecutionContext for SerialQueue {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::warn!(queue = %self.label, "serial queue closed, dropping job");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn serial_queue_runs_jobs_in_order_on_its_thread() {
        let queue = Arc::new(SerialQueue::spawn("graft-test-serial").unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        for i in 0..5 {
            let seen = seen.clone();
            let q = queue.clone();
            queue.execute(Box::new(move || {
                assert!(q.is_current());
                seen.lock().unwrap().push(i);
            }));
        }
        queue.execute(Box::new(move || done_tx.send(()).unwrap()));

        done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(!queue.is_current());
    }

    #[test]
    fn serial_queue_survives_panicking_job() {
        let queue = SerialQueue::spawn("graft-test-panic").unwrap();
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        queue.execute(Box::new(|| panic!("job failure")));
        queue.execute(Box::new(move || done_tx.send(()).unwrap()));

        done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    }

    #[test]
    fn serial_queue_thread_is_named() {
        let queue = SerialQueue::spawn("graft-test-named").unwrap();
        let (tx, rx) = std::sync::mpsc::channel();

        queue.execute(Box::new(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        }));

        let name = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(name.as_deref(), Some("graft-test-named"));
        assert_eq!(queue.label(), "graft-test-named");
    }

    #[tokio::test]
    async fn blocking_pool_runs_off_the_caller_thread() {
        let pool = BlockingPool::current("graft-test-worker").unwrap();
        let caller = std::thread::current().id();
        let (tx, rx) = tokio::sync::oneshot::channel();

        pool.execute(Box::new(move || {
            let _ = tx.send(std::thread::current().id());
        }));

        let worker = rx.await.unwrap();
        assert_ne!(worker, caller);
    }

    #[test]
    fn blocking_pool_drops_jobs_after_runtime_shutdown() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let pool = BlockingPool::new(runtime.handle().clone(), "graft-test-shutdown");
        runtime.shutdown_timeout(Duration::from_millis(100));

        let (tx, rx) = std::sync::mpsc::channel::<()>();
        pool.execute(Box::new(move || tx.send(()).unwrap()));

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn blocking_pool_requires_a_runtime() {
        assert!(BlockingPool::current("none").is_none());
    }
}
