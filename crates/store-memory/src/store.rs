use graft_response::{KeyValue, StoreError};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::session::MemorySession;

/// Records of one entity, keyed by primary key value.
pub(crate) type Table = BTreeMap<KeyValue, Value>;

pub(crate) type Tables = HashMap<String, Table>;

#[derive(Default)]
struct StoreInner {
    tables: Mutex<Tables>,
    closed: AtomicBool,
    next_session: AtomicU64,
}

/// Shared in-memory object store.
///
/// The store itself can be shared between threads. Objects are only read
/// and written through a [`MemorySession`], which is confined to the thread
/// that opened it.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session bound to the calling thread.
    pub fn session(&self) -> MemorySession {
        let id = self.inner.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(session = id, "opened memory store session");
        MemorySession::new(self.clone(), id)
    }

    /// Make the store unreachable. Later reads and writes fail.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of stored records of entity `name`.
    ///
    /// # Errors
    /// Fails like any other read when the store is closed or its lock is poisoned.
    pub fn count(&self, name: &str) -> Result<usize, StoreError> {
        Ok(self.tables()?.get(name).map_or(0, Table::len))
    }

    pub(crate) fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.is_closed() {
            return Err(StoreError::Unreachable("memory store is closed".to_string()));
        }
        self.inner
            .tables
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_get_distinct_ids() {
        let store = MemoryStore::new();
        let a = store.session();
        let b = store.session();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn closed_store_is_unreachable() {
        let store = MemoryStore::new();
        assert!(store.tables().is_ok());

        store.close();
        assert!(store.is_closed());
        assert!(matches!(store.tables(), Err(StoreError::Unreachable(_))));
    }

    #[test]
    fn count_of_unknown_entity_is_zero() {
        assert_eq!(MemoryStore::new().count("films").unwrap(), 0);
    }

    #[test]
    fn count_fails_like_other_reads() {
        let store = MemoryStore::new();
        store.close();
        assert!(matches!(store.count("films"), Err(StoreError::Unreachable(_))));
    }

    #[test]
    fn poisoned_lock_is_reported_by_count() {
        let store = MemoryStore::new();
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.tables().unwrap();
            panic!("poison the table lock");
        })
        .join();

        assert!(matches!(store.count("films"), Err(StoreError::Other(_))));
        assert!(matches!(store.tables(), Err(StoreError::Other(_))));
    }
}
