use graft_response::{KeyValue, ThreadConfined};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::entity::{Entity, key_of};

/// An object read or written through a [`MemorySession`](crate::MemorySession).
///
/// Like the session it came from, it stays on the thread that produced it.
pub struct Managed<T> {
    inner: Rc<ManagedInner<T>>,
}

struct ManagedInner<T> {
    value: T,
    session_id: u64,
}

impl<T> Managed<T> {
    pub(crate) fn new(value: T, session_id: u64) -> Self {
        Self {
            inner: Rc::new(ManagedInner { value, session_id }),
        }
    }

    /// Id of the session this instance was materialized in.
    pub fn session_id(&self) -> u64 {
        self.inner.session_id
    }

    /// Whether both handles point at the same in-memory instance.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

impl<T> Clone for Managed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Deref for Managed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Managed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managed")
            .field("session_id", &self.inner.session_id)
            .field("value", &self.inner.value)
            .finish()
    }
}

impl<T: Entity> ThreadConfined for Managed<T> {
    const PRIMARY_KEY: &'static str = T::PRIMARY_KEY;

    fn primary_key_value(&self) -> Option<KeyValue> {
        let record = serde_json::to_value(&self.inner.value).ok()?;
        key_of(&record, T::PRIMARY_KEY)
    }
}
