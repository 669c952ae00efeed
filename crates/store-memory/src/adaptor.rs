use graft_response::{Adaptor, FetchMode, KeyValue, StoreError};
use std::marker::PhantomData;

use crate::entity::Entity;
use crate::managed::Managed;
use crate::session::MemorySession;

/// [`Adaptor`] over a memory store session for one entity type.
pub struct MemoryAdaptor<T> {
    session: MemorySession,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> MemoryAdaptor<T> {
    pub fn new(session: MemorySession) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    pub fn session(&self) -> &MemorySession {
        &self.session
    }

    /// Persist `object` as part of a mapping pass.
    ///
    /// # Errors
    /// See [`MemorySession::write`].
    pub fn save(&self, object: T) -> Result<Managed<T>, StoreError> {
        self.session.write(object)
    }

    /// Persist every object of a mapping pass, or none of them.
    ///
    /// # Errors
    /// See [`MemorySession::write_all`].
    pub fn save_all(&self, objects: Vec<T>) -> Result<Vec<Managed<T>>, StoreError> {
        self.session.write_all(objects)
    }
}

impl<T: Entity> Adaptor for MemoryAdaptor<T> {
    type Object = Managed<T>;

    fn fetch_objects(
        &self,
        primary_key: &str,
        values: &[KeyValue],
        mode: FetchMode,
    ) -> Result<Vec<Managed<T>>, StoreError> {
        self.session.fetch(primary_key, values, mode)
    }
}
