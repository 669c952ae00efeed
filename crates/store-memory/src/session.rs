use graft_response::{FetchMode, KeyValue, StoreError};
use serde_json::Value;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::entity::{Entity, key_of};
use crate::managed::Managed;
use crate::store::{MemoryStore, Table};

/// A thread-confined view of a [`MemoryStore`].
///
/// Every read materializes fresh [`Managed`] instances owned by this session.
#[derive(Clone)]
pub struct MemorySession {
    inner: Rc<SessionInner>,
}

struct SessionInner {
    id: u64,
    store: MemoryStore,
    writes: Cell<usize>,
    mapped_reads: Cell<usize>,
}

impl MemorySession {
    pub(crate) fn new(store: MemoryStore, id: u64) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                id,
                store,
                writes: Cell::new(0),
                mapped_reads: Cell::new(0),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn store(&self) -> &MemoryStore {
        &self.inner.store
    }

    /// Objects written through this session.
    pub fn writes(&self) -> usize {
        self.inner.writes.get()
    }

    /// Objects read through this session as part of a mapping pass.
    pub fn mapped_reads(&self) -> usize {
        self.inner.mapped_reads.get()
    }

    /// Insert or replace `object`, keyed by its primary key.
    ///
    /// # Errors
    /// Fails when the object has no usable primary key, can't be serialized,
    /// or the store is closed.
    pub fn write<T: Entity>(&self, object: T) -> Result<Managed<T>, StoreError> {
        let mut written = self.write_all(vec![object])?;
        written
            .pop()
            .ok_or_else(|| StoreError::Other(format!("{} write produced nothing", T::NAME)))
    }

    /// Insert or replace every object in `objects` as one unit.
    ///
    /// Records are prepared before the store is touched, so either all of
    /// them are stored or none is.
    ///
    /// # Errors
    /// Same as [`write`](Self::write), for any of the objects.
    pub fn write_all<T: Entity>(&self, objects: Vec<T>) -> Result<Vec<Managed<T>>, StoreError> {
        let records = objects
            .iter()
            .map(|object| {
                let record = serde_json::to_value(object)
                    .map_err(|e| StoreError::Other(format!("serializing {}: {e}", T::NAME)))?;
                let key = key_of(&record, T::PRIMARY_KEY).ok_or_else(|| {
                    StoreError::Other(format!("{} has no usable {}", T::NAME, T::PRIMARY_KEY))
                })?;
                Ok((key, record))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        {
            let mut tables = self.inner.store.tables()?;
            let table = tables.entry(T::NAME.to_string()).or_default();
            for (key, record) in records {
                table.insert(key, record);
            }
        }

        let count = objects.len();
        self.inner.writes.set(self.inner.writes.get() + count);
        tracing::trace!(session = self.inner.id, entity = T::NAME, count, "memory store write");

        Ok(objects
            .into_iter()
            .map(|object| Managed::new(object, self.inner.id))
            .collect())
    }

    /// Read the objects whose `primary_key` field matches one of `values`.
    ///
    /// Results follow the order of `values`. Unknown and repeated values are
    /// skipped.
    ///
    /// # Errors
    /// Fails when the store is closed or a stored record no longer
    /// deserializes into `T`.
    pub fn fetch<T: Entity>(
        &self,
        primary_key: &str,
        values: &[KeyValue],
        mode: FetchMode,
    ) -> Result<Vec<Managed<T>>, StoreError> {
        let records: Vec<Value> = {
            let tables = self.inner.store.tables()?;
            let Some(table) = tables.get(T::NAME) else {
                return Ok(Vec::new());
            };

            let mut seen = HashSet::new();
            values
                .iter()
                .filter(|value| seen.insert(*value))
                .filter_map(|value| lookup(table, T::PRIMARY_KEY, primary_key, value))
                .cloned()
                .collect()
        };

        let objects = records
            .into_iter()
            .map(|record| {
                serde_json::from_value::<T>(record)
                    .map(|value| Managed::new(value, self.inner.id))
                    .map_err(|e| StoreError::Other(format!("corrupt {} record: {e}", T::NAME)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if mode == FetchMode::Mapping {
            let reads = self.inner.mapped_reads.get();
            self.inner.mapped_reads.set(reads + objects.len());
        }

        tracing::trace!(
            session = self.inner.id,
            entity = T::NAME,
            requested = values.len(),
            found = objects.len(),
            ?mode,
            "memory store fetch"
        );

        Ok(objects)
    }
}

fn lookup<'a>(
    table: &'a Table,
    table_key: &str,
    primary_key: &str,
    value: &KeyValue,
) -> Option<&'a Value> {
    if primary_key == table_key {
        return table.get(value);
    }
    table
        .values()
        .find(|record| key_of(record, primary_key).as_ref() == Some(value))
}
