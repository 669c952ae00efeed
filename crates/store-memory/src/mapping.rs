use graft_response::{DomainResult, JsonValue, Mapping, MappingError, Refetch, StoreMapping};
use serde::Deserialize;
use serde_json::Value;

use crate::adaptor::MemoryAdaptor;
use crate::entity::Entity;
use crate::managed::Managed;
use crate::store::MemoryStore;

/// Maps the node at a JSON pointer into stored entities.
///
/// An object yields a single entity, an array a collection. Every entity is
/// written through a session opened by this definition, so the results are
/// confined to the thread that built it and are re-read on the destination.
pub struct EntityMapping<T> {
    adaptor: MemoryAdaptor<T>,
    pointer: String,
}

impl<T: Entity> EntityMapping<T> {
    /// `pointer` uses JSON pointer syntax, e.g. `/data/allFilms`.
    pub fn new(store: &MemoryStore, pointer: impl Into<String>) -> Self {
        Self {
            adaptor: MemoryAdaptor::new(store.session()),
            pointer: pointer.into(),
        }
    }

    fn map_entity(&self, node: &Value) -> Result<Managed<T>, MappingError> {
        let object = T::deserialize(node)?;
        Ok(self.adaptor.save(object)?)
    }

    /// Every element is decoded before anything is written.
    fn map_entities(&self, items: &[Value]) -> Result<Vec<Managed<T>>, MappingError> {
        let objects = items
            .iter()
            .map(T::deserialize)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.adaptor.save_all(objects)?)
    }
}

impl<T: Entity> Mapping for EntityMapping<T> {
    type Object = Managed<T>;
    type Handoff = Refetch;

    fn map(&self, json: &JsonValue) -> Result<DomainResult<Managed<T>>, MappingError> {
        let node = json
            .pointer(&self.pointer)
            .ok_or_else(|| MappingError::MissingField {
                path: self.pointer.clone(),
            })?;

        match node {
            Value::Object(_) => self.map_entity(node).map(DomainResult::Single),
            Value::Array(items) => self.map_entities(items).map(DomainResult::Collection),
            other => Err(MappingError::UnexpectedType {
                path: self.pointer.clone(),
                expected: "object or array",
                found: json_type(other),
            }),
        }
    }
}

impl<T: Entity> StoreMapping for EntityMapping<T> {
    type Adaptor = MemoryAdaptor<T>;

    fn adaptor(&self) -> &MemoryAdaptor<T> {
        &self.adaptor
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
