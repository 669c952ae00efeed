use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::error::MappingError;
use crate::handoff::{Handoff, Share};
use crate::json::JsonValue;
use crate::store::Adaptor;

/// Output of a mapping: one object or an ordered, homogeneous collection.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainResult<T> {
    Single(T),
    Collection(Vec<T>),
}

impl<T> DomainResult<T> {
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Collection(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::Single(item) => std::slice::from_ref(item).iter(),
            Self::Collection(items) => items.iter(),
        }
    }

    /// The single object, or `None` for a collection.
    pub fn into_single(self) -> Option<T> {
        match self {
            Self::Single(item) => Some(item),
            Self::Collection(_) => None,
        }
    }

    /// All objects in order. A single object becomes a one-element vec.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Single(item) => vec![item],
            Self::Collection(items) => items,
        }
    }
}

/// A mapping definition bound to a target domain type.
///
/// Definitions are built by a caller-supplied factory, possibly more than once
/// per response, and may hold a store session confined to the context that
/// built them. They are therefore not required to be `Send`.
pub trait Mapping: Sized {
    type Object: 'static;

    /// How mapped objects reach the destination context.
    type Handoff: Handoff<Self>;

    /// # Errors
    /// Returns a `MappingError` when the decoded data can't be transformed.
    fn map(&self, json: &JsonValue) -> Result<DomainResult<Self::Object>, MappingError>;
}

/// A mapping whose objects live in a store reachable through an [`Adaptor`].
pub trait StoreMapping: Mapping {
    type Adaptor: Adaptor<Object = Self::Object>;

    fn adaptor(&self) -> &Self::Adaptor;
}

/// Deserializes the node at a JSON pointer into a plain value type.
///
/// The value is freely shareable, so it is handed to the destination as-is.
pub struct ValueMapping<T> {
    pointer: String,
    _target: PhantomData<fn() -> T>,
}

impl<T> ValueMapping<T> {
    /// `pointer` uses JSON pointer syntax, e.g. `/data/allFilms`.
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            _target: PhantomData,
        }
    }
}

impl<T: DeserializeOwned + Send + 'static> Mapping for ValueMapping<T> {
    type Object = T;
    type Handoff = Share;

    fn map(&self, json: &JsonValue) -> Result<DomainResult<T>, MappingError> {
        let node = json
            .pointer(&self.pointer)
            .ok_or_else(|| MappingError::MissingField {
                path: self.pointer.clone(),
            })?;
        Ok(DomainResult::Single(T::deserialize(node)?))
    }
}
