//! Moving mapped results from the worker context to the destination context.
//!
//! Mapping runs on the worker. What it produces may be confined to the worker,
//! so a [`Handoff`] strategy splits the transfer in two halves: `detach` runs
//! on the worker and yields a `Send` value, and `attach` runs on the
//! destination and turns that value back into a [`DomainResult`].

use crate::error::StoreError;
use crate::identity::{KeyValue, ThreadConfined};
use crate::mapping::{DomainResult, Mapping, StoreMapping};
use crate::store::{Adaptor, FetchMode};

pub trait Handoff<M: Mapping> {
    /// The only value that crosses from the worker to the destination.
    type Transfer: Send + 'static;

    /// Runs on the worker, consuming the mapped result.
    fn detach(result: DomainResult<M::Object>) -> Self::Transfer;

    /// Runs on the destination. `mapping` builds a fresh definition there.
    ///
    /// # Errors
    /// Returns a `StoreError` when the destination can't re-read the objects.
    fn attach(
        transfer: Self::Transfer,
        mapping: &dyn Fn() -> M,
    ) -> Result<DomainResult<M::Object>, StoreError>;
}

/// Hands freely shareable objects over unchanged.
pub enum Share {}

impl<M> Handoff<M> for Share
where
    M: Mapping,
    M::Object: Send,
{
    type Transfer = DomainResult<M::Object>;

    fn detach(result: DomainResult<M::Object>) -> Self::Transfer {
        result
    }

    fn attach(
        transfer: Self::Transfer,
        _mapping: &dyn Fn() -> M,
    ) -> Result<DomainResult<M::Object>, StoreError> {
        Ok(transfer)
    }
}

/// Re-reads thread-confined objects by primary key on the destination.
pub enum Refetch {}

/// Whether the mapped result was a single object or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Single,
    Collection,
}

/// Primary keys extracted from thread-confined objects on the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Identities {
    pub primary_key: &'static str,
    pub shape: Shape,
    pub values: Vec<KeyValue>,
}

impl Identities {
    /// Objects without a primary key value are left out.
    pub fn extract<T: ThreadConfined>(result: &DomainResult<T>) -> Self {
        let shape = match result {
            DomainResult::Single(_) => Shape::Single,
            DomainResult::Collection(_) => Shape::Collection,
        };

        let values: Vec<KeyValue> = result
            .iter()
            .filter_map(T::primary_key_value)
            .collect();

        let dropped = result.len() - values.len();
        if dropped > 0 {
            tracing::debug!(
                primary_key = T::PRIMARY_KEY,
                dropped,
                "mapped objects without identity left out of refetch"
            );
        }

        Self {
            primary_key: T::PRIMARY_KEY,
            shape,
            values,
        }
    }
}

impl<M> Handoff<M> for Refetch
where
    M: StoreMapping,
    M::Object: ThreadConfined,
{
    type Transfer = Identities;

    fn detach(result: DomainResult<M::Object>) -> Identities {
        Identities::extract(&result)
    }

    fn attach(
        identities: Identities,
        mapping: &dyn Fn() -> M,
    ) -> Result<DomainResult<M::Object>, StoreError> {
        let definition = mapping();
        let objects = definition.adaptor().fetch_objects(
            identities.primary_key,
            &identities.values,
            FetchMode::Read,
        )?;

        tracing::debug!(
            primary_key = identities.primary_key,
            requested = identities.values.len(),
            fetched = objects.len(),
            "refetched confined objects"
        );

        match identities.shape {
            Shape::Collection => Ok(DomainResult::Collection(objects)),
            Shape::Single => {
                objects
                    .into_iter()
                    .next()
                    .map(DomainResult::Single)
                    .ok_or_else(|| StoreError::NotFound {
                        key: identities.primary_key.to_string(),
                        value: identities
                            .values
                            .first()
                            .map_or_else(|| "<none>".to_string(), ToString::to_string),
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MappingError;
    use crate::json::JsonValue;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    type ReadLog = Rc<RefCell<Vec<(String, Vec<KeyValue>, FetchMode)>>>;

    /// `Rc` keeps it `!Send`, like an object bound to its store session.
    #[derive(Debug)]
    struct Starship {
        id: Option<i64>,
        name: Rc<String>,
    }

    impl ThreadConfined for Starship {
        const PRIMARY_KEY: &'static str = "id";

        fn primary_key_value(&self) -> Option<KeyValue> {
            self.id.map(KeyValue::Int)
        }
    }

    struct FakeAdaptor {
        rows: HashMap<i64, String>,
        reads: ReadLog,
    }

    impl Adaptor for FakeAdaptor {
        type Object = Starship;

        fn fetch_objects(
            &self,
            primary_key: &str,
            values: &[KeyValue],
            mode: FetchMode,
        ) -> Result<Vec<Starship>, StoreError> {
            self.reads
                .borrow_mut()
                .push((primary_key.to_string(), values.to_vec(), mode));
            Ok(values
                .iter()
                .filter_map(|v| match v {
                    KeyValue::Int(id) => self.rows.get(id).map(|name| Starship {
                        id: Some(*id),
                        name: Rc::new(name.clone()),
                    }),
                    KeyValue::String(_) => None,
                })
                .collect())
        }
    }

    struct StarshipMapping {
        adaptor: FakeAdaptor,
    }

    impl Mapping for StarshipMapping {
        type Object = Starship;
        type Handoff = Refetch;

        fn map(&self, _json: &JsonValue) -> Result<DomainResult<Starship>, MappingError> {
            Err(MappingError::Other("not used".into()))
        }
    }

    impl StoreMapping for StarshipMapping {
        type Adaptor = FakeAdaptor;

        fn adaptor(&self) -> &FakeAdaptor {
            &self.adaptor
        }
    }

    fn mapping_with_log(reads: ReadLog) -> StarshipMapping {
        StarshipMapping {
            adaptor: FakeAdaptor {
                rows: HashMap::from([(1, "X-wing".to_string()), (2, "Y-wing".to_string())]),
                reads,
            },
        }
    }

    fn mapping() -> StarshipMapping {
        mapping_with_log(Rc::default())
    }

    fn ship(id: Option<i64>) -> Starship {
        Starship {
            id,
            name: Rc::new("mapped".to_string()),
        }
    }

    #[test]
    fn extract_drops_objects_without_identity() {
        let result = DomainResult::Collection(vec![ship(Some(1)), ship(None), ship(Some(3))]);
        let identities = Identities::extract(&result);
        assert_eq!(identities.primary_key, "id");
        assert_eq!(identities.shape, Shape::Collection);
        assert_eq!(identities.values, vec![KeyValue::Int(1), KeyValue::Int(3)]);
    }

    #[test]
    fn refetch_collection_reads_canonical_objects() {
        let transfer = <Refetch as Handoff<StarshipMapping>>::detach(DomainResult::Collection(
            vec![ship(Some(1)), ship(Some(2))],
        ));
        let result = <Refetch as Handoff<StarshipMapping>>::attach(transfer, &mapping).unwrap();

        let names: Vec<String> = result.iter().map(|s| s.name.to_string()).collect();
        assert_eq!(names, vec!["X-wing", "Y-wing"]);
    }

    #[test]
    fn refetch_builds_a_fresh_definition_and_reads_in_read_mode() {
        let reads = Rc::new(RefCell::new(Vec::new()));
        let built = RefCell::new(0);
        let factory = || {
            *built.borrow_mut() += 1;
            mapping_with_log(reads.clone())
        };

        let transfer = <Refetch as Handoff<StarshipMapping>>::detach(DomainResult::Collection(
            vec![ship(Some(2)), ship(Some(7))],
        ));
        let result = <Refetch as Handoff<StarshipMapping>>::attach(transfer, &factory).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(*built.borrow(), 1);

        let reads = reads.borrow();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].0, "id");
        assert_eq!(reads[0].1, vec![KeyValue::Int(2), KeyValue::Int(7)]);
        assert_eq!(reads[0].2, FetchMode::Read);
    }

    #[test]
    fn refetch_single_not_found() {
        let transfer =
            <Refetch as Handoff<StarshipMapping>>::detach(DomainResult::Single(ship(Some(99))));
        let err = <Refetch as Handoff<StarshipMapping>>::attach(transfer, &mapping).unwrap_err();
        assert!(
            matches!(&err, StoreError::NotFound { key, value } if key == "id" && value == "99"),
            "expected NotFound, got: {err:?}"
        );
    }

    #[test]
    fn refetch_single_without_identity() {
        let transfer =
            <Refetch as Handoff<StarshipMapping>>::detach(DomainResult::Single(ship(None)));
        let err = <Refetch as Handoff<StarshipMapping>>::attach(transfer, &mapping).unwrap_err();
        assert!(matches!(&err, StoreError::NotFound { value, .. } if value == "<none>"));
    }
}
