use crate::error::StoreError;
use crate::identity::KeyValue;

/// Whether a store read belongs to a mapping (write-side) pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Read participates in mapping and may register objects for writing.
    Mapping,
    /// Plain read with no write-side effects.
    Read,
}

/// Handle to the object store, as seen from one execution context.
pub trait Adaptor {
    type Object;

    /// Read the objects whose `primary_key` field matches one of `values`.
    ///
    /// Unknown identities are skipped, so the result may be partial or empty.
    ///
    /// # Errors
    /// Returns a `StoreError` when the store itself cannot be read.
    fn fetch_objects(
        &self,
        primary_key: &str,
        values: &[KeyValue],
        mode: FetchMode,
    ) -> Result<Vec<Self::Object>, StoreError>;
}
