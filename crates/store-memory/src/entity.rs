use graft_response::KeyValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A domain type persisted in the memory store.
///
/// Objects are stored in their serialized form, so the primary key is read
/// from the serialized record by field name.
pub trait Entity: Serialize + DeserializeOwned + 'static {
    /// Table name.
    const NAME: &'static str;

    const PRIMARY_KEY: &'static str;
}

pub(crate) fn key_of(record: &Value, field: &str) -> Option<KeyValue> {
    record.get(field).and_then(KeyValue::from_json)
}
