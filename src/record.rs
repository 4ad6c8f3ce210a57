//! Record model
//!
//! A record is an immutable identifier plus an opaque bag of named fields.
//! On disk it is one flat JSON object whose `id` member carries the
//! identifier; every other member belongs to the bag and is copied verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::strategy::{StoreError, StoreResult};

/// Name of the identifier member in a serialized record
pub const ID_FIELD: &str = "id";

/// Named fields of a record, never interpreted by the storage layer
pub type Fields = Map<String, Value>;

/// Predicate selecting records for read, update and delete
pub type Filter<'a> = &'a (dyn Fn(&Record) -> bool + Sync);

/// Maps a matched record to its replacement
///
/// The storage layer re-attaches the original identifier to whatever the
/// modifier returns.
pub type Modifier<'a> = &'a (dyn Fn(&Record) -> Record + Sync);

/// Filter matching every record
pub fn match_all(_: &Record) -> bool {
    true
}

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: String,
    #[serde(flatten)]
    fields: Fields,
}

impl Record {
    /// Create a record. An `id` member inside `fields` is dropped.
    pub fn new(id: impl Into<String>, mut fields: Fields) -> Self {
        fields.remove(ID_FIELD);
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Create a record from a JSON object of fields
    pub fn from_value(id: impl Into<String>, data: Value) -> StoreResult<Self> {
        match data {
            Value::Object(fields) => Ok(Self::new(id, fields)),
            other => Err(StoreError::InvalidRecord(format!(
                "record data must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Look up a single field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Return a copy of this record with `key` set to `value`.
    /// Setting `id` this way is ignored.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != ID_FIELD {
            self.fields.insert(key, value.into());
        }
        self
    }

    /// Return a copy of this record without `key`
    pub fn without_field(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    /// Replace the identifier. Only the storage layer does this, to restore
    /// the original identifier after a modifier ran.
    pub(crate) fn with_id(mut self, id: &str) -> Self {
        if self.id != id {
            self.id = id.to_string();
        }
        self
    }

    /// The flat JSON object form, `id` included
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }

    pub fn into_parts(self) -> (String, Fields) {
        (self.id, self.fields)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_flat_with_id() {
        let record = Record::from_value("abc", json!({"name": "a", "n": 1})).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"id": "abc", "name": "a", "n": 1}));
        assert_eq!(record.to_value(), value);
    }

    #[test]
    fn test_deserialize_requires_string_id() {
        let missing = serde_json::from_str::<Record>(r#"{"name": "a"}"#);
        assert!(missing.is_err());

        let numeric = serde_json::from_str::<Record>(r#"{"id": 7, "name": "a"}"#);
        assert!(numeric.is_err());

        let ok: Record = serde_json::from_str(r#"{"id": "x", "nested": {"k": [1, 2]}}"#).unwrap();
        assert_eq!(ok.id(), "x");
        assert_eq!(ok.get("nested"), Some(&json!({"k": [1, 2]})));
        assert!(ok.get("id").is_none());
    }

    #[test]
    fn test_new_drops_id_member() {
        let record = Record::from_value("generated", json!({"id": "caller", "v": 1})).unwrap();
        assert_eq!(record.id(), "generated");
        assert!(!record.fields().contains_key("id"));
    }

    #[test]
    fn test_with_field_cannot_touch_id() {
        let record = Record::new("stable", Fields::new())
            .with_field("id", "other")
            .with_field("v", 2);
        assert_eq!(record.id(), "stable");
        assert_eq!(record.get("v"), Some(&json!(2)));
        assert_eq!(record.fields().len(), 1);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        let err = Record::from_value("x", json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_with_id_restores_identifier() {
        let changed = Record::new("new-id", Fields::new()).with_field("v", 1);
        let restored = changed.with_id("old-id");
        assert_eq!(restored.id(), "old-id");
        assert_eq!(restored.get("v"), Some(&json!(1)));
    }
}
