//! Notification records
//!
//! A record maps identity keys to field-sets. It is the unit the router
//! dispatches and the structured form a transport response is classified into.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields attached to one key in a record
pub type FieldSet = Map<String, Value>;

/// Mapping from identity key to field-set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse text that must hold a JSON object
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Map<String, Value>>(text).map(Self)
    }

    /// Wrap a JSON value, `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// An entry counts as set when it exists and is not null
    pub fn has_entry(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|value| !value.is_null())
    }

    pub fn fields(&self, key: &str) -> Option<&FieldSet> {
        self.0.get(key).and_then(Value::as_object)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Records embedded under `nested_field` in each entry's field-set, in key order
    pub fn nested(&self, nested_field: &str) -> Vec<Record> {
        self.0
            .values()
            .filter_map(|value| value.as_object())
            .filter_map(|fields| fields.get(nested_field))
            .filter_map(|nested| nested.as_object())
            .map(|nested| Record(nested.clone()))
            .collect()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(text) => write!(f, "{}", text),
            Err(_) => write!(f, "{{}}"),
        }
    }
}
