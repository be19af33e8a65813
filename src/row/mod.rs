//! The row: an ordered key/value record, the unit of data in a pipeline
//!
//! Keys are strings and keep their insertion order. Values are opaque JSON
//! values (strings, numbers, booleans, null, arrays or nested objects).
//!
//! Keys starting with [`INTERNAL_PREFIX`] hold transient metadata. They can be
//! stripped with [`Row::without_internal_fields`] and are ignored when two rows
//! are compared.

mod filter;

pub use filter::FieldFilter;

use crate::error::EtlError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Prefix marking a key as internal metadata
pub const INTERNAL_PREFIX: char = '_';

/// Default field that extractors write their content to
pub const TOPIC_FIELD: &str = "_";

/// Check if a key names internal metadata
pub fn is_internal(key: &str) -> bool {
    key.starts_with(INTERNAL_PREFIX)
}

/// Ordered key/value record
///
/// Mutating operations (`set`, `update`) change the row in place and return
/// `&mut Self` so calls can be chained. `restrict` leaves the row untouched and
/// returns a new one. `without_internal_fields` consumes the row and hands it
/// back stripped, so no caller can observe a half-cleaned row.
///
/// # Example
/// ```
/// use rowpipe::{Row, row};
///
/// let mut row = row! { "status" => "pending", "id" => 7 };
/// row.set("status", "ok").set("_seen", true);
///
/// assert_eq!(row.get("status").unwrap(), "ok");
/// assert_eq!(row.without_internal_fields(), row! { "status" => "ok", "id" => 7 });
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Look up a key
    ///
    /// # Errors
    /// Returns [`EtlError::KeyNotFound`] if the row has no such key
    pub fn get(&self, key: &str) -> Result<&Value, EtlError> {
        self.0
            .get(key)
            .ok_or_else(|| EtlError::KeyNotFound(key.to_string()))
    }

    /// Look up a key without failing
    pub fn find(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Value for `key`, or `default` when absent
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.0.get(key).cloned().unwrap_or_else(|| default.into())
    }

    /// Set a field, keeping its position if the key already exists
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style variant of [`Row::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Merge key/value pairs into this row, overwriting existing keys
    pub fn update<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in pairs {
            self.0.insert(key.into(), value.into());
        }
        self
    }

    /// Remove a key, preserving the order of the remaining ones
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// New row holding only the keys accepted by `filter`, in this row's order
    pub fn restrict(&self, filter: &FieldFilter) -> Row {
        self.0
            .iter()
            .filter(|(key, _)| filter.matches(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Strip every internal key
    pub fn without_internal_fields(mut self) -> Row {
        self.0.retain(|key, _| !is_internal(key));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn public_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter().filter(|(key, _)| !is_internal(key))
    }
}

/// Rows are equal when their public fields match, in order
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.public_fields();
        let mut right = other.public_fields();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a == b => continue,
                _ => return false,
            }
        }
    }
}

impl Eq for Row {}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Row> for Value {
    fn from(row: Row) -> Self {
        Value::Object(row.0)
    }
}

impl TryFrom<Value> for Row {
    type Error = EtlError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(EtlError::configuration(format!(
                "expected a JSON object for a row, got {}",
                type_name(&other)
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        row.update(iter);
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Short type name of a value, as shown by the Log transform
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Build a [`Row`] from `key => value` pairs, keeping their order
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $( row.set($key, $value); )+
        row
    }};
}
