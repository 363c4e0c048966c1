//! Parameter normalization.
//!
//! Every call site hands the dispatcher its parameters either as a typed
//! struct deriving [`Serialize`] or as a loosely built [`Params`] mapping.
//! Both are funneled through [`normalize`] into a [`Payload`], the canonical
//! object that becomes the query string or the request body.
//!
//! Optional fields that may also be cleared use [`Field`], which keeps
//! "not provided" apart from "explicitly null":
//!
//! ```
//! use serde::Serialize;
//! use telnyx::params::{normalize, Field, Params};
//! use serde_json::json;
//!
//! #[derive(Serialize)]
//! struct UpdateNumber {
//!     #[serde(skip_serializing_if = "Field::is_unset")]
//!     billing_group_id: Field<String>,
//!     #[serde(skip_serializing_if = "Field::is_unset")]
//!     customer_reference: Field<String>,
//! }
//!
//! let typed = UpdateNumber {
//!     billing_group_id: Field::Null,
//!     customer_reference: Field::Unset,
//! };
//! let raw = Params::new()
//!     .with("billing_group_id", Field::Null)
//!     .with("customer_reference", Field::Unset);
//!
//! let typed = normalize(&typed).unwrap();
//! assert_eq!(typed, normalize(&raw).unwrap());
//! assert_eq!(typed.get("billing_group_id"), Some(&json!(null)));
//! assert!(!typed.contains_key("customer_reference"));
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A parameter value that distinguishes "omitted" from "explicitly null".
///
/// Pair every `Field` struct member with
/// `#[serde(skip_serializing_if = "Field::is_unset")]` so that unset fields
/// never reach the wire. When deserializing, combine it with
/// `#[serde(default)]`: a missing key becomes [`Field::Unset`] and a JSON
/// `null` becomes [`Field::Null`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// The caller did not provide the field. It is dropped from the payload.
    #[default]
    Unset,
    /// The caller explicitly cleared the field. It is sent as `null`.
    Null,
    /// The caller provided a value.
    Value(T),
}

impl<T> Field<T> {
    /// Returns `true` for [`Field::Unset`].
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }

    /// Returns `true` for [`Field::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    /// Returns the contained value, if any.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Converts an `Option` where `None` means an explicit null.
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Field::Null, Field::Value)
    }

    /// Maps the contained value, keeping the unset/null state.
    pub fn map<U, F>(self, f: F) -> Field<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Field::Unset => Field::Unset,
            Field::Null => Field::Null,
            Field::Value(value) => Field::Value(f(value)),
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Value(value)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            // Only reachable when the `skip_serializing_if` attribute was forgotten.
            Field::Unset | Field::Null => serializer.serialize_none(),
            Field::Value(value) => serializer.serialize_some(value),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Field::from_option)
    }
}

/// A loosely typed parameter mapping built key by key.
///
/// This is the "raw mapping" counterpart of a typed params struct. Keys set
/// to [`Field::Unset`] are removed, keys set to [`Field::Null`] are kept as
/// `null`, and nested mappings are inserted with [`Params::nested`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Map<String, Value>,
}

impl Params {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` according to the three-state `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Field<Value>>) -> Self {
        let key = key.into();
        match value.into() {
            Field::Unset => {
                self.entries.remove(&key);
            }
            Field::Null => {
                self.entries.insert(key, Value::Null);
            }
            Field::Value(value) => {
                self.entries.insert(key, value);
            }
        }
        self
    }

    /// Sets `key` to a nested mapping.
    pub fn nested(mut self, key: impl Into<String>, params: Params) -> Self {
        self.entries.insert(key.into(), Value::Object(params.entries));
        self
    }

    /// Returns `true` if no keys are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl From<Params> for Value {
    fn from(params: Params) -> Self {
        Value::Object(params.entries)
    }
}

/// The canonical key/value structure sent as a query string or body.
///
/// Keys are kept sorted, so two payloads with the same logical content
/// serialize to the same bytes regardless of how they were built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the payload has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value stored under a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if a top-level key is present (even when `null`).
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts a top-level key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Follows `keys` through nested objects.
    pub fn get_nested(&self, keys: &[&str]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        rest.iter()
            .try_fold(self.0.get(*first)?, |value, key| value.get(*key))
    }

    /// Sets a value under nested keys, creating intermediate objects and
    /// replacing any non-object value standing in the way.
    pub fn set_nested(&mut self, keys: &[&str], value: Value) {
        let Some((last, parents)) = keys.split_last() else {
            return;
        };
        let mut map = &mut self.0;
        for key in parents {
            let entry = map
                .entry((*key).to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return;
            };
            map = next;
        }
        map.insert((*last).to_owned(), value);
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the payload into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Serializes the payload to its canonical JSON text.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Flattens the payload into bracketed key/value pairs.
    ///
    /// Nested objects become `a[b][c]`, arrays of scalars repeat `a[]`,
    /// arrays of objects become `a[0][k]`. Nulls are dropped since a query
    /// string has no way to express them.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            flatten_into(key.clone(), value, &mut pairs);
        }
        pairs
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => pairs.push((prefix, flag.to_string())),
        Value::Number(number) => pairs.push((prefix, number.to_string())),
        Value::String(text) => pairs.push((prefix, text.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    flatten_into(format!("{prefix}[{index}]"), item, pairs);
                } else {
                    flatten_into(format!("{prefix}[]"), item, pairs);
                }
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(format!("{prefix}[{key}]"), nested, pairs);
            }
        }
    }
}

/// Normalizes typed or raw parameters into a canonical [`Payload`].
///
/// A unit value or `null` yields an empty payload. Anything that does not
/// serialize to a JSON object is rejected.
pub fn normalize<P>(params: &P) -> Result<Payload>
where
    P: Serialize + ?Sized,
{
    let value =
        serde_json::to_value(params).map_err(|e| Error::Serialization(e.to_string()))?;
    match value {
        Value::Null => Ok(Payload::new()),
        Value::Object(map) => Ok(Payload(map)),
        other => Err(Error::Serialization(format!(
            "parameters must serialize to an object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
