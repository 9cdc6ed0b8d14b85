//! The key/value context threaded through interactor runs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while reading or writing typed context values.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A value could not be converted to or from JSON.
    #[error("Context value for '{key}' could not be converted: {source}")]
    Conversion {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A context can only be built from a JSON object.
    #[error("Context must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Mutable key/value state owned by one unit instance at a time.
///
/// Values are JSON values, so cloning a context is a deep copy: no two
/// clones ever share a mutable aggregate. Pipelines rely on this to hand each
/// child an isolated snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserializes the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
        self.0
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|source| ContextError::Conversion {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Stores a raw value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Serializes `value` and stores it under `key`.
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<(), ContextError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| ContextError::Conversion {
            key: key.clone(),
            source,
        })?;
        self.0.insert(key, value);
        Ok(())
    }

    /// Removes `key`, returning its value if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
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

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Consumes the context, returning the underlying JSON object.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Context> for Map<String, Value> {
    fn from(context: Context) -> Self {
        context.0
    }
}

impl From<Context> for Value {
    fn from(context: Context) -> Self {
        Value::Object(context.0)
    }
}

impl TryFrom<Value> for Context {
    type Error = ContextError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(ContextError::NotAnObject("null")),
            Value::Bool(_) => Err(ContextError::NotAnObject("boolean")),
            Value::Number(_) => Err(ContextError::NotAnObject("number")),
            Value::String(_) => Err(ContextError::NotAnObject("string")),
            Value::Array(_) => Err(ContextError::NotAnObject("array")),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
