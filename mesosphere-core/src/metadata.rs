//! Row metadata.
//!
//! Metadata is a flat mapping from field name to a scalar (string, number,
//! bool) or null. It is what metadata filters are evaluated against.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Metadata attached to a row.
///
/// Serializes as a plain JSON object.
///
/// # Example
///
/// ```
/// use mesosphere_core::Metadata;
///
/// let metadata = Metadata::new()
///     .with_field("tag", "a")
///     .with_field("year", 2024);
///
/// assert_eq!(metadata.get_str("tag"), Some("a"));
/// assert_eq!(metadata.get_i64("year"), Some(2024));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: HashMap<String, Value>,
}

impl Metadata {
    /// Creates an empty metadata map.
    #[inline]
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Converts a JSON value into metadata. Only objects are accepted.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                fields: map.into_iter().collect(),
            }),
            other => Err(Error::contract(format!(
                "metadata must be a JSON object, got {other}"
            ))),
        }
    }

    /// Adds a field. Chainable.
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Gets a field value by key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Gets a field as a string.
    #[inline]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// Gets a field as an i64.
    #[inline]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(|v| v.as_i64())
    }

    /// Gets a field as an f64.
    #[inline]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(|v| v.as_f64())
    }

    /// Gets a field as a bool.
    #[inline]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(|v| v.as_bool())
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns an iterator over the fields.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Fails unless every value is a scalar or null.
    pub fn ensure_scalar(&self) -> Result<()> {
        match self
            .fields
            .iter()
            .find(|(_, v)| matches!(v, Value::Array(_) | Value::Object(_)))
        {
            Some((key, _)) => Err(Error::contract(format!(
                "metadata field '{key}' must be a string, number, bool or null"
            ))),
            None => Ok(()),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
