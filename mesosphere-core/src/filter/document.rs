//! Document text filters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const CONTAINS: &str = "$contains";
const NOT_CONTAINS: &str = "$not_contains";

/// Substring filter over a row's document text.
///
/// Both operators may be set at once; they are AND-ed. A row without a
/// document is treated as having empty text. When parsing, unknown operators
/// and non-string operands are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct DocumentFilter {
    contains: Option<String>,
    not_contains: Option<String>,
}

impl DocumentFilter {
    /// Document must contain `text`.
    pub fn contains<S: Into<String>>(text: S) -> Self {
        Self {
            contains: Some(text.into()),
            not_contains: None,
        }
    }

    /// Document must not contain `text`.
    pub fn not_contains<S: Into<String>>(text: S) -> Self {
        Self {
            contains: None,
            not_contains: Some(text.into()),
        }
    }

    /// Adds a `$contains` requirement. Chainable.
    pub fn with_contains<S: Into<String>>(mut self, text: S) -> Self {
        self.contains = Some(text.into());
        self
    }

    /// Adds a `$not_contains` requirement. Chainable.
    pub fn with_not_contains<S: Into<String>>(mut self, text: S) -> Self {
        self.not_contains = Some(text.into());
        self
    }

    /// Returns true if no operator is set; such a filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.contains.is_none() && self.not_contains.is_none()
    }

    pub fn matches(&self, document: Option<&str>) -> bool {
        let text = document.unwrap_or("");
        if let Some(needle) = &self.contains {
            if !text.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.not_contains {
            if text.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }

    /// Parses the JSON form. The top level must be an object.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::InvalidFilter(format!(
                "where_document filter must be a JSON object, got {value}"
            )));
        };
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        Ok(Self {
            contains: text(CONTAINS),
            not_contains: text(NOT_CONTAINS),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        if let Some(text) = &self.contains {
            out.insert(CONTAINS.to_string(), Value::String(text.clone()));
        }
        if let Some(text) = &self.not_contains {
            out.insert(NOT_CONTAINS.to_string(), Value::String(text.clone()));
        }
        Value::Object(out)
    }
}

impl TryFrom<Value> for DocumentFilter {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        DocumentFilter::from_value(&value)
    }
}

impl From<DocumentFilter> for Value {
    fn from(filter: DocumentFilter) -> Self {
        filter.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contains() {
        let f = DocumentFilter::contains("world");
        assert!(f.matches(Some("hello world")));
        assert!(!f.matches(Some("hello")));
        assert!(!f.matches(None));
    }

    #[test]
    fn test_not_contains() {
        let f = DocumentFilter::not_contains("python");
        assert!(f.matches(Some("rust is fast")));
        assert!(!f.matches(Some("python is popular")));
        assert!(f.matches(None));
    }

    #[test]
    fn test_both_operators_are_anded() {
        let f = DocumentFilter::contains("rust").with_not_contains("python");
        assert!(f.matches(Some("rust only")));
        assert!(!f.matches(Some("rust and python")));
        assert!(!f.matches(Some("neither")));
    }

    #[test]
    fn test_unknown_operators_and_non_strings_are_ignored() {
        let f = DocumentFilter::from_value(&json!({"$regex": "x", "$contains": 5})).unwrap();
        assert!(f.is_empty());
        assert!(f.matches(Some("anything")));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(DocumentFilter::from_value(&json!("hello")).is_err());
    }

    #[test]
    fn test_wire_form() {
        let f = DocumentFilter::contains("a").with_not_contains("b");
        let wire = serde_json::to_value(&f).unwrap();
        assert_eq!(wire, json!({"$contains": "a", "$not_contains": "b"}));
        assert_eq!(serde_json::from_value::<DocumentFilter>(wire).unwrap(), f);
    }
}
