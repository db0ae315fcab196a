//! Filter expressions for rows.
//!
//! A [`Where`] expression is evaluated against row metadata and a
//! [`DocumentFilter`] against row document text. Both travel over the wire
//! in the familiar operator syntax:
//!
//! ```json
//! {"$or": [{"tag": "a"}, {"year": {"$gte": 2024, "$lt": 2026}}]}
//! {"$contains": "rust", "$not_contains": "python"}
//! ```
//!
//! Evaluation never fails. Shapes that make no sense degrade to a non-match
//! (`$and`/`$or` without a list) or to equality (an unknown operator).

pub mod document;

pub use document::DocumentFilter;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::row::Row;

const AND: &str = "$and";
const OR: &str = "$or";

/// A metadata filter expression.
///
/// # Example
///
/// ```
/// use mesosphere_core::{Metadata, Where};
///
/// let filter = Where::field("tag").eq("a").or(Where::field("tag").eq("b"));
///
/// assert!(filter.matches(Some(&Metadata::new().with_field("tag", "b"))));
/// assert!(!filter.matches(Some(&Metadata::new().with_field("tag", "c"))));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Where {
    /// Conditions on a single field. All of them must hold.
    Field {
        field: String,
        conditions: Vec<Condition>,
    },
    /// Every child must hold. Empty is true.
    And(Vec<Where>),
    /// At least one child must hold. Empty is false.
    Or(Vec<Where>),
    /// A branch that is not an object, or a `$and`/`$or` whose operand is not
    /// a list. Never matches; kept verbatim for the wire.
    Malformed(Value),
}

/// A single comparison against a field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    /// Numeric only.
    Gt(Value),
    /// Numeric only.
    Gte(Value),
    /// Numeric only.
    Lt(Value),
    /// Numeric only.
    Lte(Value),
    /// Operand must be a list, otherwise the condition fails.
    In(Value),
    /// Operand must be a list, otherwise the condition fails.
    Nin(Value),
}

impl Where {
    /// Starts a condition on a field.
    ///
    /// ```
    /// use mesosphere_core::Where;
    ///
    /// let filter = Where::field("age").gt(10);
    /// ```
    pub fn field(name: &str) -> FieldFilter {
        FieldFilter {
            field_name: name.to_string(),
        }
    }

    /// Conjunction of the given expressions.
    pub fn all(children: Vec<Where>) -> Self {
        Where::And(children)
    }

    /// Disjunction of the given expressions.
    pub fn any(children: Vec<Where>) -> Self {
        Where::Or(children)
    }

    /// Combines this filter with another using AND.
    pub fn and(self, other: Where) -> Self {
        match self {
            Where::And(mut children) => {
                children.push(other);
                Where::And(children)
            }
            this => Where::And(vec![this, other]),
        }
    }

    /// Combines this filter with another using OR.
    pub fn or(self, other: Where) -> Self {
        match self {
            Where::Or(mut children) => {
                children.push(other);
                Where::Or(children)
            }
            this => Where::Or(vec![this, other]),
        }
    }

    /// Evaluates the filter against row metadata.
    ///
    /// Absent metadata behaves like an empty map: no field is present, so
    /// equality against any value fails.
    pub fn matches(&self, metadata: Option<&Metadata>) -> bool {
        match self {
            Where::Field { field, conditions } => {
                let value = metadata.and_then(|m| m.get(field));
                conditions.iter().all(|c| c.holds(value))
            }
            Where::And(children) => children.iter().all(|c| c.matches(metadata)),
            Where::Or(children) => children.iter().any(|c| c.matches(metadata)),
            Where::Malformed(_) => false,
        }
    }

    /// Parses a filter from its JSON form. The top level must be an object.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(parse_object(map)),
            other => Err(Error::InvalidFilter(format!(
                "where filter must be a JSON object, got {other}"
            ))),
        }
    }

    /// Renders the filter in its JSON wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Where::Field { field, conditions } => field_to_value(field, conditions),
            Where::And(children) => logical_to_value(AND, children),
            Where::Or(children) => logical_to_value(OR, children),
            Where::Malformed(raw) => raw.clone(),
        }
    }
}

impl TryFrom<Value> for Where {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Where::from_value(&value)
    }
}

impl From<Where> for Value {
    fn from(filter: Where) -> Self {
        filter.to_value()
    }
}

impl Condition {
    /// Parses one `operator: operand` pair. Unknown operators mean equality.
    pub fn parse(operator: &str, operand: Value) -> Self {
        match operator {
            "$eq" => Condition::Eq(operand),
            "$ne" => Condition::Ne(operand),
            "$gt" => Condition::Gt(operand),
            "$gte" => Condition::Gte(operand),
            "$lt" => Condition::Lt(operand),
            "$lte" => Condition::Lte(operand),
            "$in" => Condition::In(operand),
            "$nin" => Condition::Nin(operand),
            _ => Condition::Eq(operand),
        }
    }

    /// The wire operator name.
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "$eq",
            Condition::Ne(_) => "$ne",
            Condition::Gt(_) => "$gt",
            Condition::Gte(_) => "$gte",
            Condition::Lt(_) => "$lt",
            Condition::Lte(_) => "$lte",
            Condition::In(_) => "$in",
            Condition::Nin(_) => "$nin",
        }
    }

    /// The operand the field is compared against.
    pub fn operand(&self) -> &Value {
        match self {
            Condition::Eq(v)
            | Condition::Ne(v)
            | Condition::Gt(v)
            | Condition::Gte(v)
            | Condition::Lt(v)
            | Condition::Lte(v)
            | Condition::In(v)
            | Condition::Nin(v) => v,
        }
    }

    /// Tests the condition against a field value; `None` means the field is absent.
    pub fn holds(&self, value: Option<&Value>) -> bool {
        match self {
            Condition::Eq(target) => value.is_some_and(|v| values_equal(v, target)),
            Condition::Ne(target) => !value.is_some_and(|v| values_equal(v, target)),
            Condition::Gt(target) => compare_numbers(value, target, Ordering::is_gt),
            Condition::Gte(target) => compare_numbers(value, target, Ordering::is_ge),
            Condition::Lt(target) => compare_numbers(value, target, Ordering::is_lt),
            Condition::Lte(target) => compare_numbers(value, target, Ordering::is_le),
            Condition::In(list) => match (value, list.as_array()) {
                (Some(v), Some(list)) => list.iter().any(|item| values_equal(v, item)),
                _ => false,
            },
            Condition::Nin(list) => match list.as_array() {
                Some(list) => !value.is_some_and(|v| list.iter().any(|item| values_equal(v, item))),
                None => false,
            },
        }
    }
}

/// Builder for field-specific conditions.
#[derive(Debug)]
pub struct FieldFilter {
    field_name: String,
}

impl FieldFilter {
    fn condition(self, condition: Condition) -> Where {
        Where::Field {
            field: self.field_name,
            conditions: vec![condition],
        }
    }

    /// Field equals value.
    pub fn eq<V: Into<Value>>(self, value: V) -> Where {
        self.condition(Condition::Eq(value.into()))
    }

    /// Field not equals value. An absent field counts as not equal.
    pub fn ne<V: Into<Value>>(self, value: V) -> Where {
        self.condition(Condition::Ne(value.into()))
    }

    /// Field greater than value.
    pub fn gt<V: Into<Value>>(self, value: V) -> Where {
        self.condition(Condition::Gt(value.into()))
    }

    /// Field greater than or equal to value.
    pub fn gte<V: Into<Value>>(self, value: V) -> Where {
        self.condition(Condition::Gte(value.into()))
    }

    /// Field less than value.
    pub fn lt<V: Into<Value>>(self, value: V) -> Where {
        self.condition(Condition::Lt(value.into()))
    }

    /// Field less than or equal to value.
    pub fn lte<V: Into<Value>>(self, value: V) -> Where {
        self.condition(Condition::Lte(value.into()))
    }

    /// Field value is one of the given values.
    pub fn is_in<V: Into<Value>>(self, values: Vec<V>) -> Where {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.condition(Condition::In(Value::Array(values)))
    }

    /// Field value is none of the given values.
    pub fn not_in<V: Into<Value>>(self, values: Vec<V>) -> Where {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.condition(Condition::Nin(Value::Array(values)))
    }
}

/// Returns true if the metadata satisfies the filter. An absent filter matches.
#[inline]
pub fn matches_where(metadata: Option<&Metadata>, filter: Option<&Where>) -> bool {
    filter.map_or(true, |f| f.matches(metadata))
}

/// Returns true if the document satisfies the filter. An absent filter matches.
#[inline]
pub fn matches_where_document(document: Option<&str>, filter: Option<&DocumentFilter>) -> bool {
    filter.map_or(true, |f| f.matches(document))
}

/// Conjunction of the metadata and document filters over one row.
#[inline]
pub fn matches_vector_filters(
    row: &Row,
    filter: Option<&Where>,
    document_filter: Option<&DocumentFilter>,
) -> bool {
    matches_where(row.metadata.as_ref(), filter)
        && matches_where_document(row.document.as_deref(), document_filter)
}

fn parse_object(map: &Map<String, Value>) -> Where {
    let mut clauses: Vec<Where> = map.iter().map(|(k, v)| parse_entry(k, v)).collect();
    if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        Where::And(clauses)
    }
}

fn parse_entry(key: &str, value: &Value) -> Where {
    if key == AND || key == OR {
        let Some(items) = value.as_array() else {
            let mut raw = Map::new();
            raw.insert(key.to_string(), value.clone());
            return Where::Malformed(Value::Object(raw));
        };
        let children = items.iter().map(parse_branch).collect();
        return if key == AND {
            Where::And(children)
        } else {
            Where::Or(children)
        };
    }

    let conditions = match value {
        Value::Object(operators) => operators
            .iter()
            .map(|(op, operand)| Condition::parse(op, operand.clone()))
            .collect(),
        scalar => vec![Condition::Eq(scalar.clone())],
    };
    Where::Field {
        field: key.to_string(),
        conditions,
    }
}

fn parse_branch(value: &Value) -> Where {
    match value {
        Value::Object(map) => parse_object(map),
        other => Where::Malformed(other.clone()),
    }
}

fn field_to_value(field: &str, conditions: &[Condition]) -> Value {
    let mut out = Map::new();
    match conditions {
        [Condition::Eq(v)] if !v.is_object() => {
            out.insert(field.to_string(), v.clone());
        }
        _ => {
            let mut operators = Map::new();
            for c in conditions {
                if operators.insert(c.operator().to_string(), c.operand().clone()).is_some() {
                    // Same operator twice cannot share one object.
                    let split = conditions
                        .iter()
                        .map(|c| field_to_value(field, std::slice::from_ref(c)))
                        .collect();
                    out.insert(AND.to_string(), Value::Array(split));
                    return Value::Object(out);
                }
            }
            out.insert(field.to_string(), Value::Object(operators));
        }
    }
    Value::Object(out)
}

fn logical_to_value(key: &str, children: &[Where]) -> Value {
    let mut out = Map::new();
    out.insert(
        key.to_string(),
        Value::Array(children.iter().map(Where::to_value).collect()),
    );
    Value::Object(out)
}

/// JSON equality, with integers and floats of equal value comparing equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Numeric ordering test; false unless both sides are numbers.
fn compare_numbers<F>(field_value: Option<&Value>, target: &Value, accept: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    match (field_value, target) {
        (Some(Value::Number(a)), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).is_some_and(accept),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_metadata() -> Metadata {
        Metadata::new()
            .with_field("category", "documents")
            .with_field("year", 2024)
            .with_field("score", 0.95)
            .with_field("active", true)
            .with_field("note", Value::Null)
    }

    fn parse(value: Value) -> Where {
        Where::from_value(&value).unwrap()
    }

    #[test]
    fn test_implicit_equality() {
        let m = test_metadata();
        assert!(parse(json!({"category": "documents"})).matches(Some(&m)));
        assert!(!parse(json!({"category": "images"})).matches(Some(&m)));
    }

    #[test]
    fn test_absent_field_never_equals() {
        let m = test_metadata();
        assert!(!parse(json!({"missing": "x"})).matches(Some(&m)));
        assert!(!parse(json!({"missing": null})).matches(Some(&m)));
        assert!(!parse(json!({"tag": "a"})).matches(None));
    }

    #[test]
    fn test_present_null_equals_null() {
        let m = test_metadata();
        assert!(parse(json!({"note": null})).matches(Some(&m)));
    }

    #[test]
    fn test_ne_on_absent_field_holds() {
        let m = test_metadata();
        assert!(parse(json!({"missing": {"$ne": "x"}})).matches(Some(&m)));
        assert!(!parse(json!({"category": {"$ne": "documents"}})).matches(Some(&m)));
    }

    #[test]
    fn test_numeric_comparisons_are_type_strict() {
        let filter = parse(json!({"age": {"$gt": 10}}));
        assert!(filter.matches(Some(&Metadata::new().with_field("age", 15))));
        assert!(!filter.matches(Some(&Metadata::new().with_field("age", 10))));
        assert!(!filter.matches(Some(&Metadata::new().with_field("age", "15"))));
        assert!(!filter.matches(Some(&Metadata::new())));

        let filter = parse(json!({"age": {"$gt": "10"}}));
        assert!(!filter.matches(Some(&Metadata::new().with_field("age", 15))));
    }

    #[test]
    fn test_numeric_bounds() {
        let m = test_metadata();
        assert!(Where::field("year").gte(2024).matches(Some(&m)));
        assert!(Where::field("year").lte(2024).matches(Some(&m)));
        assert!(Where::field("year").lt(2025).matches(Some(&m)));
        assert!(!Where::field("year").lt(2024).matches(Some(&m)));
        assert!(Where::field("score").gt(0.9).matches(Some(&m)));
    }

    #[test]
    fn test_integer_and_float_compare_equal() {
        let m = Metadata::new().with_field("n", 15);
        assert!(parse(json!({"n": 15.0})).matches(Some(&m)));
        assert!(parse(json!({"n": {"$in": [1, 15.0]}})).matches(Some(&m)));
    }

    #[test]
    fn test_operators_under_one_field_are_anded() {
        let m = test_metadata();
        assert!(parse(json!({"year": {"$gte": 2020, "$lt": 2025}})).matches(Some(&m)));
        assert!(!parse(json!({"year": {"$gte": 2020, "$lt": 2024}})).matches(Some(&m)));
    }

    #[test]
    fn test_in_and_nin() {
        let m = test_metadata();
        assert!(parse(json!({"category": {"$in": ["documents", "images"]}})).matches(Some(&m)));
        assert!(!parse(json!({"category": {"$in": ["audio"]}})).matches(Some(&m)));
        assert!(parse(json!({"category": {"$nin": ["audio"]}})).matches(Some(&m)));
        assert!(!parse(json!({"category": {"$nin": ["documents"]}})).matches(Some(&m)));
        assert!(parse(json!({"missing": {"$nin": ["x"]}})).matches(Some(&m)));
        assert!(!parse(json!({"missing": {"$in": ["x"]}})).matches(Some(&m)));
    }

    #[test]
    fn test_in_with_non_list_operand_fails() {
        let m = test_metadata();
        assert!(!parse(json!({"category": {"$in": "documents"}})).matches(Some(&m)));
        assert!(!parse(json!({"category": {"$nin": "images"}})).matches(Some(&m)));
    }

    #[test]
    fn test_unknown_operator_falls_back_to_equality() {
        let m = test_metadata();
        assert!(parse(json!({"category": {"$like": "documents"}})).matches(Some(&m)));
        assert!(!parse(json!({"category": {"$like": "doc"}})).matches(Some(&m)));
    }

    #[test]
    fn test_or() {
        let filter = parse(json!({"$or": [{"tag": "a"}, {"tag": "b"}]}));
        for (tag, expected) in [("a", true), ("b", true), ("c", false)] {
            let m = Metadata::new().with_field("tag", tag);
            assert_eq!(filter.matches(Some(&m)), expected, "tag = {tag}");
        }
    }

    #[test]
    fn test_and() {
        let m = test_metadata();
        assert!(parse(json!({"$and": [{"category": "documents"}, {"year": {"$gte": 2024}}]}))
            .matches(Some(&m)));
        assert!(!parse(json!({"$and": [{"category": "documents"}, {"year": {"$gt": 2024}}]}))
            .matches(Some(&m)));
    }

    #[test]
    fn test_empty_logical_operators() {
        let m = test_metadata();
        assert!(parse(json!({"$and": []})).matches(Some(&m)));
        assert!(!parse(json!({"$or": []})).matches(Some(&m)));
        assert!(parse(json!({})).matches(None));
    }

    #[test]
    fn test_logical_operators_require_lists() {
        let m = test_metadata();
        assert!(!parse(json!({"$and": {"category": "documents"}})).matches(Some(&m)));
        assert!(!parse(json!({"$or": "documents"})).matches(Some(&m)));
        assert!(!parse(json!({"$and": [5]})).matches(Some(&m)));
    }

    #[test]
    fn test_top_level_keys_are_anded() {
        let m = test_metadata();
        assert!(parse(json!({"category": "documents", "active": true})).matches(Some(&m)));
        assert!(!parse(json!({"category": "documents", "active": false})).matches(Some(&m)));
    }

    #[test]
    fn test_builder_combinators_flatten() {
        let filter = Where::field("a").eq(1).and(Where::field("b").eq(2)).and(Where::field("c").eq(3));
        match filter {
            Where::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_top_level_is_rejected() {
        assert!(matches!(
            Where::from_value(&json!([1, 2])),
            Err(Error::InvalidFilter(_))
        ));
        assert!(serde_json::from_value::<Where>(json!("tag")).is_err());
    }

    #[test]
    fn test_wire_form() {
        assert_eq!(Where::field("tag").eq("a").to_value(), json!({"tag": "a"}));
        assert_eq!(
            Where::field("age").gt(10).or(Where::field("tag").is_in(vec!["x"])).to_value(),
            json!({"$or": [{"age": {"$gt": 10}}, {"tag": {"$in": ["x"]}}]})
        );
        let raw = json!({"$and": 3});
        assert_eq!(parse(raw.clone()).to_value(), raw);
    }

    #[test]
    fn test_duplicate_operators_split_into_and() {
        let filter = Where::Field {
            field: "n".into(),
            conditions: vec![Condition::Ne(json!(1)), Condition::Ne(json!(2))],
        };
        let wire = filter.to_value();
        assert_eq!(wire, json!({"$and": [{"n": {"$ne": 1}}, {"n": {"$ne": 2}}]}));

        let m = Metadata::new().with_field("n", 3);
        assert_eq!(parse(wire).matches(Some(&m)), filter.matches(Some(&m)));
    }

    #[test]
    fn test_matches_vector_filters_is_a_conjunction() {
        let row = Row::new("id1")
            .with_document("hello world")
            .with_metadata(Metadata::new().with_field("tag", "a"));
        let meta_ok = Where::field("tag").eq("a");
        let meta_bad = Where::field("tag").eq("b");
        let doc_ok = DocumentFilter::contains("hello");
        let doc_bad = DocumentFilter::contains("goodbye");

        assert!(matches_vector_filters(&row, Some(&meta_ok), Some(&doc_ok)));
        assert!(!matches_vector_filters(&row, Some(&meta_ok), Some(&doc_bad)));
        assert!(!matches_vector_filters(&row, Some(&meta_bad), Some(&doc_ok)));
        assert!(matches_vector_filters(&row, None, None));
    }
}
