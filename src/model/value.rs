//! Property value type: scalars and homogeneous scalar arrays.

use std::fmt;
use std::ops::Deref;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{Error, Result};

/// A value that can be stored as a node or relationship property.
///
/// Covers the property types a remote graph can hold:
/// - Scalars: Bool, Int, Float, String
/// - Arrays: List (all elements of the same scalar kind)
///
/// `Null` exists so that callers can express "remove this key"; a
/// [`PropertyMap`](super::PropertyMap) never stores it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(List),
}

/// An array property: every element has the same scalar kind.
///
/// Built through [`List::new`], which checks the elements, or through the
/// `From<Vec<_>>` conversions on [`Value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct List(Vec<Value>);

impl List {
    /// Fails unless every element is a scalar of one kind. Nulls and
    /// nested lists are never allowed.
    pub fn new(items: Vec<Value>) -> Result<Self> {
        let mut kinds = items.iter().map(Value::type_name);
        let homogeneous = match kinds.next() {
            None => true,
            Some("LIST" | "NULL") => false,
            Some(first) => kinds.all(|k| k == first),
        };
        if !homogeneous {
            let got = items.iter().map(Value::type_name).collect::<Vec<_>>().join(", ");
            return Err(Error::TypeCastError {
                expected: "list of one scalar kind".into(),
                got: format!("[{got}]"),
            });
        }
        Ok(Self(items))
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl Deref for List {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::List(_) => "LIST",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }
    pub fn is_numeric(&self) -> bool { matches!(self, Value::Int(_) | Value::Float(_)) }
    pub fn is_string(&self) -> bool { matches!(self, Value::String(_)) }

    /// Attempt to extract as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

// ============================================================================
// JSON interchange (raw records)
// ============================================================================

impl Value {
    /// Convert a raw JSON value into a property value.
    ///
    /// Maps, nested arrays and mixed-kind arrays are not valid property
    /// values and are rejected.
    pub fn from_json(json: &JsonValue) -> Result<Value> {
        let value = match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => {
                let items = items.iter().map(Value::from_json).collect::<Result<_>>()?;
                let list = List::new(items).map_err(|_| {
                    Error::HydrationError(format!(
                        "property arrays must hold a single scalar kind, got {json}"
                    ))
                })?;
                Value::List(list)
            }
            JsonValue::Object(_) => {
                return Err(Error::HydrationError(format!(
                    "maps are not valid property values: {json}"
                )));
            }
        };
        Ok(value)
    }

    /// Convert into a raw JSON value. NaN and infinite floats have no JSON
    /// form and are rejected rather than written as null.
    pub fn to_json(&self) -> Result<JsonValue> {
        let json = match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .ok_or_else(|| Error::TypeCastError {
                    expected: "finite float".into(),
                    got: f.to_string(),
                })?,
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => {
                JsonValue::Array(items.iter().map(Value::to_json).collect::<Result<_>>()?)
            }
        };
        Ok(json)
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<u32> for Value { fn from(v: u32) -> Self { Value::Int(v as i64) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<&String> for Value { fn from(v: &String) -> Self { Value::String(v.clone()) } }

// Arrays are only built from a single scalar type, so they stay homogeneous.
impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self { Value::List(List(v.into_iter().map(Value::Bool).collect())) }
}
impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self { Value::List(List(v.into_iter().map(Value::Int).collect())) }
}
impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self { Value::List(List(v.into_iter().map(Value::Float).collect())) }
}
impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self { Value::List(List(v.into_iter().map(Value::String).collect())) }
}
impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self { Value::List(List(v.into_iter().map(Value::from).collect())) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(2.5), Value::Float(2.5));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_lists_must_be_homogeneous() {
        assert!(List::new(vec![Value::Int(1), Value::Int(2)]).is_ok());
        assert!(List::new(vec![]).is_ok());
        assert!(matches!(
            List::new(vec![Value::Int(1), Value::from("x")]),
            Err(Error::TypeCastError { .. })
        ));
        let nested = Value::List(List::new(vec![]).unwrap());
        assert!(List::new(vec![nested]).is_err());
        assert!(List::new(vec![Value::Null, Value::Null]).is_err());
        assert!(List::new(vec![Value::Int(1), Value::Float(1.5)]).is_err());
    }

    #[test]
    fn test_non_finite_floats_have_no_json_form() {
        assert_eq!(Value::Float(1.5).to_json().unwrap(), json!(1.5));
        assert!(matches!(Value::Float(f64::NAN).to_json(), Err(Error::TypeCastError { .. })));
        assert!(Value::from(vec![1.0, f64::INFINITY]).to_json().is_err());
    }

    #[test]
    fn test_from_json_rejects_maps_and_mixed_arrays() {
        assert!(Value::from_json(&json!({"a": 1})).is_err());
        assert!(Value::from_json(&json!([1, "two"])).is_err());
        assert_eq!(
            Value::from_json(&json!(["a", "b"])).unwrap(),
            Value::from(vec!["a", "b"])
        );
        assert_eq!(Value::from_json(&json!(1.5)).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("say \"hi\"").to_string(), "\"say \\\"hi\\\"\"");
        assert_eq!(Value::from(vec![1i64, 2]).to_string(), "[1, 2]");
    }
}
