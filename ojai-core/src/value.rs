//! The value model shared by documents and every expression builder.
//!
//! A [`Value`] is a tagged union over the scalar kinds understood by the OJAI wire format
//! and the two container kinds, ordered lists and keyed maps. Maps are backed by
//! [`IndexMap`], so insertion order is kept for serialization while equality ignores it.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::error::{OjaiError, OjaiResult};

/// Keyed map of values. Keys are unique; iteration follows insertion order.
pub type Map = IndexMap<String, Value>;

/// A node of a document or expression tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null, also used to pad lists.
    #[default]
    Null,
    /// Boolean, untagged on the wire.
    Bool(bool),
    /// 64-bit signed integer, `$numberLong` on the wire.
    Int(i64),
    /// 64-bit float, `$numberFloat` on the wire.
    Float(f64),
    /// UTF-8 string, untagged on the wire.
    String(String),
    /// Raw bytes, `$binary` (base64) on the wire.
    Binary(Vec<u8>),
    /// Calendar date, `$dateDay` on the wire.
    Date(NaiveDate),
    /// Time of day, `$time` on the wire.
    Time(NaiveTime),
    /// Instant in UTC, `$date` on the wire.
    Timestamp(DateTime<Utc>),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Keyed map of values.
    Map(Map),
}

impl Value {
    /// Creates a binary value from anything convertible into a byte vector.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Binary(bytes.into())
    }

    /// Creates an empty map value.
    pub fn empty_map() -> Self {
        Value::Map(Map::new())
    }

    /// Short lowercase name of this value's kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Whether this value is an explicit null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Whether this value is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Whether this value is a list or a map.
    pub fn is_container(&self) -> bool {
        self.is_map() || self.is_list()
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one. Floats are not converted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float, if this is one. Integers are not converted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a binary value.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the calendar date, if this is one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the time of day, if this is one.
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the UTC instant, if this is one.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Borrows the elements, if this is a list.
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Mutably borrows the elements, if this is a list.
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Borrows the entries, if this is a map.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Mutably borrows the entries, if this is a map.
    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Consumes the value and returns its map, if it is one.
    pub fn into_map(self) -> Option<Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Binary(value.to_vec())
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Value::Time(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

/// Note that a `Vec<u8>` becomes a list of integers; use [`Value::binary`] for bytes.
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Untagged conversion from plain JSON.
///
/// Single-key `$`-tagged objects are kept as maps here; use [`crate::codec::decode`] to
/// interpret wire tags.
impl TryFrom<JsonValue> for Value {
    type Error = OjaiError;

    fn try_from(json: JsonValue) -> OjaiResult<Self> {
        Ok(match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => number_to_value(&n)?,
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<OjaiResult<Vec<_>>>()?,
            ),
            JsonValue::Object(object) => Value::Map(
                object
                    .into_iter()
                    .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
                    .collect::<OjaiResult<Map>>()?,
            ),
        })
    }
}

/// Converts a JSON number to `Int` when it is integral and fits in `i64`, `Float` otherwise.
pub(crate) fn number_to_value(number: &serde_json::Number) -> OjaiResult<Value> {
    if let Some(i) = number.as_i64() {
        Ok(Value::Int(i))
    } else if number.is_u64() {
        log::error!("Integer {} does not fit in a signed 64-bit value", number);
        Err(OjaiError::UnsupportedValueType(format!(
            "integer {} does not fit in a signed 64-bit value",
            number
        )))
    } else {
        match number.as_f64() {
            Some(f) => Ok(Value::Float(f)),
            None => {
                log::error!("Number {} is not representable", number);
                Err(OjaiError::UnsupportedValueType(format!(
                    "number {} is not representable",
                    number
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_equality_ignores_insertion_order() {
        let mut a = Map::new();
        a.insert("x".to_string(), Value::Int(1));
        a.insert("y".to_string(), Value::Int(2));
        let mut b = Map::new();
        b.insert("y".to_string(), Value::Int(2));
        b.insert("x".to_string(), Value::Int(1));
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn test_native_conversions() {
        assert_eq!(Value::from(12), Value::Int(12));
        assert_eq!(Value::from(2.5f32), Value::Float(2.5));
        assert_eq!(Value::from("abc"), Value::String("abc".to_string()));
        assert_eq!(Value::from(&b"id1"[..]), Value::Binary(b"id1".to_vec()));
        assert_eq!(Value::from(vec![1, 2]), Value::List(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn test_try_from_plain_json() {
        let value = Value::try_from(json!({"a": [1, 2.5, "s", null, true], "b": {"$numberLong": 3}}))
            .unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(
            map["a"],
            Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::from("s"),
                Value::Null,
                Value::Bool(true),
            ])
        );
        // tags are left alone by the plain conversion
        assert_eq!(map["b"].as_map().unwrap()["$numberLong"], Value::Int(3));
    }

    #[test]
    fn test_try_from_rejects_out_of_range_integer() {
        let err = Value::try_from(json!(u64::MAX)).unwrap_err();
        assert!(matches!(err, OjaiError::UnsupportedValueType(_)));
    }

    #[test]
    fn test_accessors_are_kind_strict() {
        let value = Value::Int(4);
        assert_eq!(value.as_i64(), Some(4));
        assert_eq!(value.as_f64(), None);
        assert_eq!(value.type_name(), "integer");
        assert!(!value.is_container());
    }
}
