//! Conversion between the value model and OJAI wire JSON.
//!
//! Scalars without a plain JSON representation travel as single-key tagged objects:
//!
//! | Value | Wire form |
//! |-------|-----------|
//! | `Int` | `{"$numberLong": 7}` |
//! | `Float` | `{"$numberFloat": 2.5}` |
//! | `Binary` | `{"$binary": "<base64>"}` |
//! | `Time` | `{"$time": "10:20:30"}` |
//! | `Date` | `{"$dateDay": "2020-01-31"}` |
//! | `Timestamp` | `{"$date": "2020-01-31T10:20:30.5Z"}` |
//!
//! Null, booleans and strings are untagged. Lists and maps are walked recursively.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::error::{OjaiError, OjaiResult};
use crate::value::{number_to_value, Map, Value};

const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The tags recognized on single-key wire objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    NumberLong,
    NumberFloat,
    Binary,
    Time,
    DateDay,
    Date,
}

impl TypeTag {
    /// Every tag, in wire-table order.
    pub const ALL: [TypeTag; 6] = [
        TypeTag::NumberLong,
        TypeTag::NumberFloat,
        TypeTag::Binary,
        TypeTag::Time,
        TypeTag::DateDay,
        TypeTag::Date,
    ];

    /// Looks up the tag for a wire object key.
    pub fn from_key(key: &str) -> Option<TypeTag> {
        TypeTag::ALL.into_iter().find(|tag| tag.as_str() == key)
    }

    /// The wire key of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::NumberLong => "$numberLong",
            TypeTag::NumberFloat => "$numberFloat",
            TypeTag::Binary => "$binary",
            TypeTag::Time => "$time",
            TypeTag::DateDay => "$dateDay",
            TypeTag::Date => "$date",
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = OjaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::from_key(s).ok_or_else(|| translation_error(format!("unknown type tag {:?}", s)))
    }
}

/// Encodes a value into its wire JSON form.
///
/// Fails with [`OjaiError::UnsupportedValueType`] for non-finite floats.
pub fn encode(value: &Value) -> OjaiResult<JsonValue> {
    Ok(match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Int(i) => tagged(TypeTag::NumberLong, JsonValue::Number((*i).into())),
        Value::Float(f) => {
            let number = Number::from_f64(*f).ok_or_else(|| {
                log::error!("Float {} has no wire representation", f);
                OjaiError::UnsupportedValueType(format!("float {} has no wire representation", f))
            })?;
            tagged(TypeTag::NumberFloat, JsonValue::Number(number))
        }
        Value::Binary(bytes) => tagged(TypeTag::Binary, JsonValue::String(BASE64.encode(bytes))),
        Value::Time(t) => tagged(
            TypeTag::Time,
            JsonValue::String(t.format(TIME_FORMAT).to_string()),
        ),
        Value::Date(d) => tagged(
            TypeTag::DateDay,
            JsonValue::String(d.format(DATE_FORMAT).to_string()),
        ),
        Value::Timestamp(ts) => tagged(
            TypeTag::Date,
            JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        ),
        Value::List(items) => JsonValue::Array(items.iter().map(encode).collect::<OjaiResult<_>>()?),
        Value::Map(map) => JsonValue::Object(encode_map(map)?),
    })
}

/// Encodes a value with plain JSON numbers.
///
/// Integers and floats are written untagged; binary and temporal scalars still use their
/// tags since JSON has no representation for them.
pub fn encode_plain(value: &Value) -> OjaiResult<JsonValue> {
    Ok(match value {
        Value::Int(i) => JsonValue::Number((*i).into()),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(number) => JsonValue::Number(number),
            None => return encode(value),
        },
        Value::List(items) => {
            JsonValue::Array(items.iter().map(encode_plain).collect::<OjaiResult<_>>()?)
        }
        Value::Map(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| encode_plain(v).map(|v| (k.clone(), v)))
                .collect::<OjaiResult<_>>()?,
        ),
        other => encode(other)?,
    })
}

/// Encodes every entry of a map, keeping its order.
pub fn encode_map(map: &Map) -> OjaiResult<JsonMap<String, JsonValue>> {
    map.iter()
        .map(|(k, v)| encode(v).map(|v| (k.clone(), v)))
        .collect()
}

/// Decodes wire JSON into a value, interpreting tagged single-key objects.
pub fn decode(json: &JsonValue) -> OjaiResult<Value> {
    match json {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Bool(*b)),
        JsonValue::Number(n) => number_to_value(n),
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        JsonValue::Array(items) => Ok(Value::List(
            items.iter().map(decode).collect::<OjaiResult<_>>()?,
        )),
        JsonValue::Object(object) => {
            if object.len() == 1 {
                if let Some((key, payload)) = object.iter().next() {
                    if let Some(tag) = TypeTag::from_key(key) {
                        return decode_tagged(tag, payload);
                    }
                }
            }
            Ok(Value::Map(decode_map(object)?))
        }
    }
}

/// Decodes every entry of a JSON object, keeping its order.
pub fn decode_map(object: &JsonMap<String, JsonValue>) -> OjaiResult<Map> {
    object
        .iter()
        .map(|(k, v)| decode(v).map(|v| (k.clone(), v)))
        .collect()
}

/// Converts the payload of a tagged wire object into the native scalar.
pub fn decode_tagged(tag: TypeTag, payload: &JsonValue) -> OjaiResult<Value> {
    match tag {
        TypeTag::NumberLong => match payload {
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Value::Int(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                        Ok(Value::Int(f as i64))
                    }
                    _ => Err(translation_error(format!("{} expects an integer, got {}", tag, n))),
                }
            }
            other => Err(unexpected_payload(tag, "a number", other)),
        },
        TypeTag::NumberFloat => match payload.as_f64() {
            Some(f) => Ok(Value::Float(f)),
            None => Err(unexpected_payload(tag, "a number", payload)),
        },
        TypeTag::Binary => {
            let text = expect_str(tag, payload)?;
            BASE64
                .decode(text)
                .map(Value::Binary)
                .map_err(|e| translation_error(format!("{} has invalid base64: {}", tag, e)))
        }
        TypeTag::Time => {
            let text = expect_str(tag, payload)?;
            NaiveTime::parse_from_str(text, TIME_FORMAT)
                .map(Value::Time)
                .map_err(|e| translation_error(format!("{} can't parse {:?}: {}", tag, text, e)))
        }
        TypeTag::DateDay => {
            let text = expect_str(tag, payload)?;
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|e| translation_error(format!("{} can't parse {:?}: {}", tag, text, e)))
        }
        TypeTag::Date => {
            let text = expect_str(tag, payload)?;
            DateTime::parse_from_rfc3339(text)
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|e| translation_error(format!("{} can't parse {:?}: {}", tag, text, e)))
        }
    }
}

/// Parses wire JSON text and decodes it.
pub fn decode_str(text: &str) -> OjaiResult<Value> {
    let json: JsonValue = serde_json::from_str(text).map_err(|e| {
        log::error!("Failed to parse wire JSON: {}", e);
        OjaiError::from(e)
    })?;
    decode(&json)
}

fn tagged(tag: TypeTag, payload: JsonValue) -> JsonValue {
    let mut object = JsonMap::with_capacity(1);
    object.insert(tag.as_str().to_string(), payload);
    JsonValue::Object(object)
}

fn expect_str(tag: TypeTag, payload: &JsonValue) -> OjaiResult<&str> {
    payload
        .as_str()
        .ok_or_else(|| unexpected_payload(tag, "a string", payload))
}

fn unexpected_payload(tag: TypeTag, expected: &str, got: &JsonValue) -> OjaiError {
    translation_error(format!("{} expects {}, got {}", tag, expected, got))
}

fn translation_error(message: String) -> OjaiError {
    log::error!("{}", message);
    OjaiError::TypeTranslation(message)
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        encode(self)
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = JsonValue::deserialize(deserializer)?;
        decode(&json).map_err(de::Error::custom)
    }
}
