//! Builder for document mutations sent with update requests.
//!
//! A mutation is a map from operator token to a bucket of `{path: value}` entries. A
//! bucket holding a single entry stays a single map; a second distinct path promotes it
//! to a list of single-entry maps. The `$delete` bucket holds bare path strings instead.
//!
//! ```ignore
//! let mutation = DocumentMutation::new()
//!     .set("a", 12)?
//!     .set("b", 55)?
//!     .increment_int_by_one("visits")?
//!     .delete("obsolete")?;
//! ```

use std::fmt::{self, Display, Formatter};

use serde_json::Value as JsonValue;

use crate::codec;
use crate::document::Document;
use crate::error::{OjaiError, OjaiResult};
use crate::path::FieldPath;
use crate::value::{Map, Value};

/// Mutation operator tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationOp {
    Set,
    /// Set, replacing whatever type is stored.
    SetOrReplace,
    Delete,
    Append,
    Increment,
    Decrement,
    Merge,
}

impl MutationOp {
    /// The wire token of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOp::Set => "$set",
            MutationOp::SetOrReplace => "$put",
            MutationOp::Delete => "$delete",
            MutationOp::Append => "$append",
            MutationOp::Increment => "$increment",
            MutationOp::Decrement => "$decrement",
            MutationOp::Merge => "$merge",
        }
    }
}

impl Display for MutationOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of field mutations applied atomically to one document.
///
/// Every method consumes the builder and returns it again, or an error if the call was
/// invalid. Paths must be non-empty and can't address `_id`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentMutation {
    content: Map,
}

impl DocumentMutation {
    /// Creates an empty mutation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field at `path` to `value`.
    pub fn set(self, path: &str, value: impl Into<Value>) -> OjaiResult<Self> {
        self.push(MutationOp::Set, path, value.into())
    }

    /// Sets or replaces the field at `path`, regardless of the type stored there.
    pub fn set_or_replace(self, path: &str, value: impl Into<Value>) -> OjaiResult<Self> {
        self.push(MutationOp::SetOrReplace, path, value.into())
    }

    /// Appends text to the string stored at `path`.
    pub fn append_string(self, path: &str, value: &str) -> OjaiResult<Self> {
        self.push(MutationOp::Append, path, Value::from(value))
    }

    /// Appends elements to the list stored at `path`.
    pub fn append_list<T: Into<Value>>(self, path: &str, values: Vec<T>) -> OjaiResult<Self> {
        self.push(MutationOp::Append, path, Value::from(values))
    }

    /// Merges `map` into the map stored at `path`.
    pub fn merge_map(self, path: &str, map: Map) -> OjaiResult<Self> {
        self.push(MutationOp::Merge, path, Value::Map(map))
    }

    /// Merges the fields of `document` into the map stored at `path`.
    pub fn merge_document(self, path: &str, document: &Document) -> OjaiResult<Self> {
        self.push(MutationOp::Merge, path, Value::Map(document.as_map().clone()))
    }

    /// Atomically increments the number at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::InvalidMagnitude`] if `by` is not strictly positive.
    pub fn increment_int(self, path: &str, by: i64) -> OjaiResult<Self> {
        let by = positive_int(MutationOp::Increment, by)?;
        self.push(MutationOp::Increment, path, by)
    }

    /// Increments the number at `path` by the integer `1`.
    pub fn increment_int_by_one(self, path: &str) -> OjaiResult<Self> {
        self.push(MutationOp::Increment, path, Value::Int(1))
    }

    /// Atomically increments the number at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::InvalidMagnitude`] if `by` is not strictly positive.
    pub fn increment_float(self, path: &str, by: f64) -> OjaiResult<Self> {
        let by = positive_float(MutationOp::Increment, by)?;
        self.push(MutationOp::Increment, path, by)
    }

    /// Increments the number at `path` by the float `1.0`.
    pub fn increment_float_by_one(self, path: &str) -> OjaiResult<Self> {
        self.push(MutationOp::Increment, path, Value::Float(1.0))
    }

    /// Atomically decrements the number at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::InvalidMagnitude`] if `by` is not strictly positive.
    pub fn decrement_int(self, path: &str, by: i64) -> OjaiResult<Self> {
        let by = positive_int(MutationOp::Decrement, by)?;
        self.push(MutationOp::Decrement, path, by)
    }

    /// Decrements the number at `path` by the integer `1`.
    pub fn decrement_int_by_one(self, path: &str) -> OjaiResult<Self> {
        self.push(MutationOp::Decrement, path, Value::Int(1))
    }

    /// Atomically decrements the number at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::InvalidMagnitude`] if `by` is not strictly positive.
    pub fn decrement_float(self, path: &str, by: f64) -> OjaiResult<Self> {
        let by = positive_float(MutationOp::Decrement, by)?;
        self.push(MutationOp::Decrement, path, by)
    }

    /// Decrements the number at `path` by the float `1.0`.
    pub fn decrement_float_by_one(self, path: &str) -> OjaiResult<Self> {
        self.push(MutationOp::Decrement, path, Value::Float(1.0))
    }

    /// Deletes the field at `path`. Repeated deletes of one path are recorded once.
    pub fn delete(mut self, path: &str) -> OjaiResult<Self> {
        let path = validate(path)?;
        let key = MutationOp::Delete.as_str();
        log::trace!("Adding {} of {:?}", key, path);
        let path = Value::String(path);

        match self.content.get_mut(key) {
            None => {
                self.content.insert(key.to_string(), path);
            }
            Some(Value::List(paths)) => {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
            Some(bucket) => {
                if *bucket != path {
                    let previous = std::mem::take(bucket);
                    *bucket = Value::List(vec![previous, path]);
                }
            }
        }
        Ok(self)
    }

    /// The mutation as operator buckets.
    pub fn as_map(&self) -> &Map {
        &self.content
    }

    /// Consumes the mutation and returns its operator buckets.
    pub fn into_map(self) -> Map {
        self.content
    }

    /// Whether no mutation has been added.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Encodes the mutation into OJAI wire JSON.
    pub fn to_wire(&self) -> OjaiResult<JsonValue> {
        Ok(JsonValue::Object(codec::encode_map(&self.content)?))
    }

    /// Encodes the mutation into OJAI wire JSON text.
    pub fn to_json_string(&self) -> OjaiResult<String> {
        Ok(serde_json::to_string(&self.to_wire()?)?)
    }

    fn push(mut self, op: MutationOp, path: &str, value: Value) -> OjaiResult<Self> {
        let path = validate(path)?;
        let key = op.as_str();
        log::trace!("Adding {} of {:?}", key, path);

        match self.content.get_mut(key) {
            None => {
                self.content.insert(key.to_string(), single(path, value));
            }
            Some(Value::Map(entries)) if entries.contains_key(&path) => {
                entries.insert(path, value);
            }
            Some(bucket) => {
                if bucket.is_map() {
                    let previous = std::mem::take(bucket);
                    *bucket = Value::List(vec![previous]);
                }
                if let Value::List(entries) = bucket {
                    let position = entries
                        .iter()
                        .position(|e| e.as_map().is_some_and(|m| m.contains_key(&path)));
                    match position.and_then(|i| entries[i].as_map_mut()) {
                        Some(entry) => {
                            entry.insert(path, value);
                        }
                        None => entries.push(single(path, value)),
                    }
                }
            }
        }
        Ok(self)
    }
}

/// Checks a mutation path and returns its canonical rendering.
fn validate(path: &str) -> OjaiResult<String> {
    let parsed = FieldPath::parse(path)?;
    if parsed.is_empty() {
        log::error!("Mutation field path can't be empty");
        return Err(OjaiError::MalformedPath(
            "mutation field path can't be empty".to_string(),
        ));
    }
    if parsed.is_identity() {
        log::error!("The _id field can't be mutated");
        return Err(OjaiError::MalformedPath(
            "_id field can't be set or updated".to_string(),
        ));
    }
    Ok(parsed.to_string())
}

fn single(path: String, value: Value) -> Value {
    let mut entry = Map::with_capacity(1);
    entry.insert(path, value);
    Value::Map(entry)
}

fn positive_int(op: MutationOp, by: i64) -> OjaiResult<Value> {
    if by <= 0 {
        log::error!("{} magnitude must be positive, got {}", op, by);
        return Err(OjaiError::InvalidMagnitude(format!(
            "{} magnitude must be positive, got {}",
            op, by
        )));
    }
    Ok(Value::Int(by))
}

fn positive_float(op: MutationOp, by: f64) -> OjaiResult<Value> {
    if by.is_nan() || by <= 0.0 {
        log::error!("{} magnitude must be positive, got {}", op, by);
        return Err(OjaiError::InvalidMagnitude(format!(
            "{} magnitude must be positive, got {}",
            op, by
        )));
    }
    Ok(Value::Float(by))
}
