//! The in-memory document tree.
//!
//! A [`Document`] owns exactly one root map and is addressed with textual field paths
//! (see [`crate::path`]). Documents are built locally, serialized into OJAI wire JSON for
//! inserts and replaces, and rebuilt from wire JSON returned by finds.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::codec;
use crate::error::{OjaiError, OjaiResult};
use crate::merge::deep_merge;
use crate::path::{FieldPath, Segment, ID_FIELD};
use crate::value::{Map, Value};

/// Largest list index [`Document::set`] will pad up to.
pub const MAX_LIST_INDEX: usize = 1 << 20;

/// A JSON-like document addressed by field paths.
///
/// # Example
///
/// ```ignore
/// use ojai::prelude::*;
///
/// let mut doc = Document::new();
/// doc.set_id_string("user-1")?
///     .set("name.first", "Ada")?
///     .set("scores[1]", 42)?;
///
/// assert_eq!(doc.get_str("name.first")?, Some("Ada"));
/// assert_eq!(doc.get("scores[0]")?, Value::Null);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    root: Map,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document that takes ownership of an existing map.
    pub fn from_map(root: Map) -> Self {
        Document { root }
    }

    /// Parses OJAI wire JSON text into a document.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::Serialization`] if the text is not a JSON object and
    /// [`OjaiError::TypeTranslation`] if a tagged value can't be converted.
    pub fn from_json(text: &str) -> OjaiResult<Self> {
        let json: JsonValue = serde_json::from_str(text).map_err(|e| {
            log::error!("Failed to parse document JSON: {}", e);
            OjaiError::from(e)
        })?;
        Self::from_wire(json)
    }

    /// Decodes an already parsed wire object into a document.
    ///
    /// # Errors
    ///
    /// Same as [`Document::from_json`].
    pub fn from_wire(json: JsonValue) -> OjaiResult<Self> {
        match json {
            JsonValue::Object(object) => Ok(Document {
                root: codec::decode_map(&object)?,
            }),
            other => {
                log::error!("Document root must be a JSON object, got {}", other);
                Err(OjaiError::Serialization(format!(
                    "document root must be a JSON object, got {}",
                    other
                )))
            }
        }
    }

    /// Returns the value at `path`, or [`Value::Null`] when nothing is stored there.
    ///
    /// The empty path returns the whole root as a map value.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::MalformedPath`] if the path can't be parsed or navigates
    /// through a value that can't hold the next segment.
    pub fn get(&self, path: &str) -> OjaiResult<Value> {
        let path = FieldPath::parse(path)?;
        if path.is_empty() {
            return Ok(Value::Map(self.root.clone()));
        }
        Ok(self.lookup(&path)?.cloned().unwrap_or(Value::Null))
    }

    /// Returns the string at `path`, or `None` when absent or of another kind.
    ///
    /// # Errors
    ///
    /// Same as [`Document::get`].
    pub fn get_str(&self, path: &str) -> OjaiResult<Option<&str>> {
        Ok(self.find(path)?.and_then(Value::as_str))
    }

    /// Returns the integer at `path`. Floats are not converted.
    pub fn get_i64(&self, path: &str) -> OjaiResult<Option<i64>> {
        Ok(self.find(path)?.and_then(Value::as_i64))
    }

    /// Returns the float at `path`. Integers are not converted.
    pub fn get_f64(&self, path: &str) -> OjaiResult<Option<f64>> {
        Ok(self.find(path)?.and_then(Value::as_f64))
    }

    /// Returns the boolean at `path`.
    pub fn get_bool(&self, path: &str) -> OjaiResult<Option<bool>> {
        Ok(self.find(path)?.and_then(Value::as_bool))
    }

    /// Returns the bytes at `path`.
    pub fn get_binary(&self, path: &str) -> OjaiResult<Option<&[u8]>> {
        Ok(self.find(path)?.and_then(Value::as_binary))
    }

    /// Returns the calendar date at `path`.
    pub fn get_date(&self, path: &str) -> OjaiResult<Option<NaiveDate>> {
        Ok(self.find(path)?.and_then(Value::as_date))
    }

    /// Returns the time of day at `path`.
    pub fn get_time(&self, path: &str) -> OjaiResult<Option<NaiveTime>> {
        Ok(self.find(path)?.and_then(Value::as_time))
    }

    /// Returns the UTC instant at `path`.
    pub fn get_timestamp(&self, path: &str) -> OjaiResult<Option<DateTime<Utc>>> {
        Ok(self.find(path)?.and_then(Value::as_timestamp))
    }

    /// Returns the elements of the list at `path`.
    pub fn get_list(&self, path: &str) -> OjaiResult<Option<&[Value]>> {
        Ok(self
            .find(path)?
            .and_then(Value::as_list)
            .map(Vec::as_slice))
    }

    /// Returns the map at `path`; the empty path yields the root.
    pub fn get_map(&self, path: &str) -> OjaiResult<Option<&Map>> {
        let parsed = FieldPath::parse(path)?;
        if parsed.is_empty() {
            return Ok(Some(&self.root));
        }
        Ok(self.lookup(&parsed)?.and_then(Value::as_map))
    }

    /// Whether the value at `path` is null or absent.
    pub fn is_null(&self, path: &str) -> OjaiResult<bool> {
        Ok(self.find(path)?.is_none_or(Value::is_null))
    }

    /// Whether something, even an explicit null, is stored at `path`.
    pub fn contains_path(&self, path: &str) -> OjaiResult<bool> {
        let parsed = FieldPath::parse(path)?;
        Ok(parsed.is_empty() || self.lookup(&parsed)?.is_some())
    }

    /// Stores `value` at `path`.
    ///
    /// Maps are deep-merged into what is already stored; any other value replaces it.
    /// Indices past the end of a list pad the list with nulls. Missing intermediate
    /// containers are created. The empty path merges a map value into the root.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::MalformedPath`] if the path can't be parsed, if it applies an
    /// index to a map or a name to a list, if it passes through a scalar list element,
    /// if an index exceeds [`MAX_LIST_INDEX`], or if a non-map value is set at the empty
    /// path. Returns [`OjaiError::EmptyIdentity`] if `_id` is given an empty string or
    /// byte sequence. The document is left unchanged.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> OjaiResult<&mut Self> {
        let parsed = FieldPath::parse(path)?;
        let value = value.into();

        if parsed.is_identity() {
            return self.set_id(value);
        }

        if parsed.is_empty() {
            return match value {
                Value::Map(map) => {
                    if let Some(id) = map.get(ID_FIELD) {
                        check_identity(id)?;
                    }
                    deep_merge(&mut self.root, map);
                    Ok(self)
                }
                other => Err(malformed(
                    &parsed,
                    &format!("can't set a {} as the document root", other.type_name()),
                )),
            };
        }

        if let Some(index) = parsed.segments().iter().find_map(|segment| match segment {
            Segment::Index(i) if *i > MAX_LIST_INDEX => Some(*i),
            _ => None,
        }) {
            return Err(index_too_large(&parsed, index));
        }

        let mut root = Value::Map(std::mem::take(&mut self.root));
        let result = assign(&mut root, parsed.segments(), value, &parsed);
        if let Value::Map(map) = root {
            self.root = map;
        }
        result.map(|_| self)
    }

    /// Sets the identity of the document to a string.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::EmptyIdentity`] if `id` is empty.
    pub fn set_id_string(&mut self, id: &str) -> OjaiResult<&mut Self> {
        self.set_id(Value::from(id))
    }

    /// Sets the identity of the document to a byte sequence.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::EmptyIdentity`] if `id` is empty.
    pub fn set_id_binary(&mut self, id: &[u8]) -> OjaiResult<&mut Self> {
        self.set_id(Value::from(id))
    }

    /// The `_id` value, whatever its kind.
    pub fn id(&self) -> Option<&Value> {
        self.root.get(ID_FIELD)
    }

    /// The `_id` value when it is a string.
    pub fn id_string(&self) -> Option<&str> {
        self.id().and_then(Value::as_str)
    }

    /// The `_id` value when it is a byte sequence.
    pub fn id_binary(&self) -> Option<&[u8]> {
        self.id().and_then(Value::as_binary)
    }

    /// Whether the root holds a top-level `_id` entry.
    pub fn has_id(&self) -> bool {
        self.root.contains_key(ID_FIELD)
    }

    /// Removes the value at `path` from its parent container.
    ///
    /// Removing a list element shifts the following elements down. Paths that don't
    /// resolve leave the document untouched.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::MalformedPath`] only if the path can't be parsed.
    pub fn delete(&mut self, path: &str) -> OjaiResult<&mut Self> {
        let parsed = FieldPath::parse(path)?;
        let Some(last) = parsed.last() else {
            return Ok(self);
        };

        let parent = parsed.parent();
        if parent.is_empty() {
            if let Segment::Name(name) = last {
                self.root.shift_remove(name);
            }
            return Ok(self);
        }

        match (lookup_mut(&mut self.root, parent.segments()), last) {
            (Some(Value::Map(map)), Segment::Name(name)) => {
                map.shift_remove(name);
            }
            (Some(Value::List(list)), segment) => {
                if let Some(index) = segment.list_index().filter(|i| *i < list.len()) {
                    list.remove(index);
                }
            }
            _ => {}
        }
        Ok(self)
    }

    /// Deep-merges another document into this one.
    pub fn merge(&mut self, other: &Document) -> &mut Self {
        deep_merge(&mut self.root, other.root.clone());
        self
    }

    /// Removes every field.
    pub fn clear(&mut self) -> &mut Self {
        self.root.clear();
        self
    }

    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Borrows the root map.
    pub fn as_map(&self) -> &Map {
        &self.root
    }

    /// Consumes the document and returns its root map.
    pub fn into_map(self) -> Map {
        self.root
    }

    /// Encodes the document into OJAI wire JSON.
    pub fn to_wire(&self) -> OjaiResult<JsonValue> {
        Ok(JsonValue::Object(codec::encode_map(&self.root)?))
    }

    /// Encodes the document into OJAI wire JSON text.
    pub fn to_json_string(&self) -> OjaiResult<String> {
        Ok(serde_json::to_string(&self.to_wire()?)?)
    }

    fn set_id(&mut self, id: Value) -> OjaiResult<&mut Self> {
        check_identity(&id)?;
        self.root.insert(ID_FIELD.to_string(), id);
        Ok(self)
    }

    fn find(&self, path: &str) -> OjaiResult<Option<&Value>> {
        self.lookup(&FieldPath::parse(path)?)
    }

    fn lookup(&self, path: &FieldPath) -> OjaiResult<Option<&Value>> {
        let mut segments = path.segments().iter();
        let mut current = match segments.next() {
            None => return Ok(None),
            Some(Segment::Name(name)) => self.root.get(name),
            Some(Segment::Index(_)) => return Err(malformed(path, "index applied to a map")),
        };

        for segment in segments {
            current = match current {
                None | Some(Value::Null) => return Ok(None),
                Some(Value::Map(map)) => match segment {
                    Segment::Name(name) => map.get(name),
                    Segment::Index(_) => return Err(malformed(path, "index applied to a map")),
                },
                Some(Value::List(list)) => match segment.list_index() {
                    Some(index) => list.get(index),
                    None => return Err(malformed(path, "name applied to a list")),
                },
                Some(other) => {
                    return Err(malformed(
                        path,
                        &format!("can't descend into a {}", other.type_name()),
                    ));
                }
            };
        }
        Ok(current)
    }
}

impl From<Map> for Document {
    fn from(root: Map) -> Self {
        Document::from_map(root)
    }
}

impl TryFrom<Value> for Document {
    type Error = OjaiError;

    fn try_from(value: Value) -> OjaiResult<Self> {
        match value {
            Value::Map(root) => Ok(Document { root }),
            other => {
                log::error!("A {} can't be turned into a document", other.type_name());
                Err(OjaiError::UnsupportedValueType(format!(
                    "a {} can't be turned into a document",
                    other.type_name()
                )))
            }
        }
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_wire()
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = JsonValue::deserialize(deserializer)?;
        Document::from_wire(json).map_err(de::Error::custom)
    }
}

/// Walks `segments` below `target` and stores `value` at the end.
fn assign(
    target: &mut Value,
    segments: &[Segment],
    value: Value,
    path: &FieldPath,
) -> OjaiResult<()> {
    let Some((segment, rest)) = segments.split_first() else {
        overwrite(target, value);
        return Ok(());
    };

    let in_list = target.is_list();
    let slot = match target {
        Value::Map(map) => match segment {
            Segment::Name(name) => map.entry(name.clone()).or_insert(Value::Null),
            Segment::Index(_) => return Err(malformed(path, "index applied to a map")),
        },
        Value::List(list) => {
            let index = segment
                .list_index()
                .ok_or_else(|| malformed(path, "name applied to a list"))?;
            if index > MAX_LIST_INDEX {
                return Err(index_too_large(path, index));
            }
            if list.len() <= index {
                list.resize(index + 1, Value::Null);
            }
            &mut list[index]
        }
        other => {
            return Err(malformed(
                path,
                &format!("can't descend into a {}", other.type_name()),
            ));
        }
    };

    if let Some(next) = rest.first() {
        if slot.is_null() || (!slot.is_container() && !in_list) {
            *slot = container_for(next);
        } else if !slot.is_container() {
            return Err(malformed(
                path,
                &format!("list element is a {}", slot.type_name()),
            ));
        }
    }
    assign(slot, rest, value, path)
}

fn check_identity(id: &Value) -> OjaiResult<()> {
    let kind = match id {
        Value::String(s) if s.is_empty() => "string",
        Value::Binary(bytes) if bytes.is_empty() => "byte sequence",
        _ => return Ok(()),
    };
    log::error!("Document identity can't be an empty {}", kind);
    Err(OjaiError::EmptyIdentity(format!(
        "identity {} can't be empty",
        kind
    )))
}

fn overwrite(target: &mut Value, value: Value) {
    match (target, value) {
        (Value::Map(existing), Value::Map(next)) => deep_merge(existing, next),
        (target, value) => *target = value,
    }
}

fn container_for(segment: &Segment) -> Value {
    match segment {
        Segment::Index(_) => Value::List(Vec::new()),
        Segment::Name(_) => Value::empty_map(),
    }
}

fn lookup_mut<'a>(root: &'a mut Map, segments: &[Segment]) -> Option<&'a mut Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = match first {
        Segment::Name(name) => root.get_mut(name)?,
        Segment::Index(_) => return None,
    };
    for segment in rest {
        current = match current {
            Value::Map(map) => match segment {
                Segment::Name(name) => map.get_mut(name)?,
                Segment::Index(_) => return None,
            },
            Value::List(list) => list.get_mut(segment.list_index()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn index_too_large(path: &FieldPath, index: usize) -> OjaiError {
    malformed(
        path,
        &format!("index {} exceeds the maximum of {}", index, MAX_LIST_INDEX),
    )
}

fn malformed(path: &FieldPath, reason: &str) -> OjaiError {
    log::error!("Field path {:?}: {}", path.to_string(), reason);
    OjaiError::MalformedPath(format!("{:?}: {}", path.to_string(), reason))
}
