//! Tree merging shared by documents, conditions and queries.
//!
//! Two flavours exist. [`deep_merge`] is used by documents: maps merge recursively and
//! anything else, lists included, is replaced. [`merge_maps`] is used when assembling
//! expressions: lists are merged as well, so clauses contributed by separate calls end up
//! side by side.

use crate::value::{Map, Value};

/// Merges `incoming` into `base`, recursing where both sides hold maps.
///
/// Every other value in `incoming` replaces the value in `base`.
pub fn deep_merge(base: &mut Map, incoming: Map) {
    for (key, value) in incoming {
        let value = match (base.get_mut(&key), value) {
            (Some(Value::Map(existing)), Value::Map(next)) => {
                deep_merge(existing, next);
                continue;
            }
            (_, value) => value,
        };
        base.insert(key, value);
    }
}

/// Merges `incoming` into `base` for expression assembly.
///
/// Maps merge recursively, lists merge with [`merge_lists`], anything else is
/// overwritten.
pub fn merge_maps(base: &mut Map, incoming: Map) {
    for (key, value) in incoming {
        let value = match (base.get_mut(&key), value) {
            (Some(Value::Map(existing)), Value::Map(next)) => {
                merge_maps(existing, next);
                continue;
            }
            (Some(Value::List(existing)), Value::List(next)) => {
                merge_lists(existing, next);
                continue;
            }
            (_, value) => value,
        };
        base.insert(key, value);
    }
}

/// Merges the elements of `incoming` into `base`.
///
/// A map element is folded into the first existing map element that shares one of its
/// keys with [`merge_maps`], or appended when none does. Any other element is appended unless an equal one
/// is already present.
pub fn merge_lists(base: &mut Vec<Value>, incoming: Vec<Value>) {
    for element in incoming {
        match element {
            Value::Map(entries) => {
                let position = base.iter().position(|existing| {
                    matches!(existing, Value::Map(m) if entries.keys().any(|k| m.contains_key(k)))
                });
                match position.and_then(|i| base[i].as_map_mut()) {
                    Some(existing) => merge_maps(existing, entries),
                    None => base.push(Value::Map(entries)),
                }
            }
            other => {
                if !base.contains(&other) {
                    base.push(other);
                }
            }
        }
    }
}
