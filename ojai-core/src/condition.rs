//! Boolean condition compiler.
//!
//! Conditions are written as a flat sequence of calls that open logical blocks, add
//! predicates and close blocks again:
//!
//! ```ignore
//! let condition = Condition::new()
//!     .and()
//!     .in_list("p", vec!["1", "2", "3"])
//!     .equals("p2", 55)
//!     .close()
//!     .build()?;
//! // {"$and": [{"$in": {"p": ["1", "2", "3"]}}, {"$eq": {"p2": 55}}]}
//! ```
//!
//! Calls only queue tokens. [`Condition::build`] compiles the queue into a nested map
//! with an explicit stack of open blocks.

use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};

use serde_json::Value as JsonValue;

use crate::codec;
use crate::error::{OjaiError, OjaiResult};
use crate::merge::merge_maps;
use crate::path::FieldPath;
use crate::value::{Map, Value};

/// Operators opening a block of clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    /// All clauses must hold for one element of a list field.
    ElementAnd,
}

impl LogicalOp {
    /// The wire token of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "$and",
            LogicalOp::Or => "$or",
            LogicalOp::ElementAnd => "$elementAnd",
        }
    }
}

/// Predicate operators other than comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOp {
    Exists,
    NotExists,
    In,
    NotIn,
    TypeOf,
    NotTypeOf,
    Matches,
    NotMatches,
    Like,
    NotLike,
}

impl ConditionOp {
    /// The wire token of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOp::Exists => "$exists",
            ConditionOp::NotExists => "$notexists",
            ConditionOp::In => "$in",
            ConditionOp::NotIn => "$notin",
            ConditionOp::TypeOf => "$typeof",
            ConditionOp::NotTypeOf => "$nottypeof",
            ConditionOp::Matches => "$matches",
            ConditionOp::NotMatches => "$notmatches",
            ConditionOp::Like => "$like",
            ConditionOp::NotLike => "$notlike",
        }
    }
}

/// Comparison operators used with [`Condition::is`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl Comparison {
    /// The wire token of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Less => "$lt",
            Comparison::LessOrEqual => "$le",
            Comparison::Greater => "$gt",
            Comparison::GreaterOrEqual => "$ge",
            Comparison::Equal => "$eq",
            Comparison::NotEqual => "$ne",
        }
    }
}

macro_rules! impl_display_as_str {
    ($($ty:ty),*) => {
        $(
            impl Display for $ty {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

impl_display_as_str!(LogicalOp, ConditionOp, Comparison);

/// One queued builder call.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionToken {
    /// Opens a block; element-and blocks carry the list field they apply to.
    Open(LogicalOp, Option<String>),
    /// A finished predicate map such as `{"$eq": {"a": 1}}`.
    Predicate(Map),
    /// Closes the innermost open block.
    Close,
}

/// A block being compiled.
struct Frame {
    op: LogicalOp,
    field: Option<String>,
    clauses: Vec<Value>,
}

impl Frame {
    fn into_block(self) -> Map {
        let clauses = Value::List(self.clauses);
        let body = match self.field {
            Some(field) => {
                let mut by_field = Map::with_capacity(1);
                by_field.insert(field, clauses);
                Value::Map(by_field)
            }
            None => clauses,
        };
        let mut block = Map::with_capacity(1);
        block.insert(self.op.as_str().to_string(), body);
        block
    }
}

/// A filtering condition, usable in a query's `$where` or on its own for conditional
/// writes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    tokens: VecDeque<ConditionToken>,
    content: Map,
    built: bool,
}

impl Condition {
    /// Creates an empty, unbuilt condition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an `$and` block.
    pub fn and(self) -> Self {
        self.push(ConditionToken::Open(LogicalOp::And, None))
    }

    /// Opens an `$or` block.
    pub fn or(self) -> Self {
        self.push(ConditionToken::Open(LogicalOp::Or, None))
    }

    /// Opens an `$elementAnd` block over the list at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::MalformedPath`] if `path` is empty or can't be parsed.
    pub fn element_and(self, path: &str) -> OjaiResult<Self> {
        if FieldPath::parse(path)?.is_empty() {
            log::error!("Element-and field path can't be empty");
            return Err(OjaiError::MalformedPath(
                "element-and field path can't be empty".to_string(),
            ));
        }
        Ok(self.push(ConditionToken::Open(
            LogicalOp::ElementAnd,
            Some(path.to_string()),
        )))
    }

    /// Closes the innermost open block.
    pub fn close(self) -> Self {
        self.push(ConditionToken::Close)
    }

    /// Matches documents where `path` exists.
    pub fn exists(self, path: &str) -> Self {
        self.predicate(ConditionOp::Exists.as_str(), Value::from(path))
    }

    /// Matches documents where `path` doesn't exist.
    pub fn not_exists(self, path: &str) -> Self {
        self.predicate(ConditionOp::NotExists.as_str(), Value::from(path))
    }

    /// Matches when the value at `path` equals one of `values`.
    pub fn in_list<T: Into<Value>>(self, path: &str, values: Vec<T>) -> Self {
        self.field_predicate(ConditionOp::In.as_str(), path, Value::from(values))
    }

    /// Matches when the value at `path` equals none of `values`.
    pub fn not_in_list<T: Into<Value>>(self, path: &str, values: Vec<T>) -> Self {
        self.field_predicate(ConditionOp::NotIn.as_str(), path, Value::from(values))
    }

    /// Matches when the value at `path` has the given type.
    pub fn type_of(self, path: &str, value_type: impl Into<Value>) -> Self {
        self.field_predicate(ConditionOp::TypeOf.as_str(), path, value_type.into())
    }

    /// Matches when the value at `path` has any other type.
    pub fn not_type_of(self, path: &str, value_type: impl Into<Value>) -> Self {
        self.field_predicate(ConditionOp::NotTypeOf.as_str(), path, value_type.into())
    }

    /// Matches strings at `path` against a regular expression.
    pub fn matches(self, path: &str, regex: impl Into<Value>) -> Self {
        self.field_predicate(ConditionOp::Matches.as_str(), path, regex.into())
    }

    /// Matches strings at `path` that don't match a regular expression.
    pub fn not_matches(self, path: &str, regex: impl Into<Value>) -> Self {
        self.field_predicate(ConditionOp::NotMatches.as_str(), path, regex.into())
    }

    /// Matches strings at `path` against an SQL `LIKE` pattern.
    pub fn like(self, path: &str, expression: impl Into<Value>) -> Self {
        self.field_predicate(ConditionOp::Like.as_str(), path, expression.into())
    }

    /// Matches strings at `path` that don't match an SQL `LIKE` pattern.
    pub fn not_like(self, path: &str, expression: impl Into<Value>) -> Self {
        self.field_predicate(ConditionOp::NotLike.as_str(), path, expression.into())
    }

    /// Matches when the value at `path` equals `value`.
    pub fn equals(self, path: &str, value: impl Into<Value>) -> Self {
        self.is(path, Comparison::Equal, value)
    }

    /// Matches when the value at `path` differs from `value`.
    pub fn not_equals(self, path: &str, value: impl Into<Value>) -> Self {
        self.is(path, Comparison::NotEqual, value)
    }

    /// Compares the value at `path` with `value`.
    pub fn is(self, path: &str, op: Comparison, value: impl Into<Value>) -> Self {
        self.field_predicate(op.as_str(), path, value.into())
    }

    /// Adds the compiled map of another condition as a single clause.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::NotBuilt`] if `other` hasn't been built.
    pub fn add_condition(self, other: &Condition) -> OjaiResult<Self> {
        if !other.built {
            log::error!("Can't add a condition that hasn't been built");
            return Err(OjaiError::NotBuilt(
                "build the condition before adding it".to_string(),
            ));
        }
        Ok(self.push(ConditionToken::Predicate(other.content.clone())))
    }

    /// Adds a raw condition map as a single clause.
    pub fn add_condition_map(self, condition: Map) -> Self {
        self.push(ConditionToken::Predicate(condition))
    }

    /// Compiles the queued tokens.
    ///
    /// Blocks are emitted as `{op: [clauses]}`, or `{"$elementAnd": {field: [clauses]}}`,
    /// with clauses in call order. Top-level blocks are merged into one map. A predicate
    /// outside any block is accepted only when it is the sole top-level item.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::UnbalancedCondition`] on a close without an open block, on
    /// blocks left open, on a bare predicate next to other top-level items, or on a
    /// top-level block repeating an operator already used at the top level. Building a
    /// built condition is a no-op; calls queued after the first build fail with
    /// [`OjaiError::AlreadyBuilt`].
    pub fn build(mut self) -> OjaiResult<Self> {
        if self.built {
            if self.tokens.is_empty() {
                return Ok(self);
            }
            log::error!("{} call(s) queued on a built condition", self.tokens.len());
            return Err(OjaiError::AlreadyBuilt(format!(
                "{} call(s) queued after the condition was built",
                self.tokens.len()
            )));
        }

        let mut stack: Vec<Frame> = Vec::new();
        let mut top_level_blocks = 0usize;
        let mut top_level_predicates = 0usize;

        while let Some(token) = self.tokens.pop_front() {
            match token {
                ConditionToken::Open(op, field) => stack.push(Frame {
                    op,
                    field,
                    clauses: Vec::new(),
                }),
                ConditionToken::Predicate(predicate) => match stack.last_mut() {
                    Some(frame) => frame.clauses.push(Value::Map(predicate)),
                    None => {
                        top_level_predicates += 1;
                        merge_maps(&mut self.content, predicate);
                    }
                },
                ConditionToken::Close => {
                    let frame = stack
                        .pop()
                        .ok_or_else(|| unbalanced("close without an open block"))?;
                    let block = frame.into_block();
                    match stack.last_mut() {
                        Some(parent) => parent.clauses.push(Value::Map(block)),
                        None => {
                            top_level_blocks += 1;
                            if let Some(op) = repeated_operator(&self.content, &block) {
                                return Err(unbalanced(&format!(
                                    "{} appears twice at the top level, nest both blocks in one",
                                    op
                                )));
                            }
                            merge_maps(&mut self.content, block);
                        }
                    }
                }
            }
        }

        if !stack.is_empty() {
            return Err(unbalanced(&format!(
                "{} block(s) left open",
                stack.len()
            )));
        }
        if top_level_predicates > 0 && top_level_predicates + top_level_blocks > 1 {
            return Err(unbalanced(
                "a predicate outside any block must be the only top-level item",
            ));
        }

        self.built = true;
        log::debug!(
            "Compiled condition with {} top-level operator(s)",
            self.content.len()
        );
        Ok(self)
    }

    /// Whether [`Condition::build`] has run.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Whether the compiled condition is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Tokens queued since the last build.
    pub fn tokens(&self) -> impl Iterator<Item = &ConditionToken> {
        self.tokens.iter()
    }

    /// The compiled condition; empty until built.
    pub fn as_map(&self) -> &Map {
        &self.content
    }

    /// Encodes the compiled condition into OJAI wire JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::NotBuilt`] before [`Condition::build`].
    pub fn to_wire(&self) -> OjaiResult<JsonValue> {
        if !self.built {
            log::error!("Condition must be built before it is serialized");
            return Err(OjaiError::NotBuilt(
                "condition must be built before it is serialized".to_string(),
            ));
        }
        Ok(JsonValue::Object(codec::encode_map(&self.content)?))
    }

    /// Encodes the compiled condition into OJAI wire JSON text.
    pub fn to_json_string(&self) -> OjaiResult<String> {
        Ok(serde_json::to_string(&self.to_wire()?)?)
    }

    fn push(mut self, token: ConditionToken) -> Self {
        self.tokens.push_back(token);
        self
    }

    fn predicate(self, op: &str, body: Value) -> Self {
        let mut predicate = Map::with_capacity(1);
        predicate.insert(op.to_string(), body);
        self.push(ConditionToken::Predicate(predicate))
    }

    fn field_predicate(self, op: &str, path: &str, value: Value) -> Self {
        let mut body = Map::with_capacity(1);
        body.insert(path.to_string(), value);
        self.predicate(op, Value::Map(body))
    }
}

/// The operator of `block` that would collide with a block already in `content`.
///
/// Element-and blocks over different fields sit side by side and don't collide.
fn repeated_operator(content: &Map, block: &Map) -> Option<String> {
    block.iter().find_map(|(op, body)| match (content.get(op), body) {
        (None, _) => None,
        (Some(Value::Map(existing)), Value::Map(fields))
            if !fields.keys().any(|field| existing.contains_key(field)) =>
        {
            None
        }
        _ => Some(op.clone()),
    })
}

fn unbalanced(reason: &str) -> OjaiError {
    log::error!("Unbalanced condition: {}", reason);
    OjaiError::UnbalancedCondition(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(json: JsonValue) -> Map {
        Value::try_from(json).unwrap().into_map().unwrap()
    }

    #[test]
    fn test_single_block() {
        let condition = Condition::new()
            .and()
            .in_list("p", vec!["1", "2", "3"])
            .equals("p2", 55)
            .close()
            .build()
            .unwrap();
        assert!(condition.is_built());
        assert_eq!(
            condition.as_map(),
            &map(json!({"$and": [{"$in": {"p": ["1", "2", "3"]}}, {"$eq": {"p2": 55}}]}))
        );
    }

    #[test]
    fn test_nested_blocks_keep_call_order() {
        let condition = Condition::new()
            .and()
            .or()
            .exists("a")
            .is("b", Comparison::Less, 3)
            .close()
            .or()
            .not_exists("c")
            .like("d", "x%")
            .close()
            .close()
            .build()
            .unwrap();
        assert_eq!(
            condition.as_map(),
            &map(json!({"$and": [
                {"$or": [{"$exists": "a"}, {"$lt": {"b": 3}}]},
                {"$or": [{"$notexists": "c"}, {"$like": {"d": "x%"}}]},
            ]}))
        );
    }

    #[test]
    fn test_element_and() {
        let condition = Condition::new()
            .element_and("items")
            .unwrap()
            .is("qty", Comparison::GreaterOrEqual, 2)
            .not_equals("sku", "x")
            .close()
            .build()
            .unwrap();
        assert_eq!(
            condition.as_map(),
            &map(json!({"$elementAnd": {"items": [{"$ge": {"qty": 2}}, {"$ne": {"sku": "x"}}]}}))
        );
        assert!(matches!(
            Condition::new().element_and(""),
            Err(OjaiError::MalformedPath(_))
        ));
    }

    #[test]
    fn test_every_predicate_operator() {
        let condition = Condition::new()
            .or()
            .not_in_list("a", vec![1])
            .type_of("b", "string")
            .not_type_of("c", "int")
            .matches("d", "^x")
            .not_matches("e", "y$")
            .not_like("f", "%z")
            .is("g", Comparison::LessOrEqual, 1)
            .is("h", Comparison::Greater, 2)
            .close()
            .build()
            .unwrap();
        let ops: Vec<String> = condition.as_map()["$or"]
            .as_list()
            .unwrap()
            .iter()
            .map(|clause| clause.as_map().unwrap().keys().next().unwrap().clone())
            .collect();
        assert_eq!(
            ops,
            ["$notin", "$typeof", "$nottypeof", "$matches", "$notmatches", "$notlike", "$le", "$gt"]
        );
    }

    #[test]
    fn test_unbalanced() {
        let open = Condition::new().and().exists("a").build();
        assert!(matches!(open, Err(OjaiError::UnbalancedCondition(_))));

        let extra_close = Condition::new().and().exists("a").close().close().build();
        assert!(matches!(extra_close, Err(OjaiError::UnbalancedCondition(_))));
    }

    #[test]
    fn test_bare_predicate_rules() {
        let sole = Condition::new().equals("a", 1).build().unwrap();
        assert_eq!(sole.as_map(), &map(json!({"$eq": {"a": 1}})));

        let mixed = Condition::new()
            .equals("a", 1)
            .and()
            .exists("b")
            .close()
            .build();
        assert!(matches!(mixed, Err(OjaiError::UnbalancedCondition(_))));

        let two = Condition::new().exists("a").exists("b").build();
        assert!(matches!(two, Err(OjaiError::UnbalancedCondition(_))));
    }

    #[test]
    fn test_top_level_blocks_merge() {
        let condition = Condition::new()
            .and()
            .exists("a")
            .close()
            .or()
            .exists("b")
            .close()
            .build()
            .unwrap();
        assert_eq!(
            condition.as_map(),
            &map(json!({"$and": [{"$exists": "a"}], "$or": [{"$exists": "b"}]}))
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let condition = Condition::new().and().exists("a").close().build().unwrap();
        let first = condition.as_map().clone();
        let rebuilt = condition.build().unwrap();
        assert!(rebuilt.is_built());
        assert_eq!(rebuilt.as_map(), &first);
        assert_eq!(rebuilt.tokens().count(), 0);
    }

    #[test]
    fn test_repeated_top_level_operator_is_rejected() {
        let result = Condition::new()
            .and()
            .equals("a", 1)
            .close()
            .and()
            .equals("b", 2)
            .close()
            .build();
        assert!(matches!(result, Err(OjaiError::UnbalancedCondition(_))));

        let nested = Condition::new()
            .and()
            .and()
            .equals("a", 1)
            .close()
            .and()
            .equals("b", 2)
            .close()
            .close()
            .build()
            .unwrap();
        assert_eq!(
            nested.as_map(),
            &map(json!({"$and": [{"$and": [{"$eq": {"a": 1}}]}, {"$and": [{"$eq": {"b": 2}}]}]}))
        );
    }

    #[test]
    fn test_element_and_blocks_over_distinct_fields() {
        let condition = Condition::new()
            .element_and("x")
            .unwrap()
            .exists("x.a")
            .close()
            .element_and("y")
            .unwrap()
            .exists("y.b")
            .close()
            .build()
            .unwrap();
        assert_eq!(
            condition.as_map(),
            &map(json!({"$elementAnd": {"x": [{"$exists": "x.a"}], "y": [{"$exists": "y.b"}]}}))
        );
    }

    #[test]
    fn test_calls_after_build_are_rejected() {
        let built = Condition::new().and().exists("a").close().build().unwrap();
        let result = built.or().exists("b").close().build();
        assert!(matches!(result, Err(OjaiError::AlreadyBuilt(_))));

        let sole = Condition::new().equals("a", 1).build().unwrap();
        assert!(matches!(
            sole.equals("b", 2).build(),
            Err(OjaiError::AlreadyBuilt(_))
        ));
    }

    #[test]
    fn test_add_condition() {
        let unbuilt = Condition::new().exists("x");
        assert!(matches!(
            Condition::new().add_condition(&unbuilt),
            Err(OjaiError::NotBuilt(_))
        ));

        let inner = Condition::new().or().exists("x").exists("y").close().build().unwrap();
        let outer = Condition::new()
            .and()
            .add_condition(&inner)
            .unwrap()
            .add_condition_map(map(json!({"$eq": {"z": true}})))
            .close()
            .build()
            .unwrap();
        assert_eq!(
            outer.as_map(),
            &map(json!({"$and": [
                {"$or": [{"$exists": "x"}, {"$exists": "y"}]},
                {"$eq": {"z": true}},
            ]}))
        );
    }

    #[test]
    fn test_wire_requires_build() {
        let pending = Condition::new().equals("a", 1);
        assert!(matches!(pending.to_wire(), Err(OjaiError::NotBuilt(_))));
        assert_eq!(pending.tokens().count(), 1);

        let built = pending.build().unwrap();
        assert_eq!(
            built.to_json_string().unwrap(),
            r#"{"$eq":{"a":{"$numberLong":1}}}"#
        );
    }
}
