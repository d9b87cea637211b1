//! Query assembly: projection, filtering, ordering and paging.
//!
//! A [`Query`] accumulates one map from the contributions of its clause calls:
//!
//! | Call | Key | Shape |
//! |------|-----|-------|
//! | [`Query::select`] | `$select` | `["a", "b.c"]` |
//! | [`Query::where_condition`], [`Query::where_map`] | `$where` | condition map |
//! | [`Query::order_by`] | `$orderby` | `[{"a": "asc"}, {"b": "desc"}]` |
//! | [`Query::offset`] | `$offset` | integer |
//! | [`Query::limit`] | `$limit` | integer |
//!
//! ```ignore
//! let query = Query::new()
//!     .select(&["name", "address.city"])
//!     .where_condition(&condition)?
//!     .order_by(SortOrder::Desc, &["created"])
//!     .limit(20)?
//!     .build();
//! let payload = query.to_json_string()?;
//! ```

use std::fmt::{self, Display, Formatter};

use serde_json::Value as JsonValue;

use crate::codec;
use crate::condition::Condition;
use crate::error::{OjaiError, OjaiResult};
use crate::merge::merge_maps;
use crate::page::PaginationParams;
use crate::value::{Map, Value};

/// Top-level clause keys of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryClause {
    Select,
    Where,
    OrderBy,
    Offset,
    Limit,
}

impl QueryClause {
    /// The wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryClause::Select => "$select",
            QueryClause::Where => "$where",
            QueryClause::OrderBy => "$orderby",
            QueryClause::Offset => "$offset",
            QueryClause::Limit => "$limit",
        }
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortOrder {
    /// The wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A find request under construction.
///
/// Clause calls consume and return the query. Once [`Query::build`] has been called the
/// map can be read and serialized; clause calls after that keep modifying it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    content: Map,
    built: bool,
}

impl Query {
    /// Creates an empty, unbuilt query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds field paths to the projection. Without one, whole documents are returned.
    pub fn select<S: AsRef<str>>(self, fields: &[S]) -> Self {
        if fields.is_empty() {
            return self;
        }
        let fields = fields
            .iter()
            .map(|f| Value::from(f.as_ref()))
            .collect::<Vec<_>>();
        self.merge(QueryClause::Select, Value::List(fields))
    }

    /// Sets the filtering condition from a built [`Condition`].
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::NotBuilt`] if the condition hasn't been built and
    /// [`OjaiError::EmptyCondition`] if it is empty.
    pub fn where_condition(self, condition: &Condition) -> OjaiResult<Self> {
        if !condition.is_built() {
            log::error!("Query condition must be built before use");
            return Err(OjaiError::NotBuilt(
                "build the condition before adding it to a query".to_string(),
            ));
        }
        self.where_map(condition.as_map().clone())
    }

    /// Sets the filtering condition from a raw condition map.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::EmptyCondition`] if `condition` is empty.
    pub fn where_map(self, condition: Map) -> OjaiResult<Self> {
        if condition.is_empty() {
            log::error!("Query condition can't be empty");
            return Err(OjaiError::EmptyCondition(
                "condition can't be empty".to_string(),
            ));
        }
        Ok(self.merge(QueryClause::Where, Value::Map(condition)))
    }

    /// Appends sort keys in the given direction, after any added earlier.
    pub fn order_by<S: AsRef<str>>(mut self, order: SortOrder, fields: &[S]) -> Self {
        if fields.is_empty() {
            return self;
        }
        let entries = fields.iter().map(|field| {
            let mut entry = Map::with_capacity(1);
            entry.insert(field.as_ref().to_string(), Value::from(order.as_str()));
            Value::Map(entry)
        });

        let key = QueryClause::OrderBy.as_str();
        match self.content.get_mut(key) {
            Some(Value::List(existing)) => existing.extend(entries),
            _ => {
                self.content
                    .insert(key.to_string(), Value::List(entries.collect()));
            }
        }
        self
    }

    /// Skips `offset` documents. A later call overwrites the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::InvalidRange`] if `offset` is negative.
    pub fn offset(self, offset: i64) -> OjaiResult<Self> {
        let offset = non_negative(QueryClause::Offset, offset)?;
        Ok(self.merge(QueryClause::Offset, offset))
    }

    /// Returns at most `limit` documents. A later call overwrites the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::InvalidRange`] if `limit` is negative.
    pub fn limit(self, limit: i64) -> OjaiResult<Self> {
        let limit = non_negative(QueryClause::Limit, limit)?;
        Ok(self.merge(QueryClause::Limit, limit))
    }

    /// Sets `$offset` and `$limit` from pagination parameters.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::InvalidRange`] for page `0` or values beyond `i64`.
    pub fn page(self, params: &PaginationParams) -> OjaiResult<Self> {
        params.validate()?;
        let offset = to_i64(QueryClause::Offset, params.offset())?;
        let limit = to_i64(QueryClause::Limit, params.per_page)?;
        self.offset(offset)?.limit(limit)
    }

    /// Removes the projection.
    pub fn clean_select(self) -> Self {
        self.clean(QueryClause::Select)
    }

    /// Removes every sort key.
    pub fn clean_order_by(self) -> Self {
        self.clean(QueryClause::OrderBy)
    }

    /// Removes the offset.
    pub fn clean_offset(self) -> Self {
        self.clean(QueryClause::Offset)
    }

    /// Removes the limit.
    pub fn clean_limit(self) -> Self {
        self.clean(QueryClause::Limit)
    }

    /// Removes every clause.
    pub fn clean_query(mut self) -> Self {
        self.content.clear();
        self
    }

    /// Marks the query as ready to send.
    pub fn build(mut self) -> Self {
        self.built = true;
        log::debug!("Built query with {} clause(s)", self.content.len());
        self
    }

    /// Whether [`Query::build`] has run.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// The assembled query, or `None` until built.
    pub fn as_map(&self) -> Option<&Map> {
        self.built.then_some(&self.content)
    }

    /// Encodes the query into OJAI wire JSON.
    ///
    /// Only the `$where` condition carries type tags; projection, ordering and paging
    /// clauses are plain JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::NotBuilt`] before [`Query::build`].
    pub fn to_wire(&self) -> OjaiResult<JsonValue> {
        let content = self.as_map().ok_or_else(|| {
            log::error!("Query must be built before it is serialized");
            OjaiError::NotBuilt("query must be built before it is serialized".to_string())
        })?;
        let where_key = QueryClause::Where.as_str();
        content
            .iter()
            .map(|(key, value)| -> OjaiResult<(String, JsonValue)> {
                let encoded = if key == where_key {
                    codec::encode(value)?
                } else {
                    codec::encode_plain(value)?
                };
                Ok((key.clone(), encoded))
            })
            .collect::<OjaiResult<_>>()
            .map(JsonValue::Object)
    }

    /// Encodes the query into OJAI wire JSON text.
    pub fn to_json_string(&self) -> OjaiResult<String> {
        Ok(serde_json::to_string(&self.to_wire()?)?)
    }

    fn merge(mut self, clause: QueryClause, value: Value) -> Self {
        let mut contribution = Map::with_capacity(1);
        contribution.insert(clause.as_str().to_string(), value);
        merge_maps(&mut self.content, contribution);
        self
    }

    fn clean(mut self, clause: QueryClause) -> Self {
        self.content.shift_remove(clause.as_str());
        self
    }
}

fn non_negative(clause: QueryClause, value: i64) -> OjaiResult<Value> {
    if value < 0 {
        log::error!("{} can't be negative, got {}", clause.as_str(), value);
        return Err(OjaiError::InvalidRange(format!(
            "{} can't be negative, got {}",
            clause.as_str(),
            value
        )));
    }
    Ok(Value::Int(value))
}

fn to_i64(clause: QueryClause, value: usize) -> OjaiResult<i64> {
    i64::try_from(value).map_err(|_| {
        log::error!("{} of {} is out of range", clause.as_str(), value);
        OjaiError::InvalidRange(format!("{} of {} is out of range", clause.as_str(), value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(json: JsonValue) -> Map {
        Value::try_from(json).unwrap().into_map().unwrap()
    }

    #[test]
    fn test_full_query() {
        let condition = Condition::new()
            .and()
            .is("age", crate::condition::Comparison::Greater, 18)
            .close()
            .build()
            .unwrap();
        let query = Query::new()
            .select(&["name", "age"])
            .where_condition(&condition)
            .unwrap()
            .order_by(SortOrder::Desc, &["age"])
            .offset(5)
            .unwrap()
            .limit(10)
            .unwrap()
            .build();
        assert_eq!(
            query.as_map().unwrap(),
            &map(json!({
                "$select": ["name", "age"],
                "$where": {"$and": [{"$gt": {"age": 18}}]},
                "$orderby": [{"age": "desc"}],
                "$offset": 5,
                "$limit": 10,
            }))
        );
    }

    #[test]
    fn test_select_merges_and_ignores_empty() {
        let empty: [&str; 0] = [];
        let query = Query::new()
            .select(&empty)
            .select(&["a", "b"])
            .select(&["b".to_string(), "c".to_string()])
            .build();
        assert_eq!(query.as_map().unwrap(), &map(json!({"$select": ["a", "b", "c"]})));
        assert_eq!(Query::new().select(&empty).build().as_map().unwrap().len(), 0);
    }

    #[test]
    fn test_negative_offset_and_limit() {
        assert!(matches!(Query::new().offset(-1), Err(OjaiError::InvalidRange(_))));
        assert!(matches!(Query::new().limit(-1), Err(OjaiError::InvalidRange(_))));
    }

    #[test]
    fn test_offset_and_limit_overwrite() {
        let query = Query::new()
            .limit(3)
            .unwrap()
            .limit(7)
            .unwrap()
            .offset(1)
            .unwrap()
            .offset(0)
            .unwrap()
            .build();
        assert_eq!(query.as_map().unwrap(), &map(json!({"$limit": 7, "$offset": 0})));
    }

    #[test]
    fn test_order_by_appends_and_clean() {
        let query = Query::new()
            .order_by(SortOrder::Asc, &["x"])
            .order_by(SortOrder::Desc, &["x", "y"])
            .build();
        assert_eq!(
            query.as_map().unwrap(),
            &map(json!({"$orderby": [{"x": "asc"}, {"x": "desc"}, {"y": "desc"}]}))
        );

        let query = Query::new()
            .order_by(SortOrder::Asc, &["x"])
            .clean_order_by()
            .order_by(SortOrder::Desc, &["x"])
            .build();
        assert_eq!(query.as_map().unwrap(), &map(json!({"$orderby": [{"x": "desc"}]})));
    }

    #[test]
    fn test_where_rejects_empty_and_unbuilt() {
        assert!(matches!(
            Query::new().where_map(Map::new()),
            Err(OjaiError::EmptyCondition(_))
        ));
        let unbuilt = Condition::new().exists("a");
        assert!(matches!(
            Query::new().where_condition(&unbuilt),
            Err(OjaiError::NotBuilt(_))
        ));
        let empty = Condition::new().build().unwrap();
        assert!(matches!(
            Query::new().where_condition(&empty),
            Err(OjaiError::EmptyCondition(_))
        ));
    }

    #[test]
    fn test_clean_operations() {
        let query = Query::new()
            .select(&["a"])
            .offset(1)
            .unwrap()
            .limit(2)
            .unwrap()
            .clean_select()
            .clean_offset()
            .build();
        assert_eq!(query.as_map().unwrap(), &map(json!({"$limit": 2})));
        let query = query.clean_limit().where_map(map(json!({"$exists": "a"}))).unwrap();
        assert_eq!(query.clean_query().as_map().unwrap().len(), 0);
    }

    #[test]
    fn test_page() {
        let query = Query::new()
            .page(&PaginationParams::new(3, 20))
            .unwrap()
            .build();
        assert_eq!(query.as_map().unwrap(), &map(json!({"$offset": 40, "$limit": 20})));
        assert!(matches!(
            Query::new().page(&PaginationParams::new(0, 20)),
            Err(OjaiError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_output_requires_build() {
        let query = Query::new().limit(1).unwrap();
        assert!(query.as_map().is_none());
        assert!(matches!(query.to_wire(), Err(OjaiError::NotBuilt(_))));

        let query = query
            .where_map(map(json!({"$eq": {"a": 2}})))
            .unwrap()
            .select(&["a"])
            .build();
        assert_eq!(
            query.to_json_string().unwrap(),
            r#"{"$limit":1,"$where":{"$eq":{"a":{"$numberLong":2}}},"$select":["a"]}"#
        );
    }
}
