use futures::executor::block_on;
use futures::stream;
use ojai::chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use ojai::codec;
use ojai::prelude::*;
use serde_json::json;

fn to_value(json: serde_json::Value) -> Value {
    Value::try_from(json).unwrap()
}

fn to_map(json: serde_json::Value) -> Map {
    to_value(json).into_map().unwrap()
}

#[test]
fn test_path_parse_is_idempotent() {
    for input in ["a.b.c", "a[0].b", "'x.y'.z", "list[3][4]", "  a . b ", "a..b.", "\"q\"[2]"] {
        let parsed = FieldPath::parse(input).unwrap();
        let reparsed = FieldPath::parse(&parsed.to_string()).unwrap();
        assert_eq!(parsed, reparsed, "re-parsing {:?}", input);
    }

    assert_eq!(FieldPath::parse("a.b[1].c").unwrap().len(), 4);
    assert!(FieldPath::parse("").unwrap().is_empty());
    assert!(matches!(FieldPath::parse("a[x]"), Err(OjaiError::MalformedPath(_))));
}

#[test]
fn test_tagged_kinds_round_trip() {
    let values = vec![
        Value::Int(-42),
        Value::Float(2.5),
        Value::binary(vec![0u8, 1, 2, 250]),
        Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
        Value::Time(NaiveTime::from_hms_milli_opt(23, 59, 1, 250).unwrap()),
        Value::Timestamp(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap()),
    ];
    for value in values {
        let wire = codec::encode(&value).unwrap();
        assert_eq!(codec::decode(&wire).unwrap(), value);
        assert_eq!(codec::encode(&codec::decode(&wire).unwrap()).unwrap(), wire);
    }
}

#[test]
fn test_document_wire_round_trip() {
    let mut document = Document::new();
    document
        .set_id_string("user0001")
        .unwrap()
        .set("name.first", "Ada")
        .unwrap()
        .set("scores[1]", 9.5)
        .unwrap()
        .set("born", NaiveDate::from_ymd_opt(1815, 12, 10).unwrap())
        .unwrap();

    assert_eq!(
        document.to_wire().unwrap(),
        json!({
            "_id": "user0001",
            "name": {"first": "Ada"},
            "scores": [null, {"$numberFloat": 9.5}],
            "born": {"$dateDay": "1815-12-10"}
        })
    );

    let parsed = Document::from_json(&document.to_payload().unwrap()).unwrap();
    assert_eq!(parsed, document);
}

#[test]
fn test_document_delete_and_null_reads() {
    let mut document = Document::from_map(to_map(json!({"a": {"b": [1, 2, 3]}, "c": null})));
    document.delete("a.b[0]").unwrap().delete("missing.path").unwrap();

    assert_eq!(document.get("a.b").unwrap(), to_value(json!([2, 3])));
    assert!(document.is_null("c").unwrap());
    assert!(document.contains_path("c").unwrap());
    assert!(document.is_null("nope").unwrap());
    assert!(!document.contains_path("nope").unwrap());
}

#[test]
fn test_mutation_bucket_promotion() {
    let mutation = DocumentMutation::new()
        .set("a", 12)
        .unwrap()
        .set("b", 55)
        .unwrap()
        .set("a", 33)
        .unwrap();
    assert_eq!(mutation.as_map(), &to_map(json!({"$set": [{"a": 33}, {"b": 55}]})));

    let single = DocumentMutation::new().set("a", 1).unwrap().set("a", 2).unwrap();
    assert_eq!(single.as_map(), &to_map(json!({"$set": {"a": 2}})));
}

#[test]
fn test_mutation_increments() {
    let mutation = DocumentMutation::new()
        .increment_int("inc1", 2)
        .unwrap()
        .increment_int_by_one("inc2")
        .unwrap()
        .increment_float("inc3", 25.0)
        .unwrap();

    assert_eq!(
        mutation.to_wire().unwrap(),
        json!({"$increment": [
            {"inc1": {"$numberLong": 2}},
            {"inc2": {"$numberLong": 1}},
            {"inc3": {"$numberFloat": 25.0}}
        ]})
    );
    assert!(matches!(
        DocumentMutation::new().increment_int("p", 0),
        Err(OjaiError::InvalidMagnitude(_))
    ));
    assert!(matches!(
        DocumentMutation::new().set("_id", "x"),
        Err(OjaiError::MalformedPath(_))
    ));
}

#[test]
fn test_mutation_deletes_are_deduplicated() {
    let mutation = DocumentMutation::new()
        .delete("a")
        .unwrap()
        .delete("b")
        .unwrap()
        .delete("a")
        .unwrap();
    assert_eq!(mutation.as_map(), &to_map(json!({"$delete": ["a", "b"]})));
}

#[test]
fn test_condition_and_block() {
    let condition = Condition::new()
        .and()
        .in_list("p", vec!["1", "2", "3"])
        .equals("p2", 55)
        .close()
        .build()
        .unwrap();

    assert_eq!(
        condition.as_map(),
        &to_map(json!({"$and": [{"$in": {"p": ["1", "2", "3"]}}, {"$eq": {"p2": 55}}]}))
    );
}

#[test]
fn test_condition_nested_blocks_keep_call_order() {
    let condition = Condition::new()
        .and()
        .or()
        .equals("a", 1)
        .equals("b", 2)
        .close()
        .or()
        .exists("c")
        .not_exists("d")
        .close()
        .close()
        .build()
        .unwrap();

    assert_eq!(
        condition.as_map(),
        &to_map(json!({"$and": [
            {"$or": [{"$eq": {"a": 1}}, {"$eq": {"b": 2}}]},
            {"$or": [{"$exists": "c"}, {"$notexists": "d"}]}
        ]}))
    );
}

#[test]
fn test_condition_unbalanced() {
    let unclosed = Condition::new().and().equals("a", 1).build();
    assert!(matches!(unclosed, Err(OjaiError::UnbalancedCondition(_))));

    let extra_close = Condition::new().and().equals("a", 1).close().close().build();
    assert!(matches!(extra_close, Err(OjaiError::UnbalancedCondition(_))));
}

#[test]
fn test_query_clauses() {
    assert!(matches!(Query::new().offset(-1), Err(OjaiError::InvalidRange(_))));
    assert!(matches!(Query::new().limit(-1), Err(OjaiError::InvalidRange(_))));

    let empty: [&str; 0] = [];
    let query = Query::new().select(&empty).build();
    assert_eq!(query.as_map(), Some(&Map::new()));

    let appended = Query::new()
        .order_by(SortOrder::Asc, &["x"])
        .order_by(SortOrder::Desc, &["x"])
        .build();
    assert_eq!(
        appended.as_map(),
        Some(&to_map(json!({"$orderby": [{"x": "asc"}, {"x": "desc"}]})))
    );

    let cleaned = Query::new()
        .order_by(SortOrder::Asc, &["x"])
        .clean_order_by()
        .order_by(SortOrder::Desc, &["x"])
        .build();
    assert_eq!(
        cleaned.as_map(),
        Some(&to_map(json!({"$orderby": [{"x": "desc"}]})))
    );
}

#[test]
fn test_query_payload() {
    let condition = Condition::new()
        .and()
        .is("age", Comparison::GreaterOrEqual, 21)
        .like("name", "A%")
        .close()
        .build()
        .unwrap();

    let query = Query::new()
        .select(&["name", "age"])
        .where_condition(&condition)
        .unwrap()
        .page(&PaginationParams::new(3, 20))
        .unwrap()
        .build();

    assert_eq!(
        query.to_wire().unwrap(),
        json!({
            "$select": ["name", "age"],
            "$where": {"$and": [
                {"$ge": {"age": {"$numberLong": 21}}},
                {"$like": {"name": "A%"}}
            ]},
            "$offset": 40,
            "$limit": 20
        })
    );
}

#[test]
fn test_decoding_find_results() {
    let responses = vec![
        Ok(r#"{"plan":"scan"}"#.to_string()),
        Ok(r#"{"_id":"a","n":{"$numberLong":1}}"#.to_string()),
        Ok(r#"{"_id":"b","n":{"$numberLong":2}}"#.to_string()),
    ];
    let options = FindOptions::builder().with_include_query_plan(true).build();
    let result = block_on(QueryResult::from_stream(stream::iter(responses), &options)).unwrap();

    assert_eq!(result.query_plan(), Some(r#"{"plan":"scan"}"#));
    let totals: i64 = result
        .documents()
        .map(|d| d.get_i64("n").unwrap().unwrap_or(0))
        .sum();
    assert_eq!(totals, 3);
}
