//! Plan Invariant Tests
//!
//! - Normalization is idempotent over the wire form
//! - Defaults are filled once and never partially applied
//! - Only the six known actions are accepted
//! - The extractor finds the first object even around prose and braces in strings

use docpilot::plan::{
    candidate_text, extract_first_json_object, normalize, Action, Plan, SchemaErrorCode,
    DEFAULT_DELETE_LIMIT, DEFAULT_FIND_LIMIT, MAX_PIPELINE_STAGES, MAX_RESULT_LIMIT,
};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_candidates() -> Vec<Value> {
    vec![
        json!({"action": "find", "collection": "users", "filter": {"age": {"$gte": 21}},
               "projection": {"email": 1}, "sort": {"age": -1, "name": 1}, "limit": 5, "skip": 2}),
        json!({"action": "count", "collection": "users"}),
        json!({"action": "distinct", "collection": "orders", "field": "status"}),
        json!({"action": "aggregate", "collection": "orders",
               "pipeline": [{"$match": {"paid": true}}, {"$group": {"_id": "$user", "n": {"$sum": 1}}}]}),
        json!({"action": "update", "collection": "users", "filter": {"trial": true},
               "update": {"$set": {"trial": false}}, "multi": true}),
        json!({"action": "delete", "collection": "sessions", "filter": {"expired": true}, "limit": 10}),
    ]
}

// =============================================================================
// Idempotency Tests
// =============================================================================

/// normalize(serialize(normalize(x))) == normalize(x) for every action.
#[test]
fn test_normalize_is_idempotent() {
    for candidate in sample_candidates() {
        let once = normalize(&candidate).unwrap();
        let twice = normalize(&once.to_value()).unwrap();
        assert_eq!(once, twice, "candidate: {}", candidate);
    }
}

/// A plan deserialized from its wire form goes back through normalize.
#[test]
fn test_deserialize_revalidates() {
    let plan: Plan = serde_json::from_value(json!({"action": "find", "collection": "users"})).unwrap();
    assert_eq!(plan.to_value()["limit"], DEFAULT_FIND_LIMIT);

    let rejected: Result<Plan, _> =
        serde_json::from_value(json!({"action": "drop", "collection": "users"}));
    assert!(rejected.is_err());
}

// =============================================================================
// Default Tests
// =============================================================================

#[test]
fn test_defaults_are_filled() {
    let find = normalize(&json!({"action": "find", "collection": "users"})).unwrap();
    let wire = find.to_value();
    assert_eq!(wire["filter"], json!({}));
    assert_eq!(wire["limit"], DEFAULT_FIND_LIMIT);
    assert_eq!(wire["skip"], 0);

    let delete = normalize(&json!({"action": "delete", "collection": "users"})).unwrap();
    assert_eq!(delete.to_value()["limit"], DEFAULT_DELETE_LIMIT);

    let update = normalize(&json!({
        "action": "update", "collection": "users", "update": {"$set": {"a": 1}}
    }))
    .unwrap();
    assert_eq!(update.to_value()["upsert"], false);
    assert_eq!(update.to_value()["multi"], false);

    let aggregate =
        normalize(&json!({"action": "aggregate", "collection": "users", "pipeline": [{"$count": "n"}]}))
            .unwrap();
    assert_eq!(aggregate.to_value()["allowDiskUse"], false);
}

#[test]
fn test_unknown_fields_are_dropped() {
    let plan = normalize(&json!({"action": "count", "collection": "users", "hint": "x"})).unwrap();
    assert!(plan.to_value().get("hint").is_none());
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_only_known_actions() {
    for action in Action::ALL {
        assert_eq!(Action::parse(action.as_str()), Some(action));
    }
    let err = normalize(&json!({"action": "drop", "collection": "users"})).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::UnknownAction);
}

#[test]
fn test_rejections_by_code() {
    let cases = [
        (json!([1, 2]), SchemaErrorCode::NotAnObject),
        (json!({"collection": "users"}), SchemaErrorCode::MissingField),
        (json!({"action": "find"}), SchemaErrorCode::MissingField),
        (json!({"action": "find", "collection": ""}), SchemaErrorCode::OutOfRange),
        (json!({"action": "find", "collection": "u", "filter": []}), SchemaErrorCode::TypeMismatch),
        (json!({"action": "find", "collection": "u", "limit": 2.5}), SchemaErrorCode::TypeMismatch),
        (
            json!({"action": "find", "collection": "u", "limit": MAX_RESULT_LIMIT + 1}),
            SchemaErrorCode::OutOfRange,
        ),
        (json!({"action": "delete", "collection": "u", "limit": 0}), SchemaErrorCode::OutOfRange),
        (json!({"action": "find", "collection": "u", "sort": {"a": 2}}), SchemaErrorCode::InvalidValue),
        (json!({"action": "update", "collection": "u"}), SchemaErrorCode::MissingField),
        (json!({"action": "distinct", "collection": "u"}), SchemaErrorCode::MissingField),
        (json!({"action": "aggregate", "collection": "u", "pipeline": []}), SchemaErrorCode::OutOfRange),
        (json!({"action": "aggregate", "collection": "u", "pipeline": [{}]}), SchemaErrorCode::OutOfRange),
    ];

    for (candidate, code) in cases {
        let err = normalize(&candidate).unwrap_err();
        assert_eq!(err.code(), code, "candidate: {}", candidate);
    }
}

#[test]
fn test_bad_collection_fails_for_every_action() {
    for action in ["find", "count", "distinct", "aggregate", "update", "delete"] {
        for collection in [json!(""), json!(5), json!(null), json!(["users"])] {
            let candidate = json!({"action": action, "collection": collection});
            assert!(normalize(&candidate).is_err(), "candidate: {}", candidate);
        }
    }
}

#[test]
fn test_pipeline_stage_bound() {
    let stages: Vec<Value> = (0..=MAX_PIPELINE_STAGES)
        .map(|i| json!({"$skip": i}))
        .collect();
    let candidate = json!({"action": "aggregate", "collection": "u", "pipeline": stages});
    assert!(normalize(&candidate).is_err());
}

// =============================================================================
// Extraction Tests
// =============================================================================

#[test]
fn test_extracts_object_from_prose() {
    let text = "Sure! Here is the plan:\n```json\n{\"action\": \"count\", \"collection\": \"users\"}\n```";
    let object = extract_first_json_object(text).unwrap();
    let plan = normalize(&serde_json::from_str(object).unwrap()).unwrap();
    assert_eq!(plan.action(), Action::Count);
}

#[test]
fn test_braces_inside_strings_do_not_break_extraction() {
    let text = r#"plan: {"action": "find", "collection": "notes", "filter": {"body": "use {x} and \"}\""}} trailing"#;
    let object = extract_first_json_object(text).unwrap();
    let value: Value = serde_json::from_str(object).unwrap();
    assert_eq!(value["filter"]["body"], "use {x} and \"}\"");
}

#[test]
fn test_candidate_text_falls_back_to_trimmed_input() {
    assert_eq!(candidate_text("  no object here  "), "no object here");
}
