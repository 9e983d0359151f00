//! Safety Invariant Tests
//!
//! - Forbidden filter keys are found at any depth
//! - `$out` and `$merge` stages are never accepted
//! - Forbidden operators inside stages and update documents are rejected
//! - Scans are bounded by depth and node count

use docpilot::plan::{normalize, Plan};
use docpilot::safety::{check, SafetyValidator, SafetyViolationCode, ScanLimits};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn plan(candidate: Value) -> Plan {
    normalize(&candidate).unwrap()
}

fn violation(candidate: Value) -> SafetyViolationCode {
    check(&plan(candidate)).unwrap_err().code()
}

// =============================================================================
// Filter Tests
// =============================================================================

#[test]
fn test_where_rejected_at_any_depth() {
    let nested = json!({
        "action": "find",
        "collection": "users",
        "filter": {"$or": [{"age": 1}, {"$and": [{"$where": "this.a > 1"}]}]}
    });
    assert_eq!(violation(nested), SafetyViolationCode::ForbiddenFilterKey);

    let on_delete = json!({"action": "delete", "collection": "users", "filter": {"$where": "1"}});
    assert_eq!(violation(on_delete), SafetyViolationCode::ForbiddenFilterKey);
}

#[test]
fn test_plain_filters_pass() {
    let ok = plan(json!({
        "action": "find",
        "collection": "users",
        "filter": {"age": {"$gt": 21}, "tags": {"$in": ["a", "b"]}, "note": "$where is text"}
    }));
    assert!(check(&ok).is_ok());
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[test]
fn test_output_stages_rejected() {
    for stage in ["$out", "$merge"] {
        let candidate = json!({
            "action": "aggregate",
            "collection": "orders",
            "pipeline": [{"$match": {}}, {stage: "copy"}]
        });
        assert_eq!(violation(candidate), SafetyViolationCode::ForbiddenStage);
    }
}

#[test]
fn test_forbidden_operator_inside_stage() {
    let candidate = json!({
        "action": "aggregate",
        "collection": "orders",
        "pipeline": [{"$group": {"_id": null, "x": {"$accumulator": {}}}}]
    });
    assert_eq!(violation(candidate), SafetyViolationCode::ForbiddenOperator);
}

/// Empty stages never get past normalization.
#[test]
fn test_empty_stage_rejected() {
    let candidate = json!({"action": "aggregate", "collection": "orders", "pipeline": [{}]});
    assert!(normalize(&candidate).is_err());
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_function_in_update_rejected() {
    let candidate = json!({
        "action": "update",
        "collection": "users",
        "filter": {},
        "update": {"$set": {"score": {"$function": {"body": "x", "args": [], "lang": "js"}}}}
    });
    assert_eq!(violation(candidate), SafetyViolationCode::ForbiddenOperator);
}

// =============================================================================
// Bound Tests
// =============================================================================

#[test]
fn test_scan_depth_is_bounded() {
    let mut filter = json!({"leaf": 1});
    for _ in 0..10 {
        filter = json!({"$and": [filter]});
    }
    let candidate = plan(json!({"action": "count", "collection": "users", "filter": filter}));

    let tight = SafetyValidator::with_limits(ScanLimits {
        max_depth: 4,
        max_nodes: 10_000,
    });
    assert_eq!(
        tight.check(&candidate).unwrap_err().code(),
        SafetyViolationCode::TooDeep
    );
    assert!(SafetyValidator::new().check(&candidate).is_ok());
}

#[test]
fn test_scan_size_is_bounded() {
    let values: Vec<Value> = (0..500).map(Value::from).collect();
    let candidate = plan(json!({
        "action": "find",
        "collection": "users",
        "filter": {"id": {"$in": values}}
    }));

    let tight = SafetyValidator::with_limits(ScanLimits {
        max_depth: 64,
        max_nodes: 100,
    });
    assert_eq!(
        tight.check(&candidate).unwrap_err().code(),
        SafetyViolationCode::TooLarge
    );
}
