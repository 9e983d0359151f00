//! Candidate plan normalization
//!
//! `normalize` is the single construction path for `Plan`. It dispatches on
//! `action`, checks every field of the matched variant against its type and
//! range, and fills defaults for omitted optional fields. Unknown extra
//! fields are dropped.
//!
//! Defaults:
//! - find: filter={}, limit=100, skip=0
//! - count, distinct, update, delete: filter={}
//! - aggregate: allowDiskUse=false
//! - update: upsert=false, multi=false
//! - delete: limit=1

use serde_json::{Map, Value};

use super::errors::{PlanResult, SchemaValidationError};
use super::model::{
    Action, AggregatePlan, CountPlan, DeletePlan, DistinctPlan, Document, FindPlan, Plan,
    UpdatePlan,
};

/// Default number of rows a `find` returns
pub const DEFAULT_FIND_LIMIT: u64 = 100;

/// Hard ceiling for `find` and `delete` limits
pub const MAX_RESULT_LIMIT: u64 = 1000;

/// Default number of documents a `delete` targets
pub const DEFAULT_DELETE_LIMIT: u64 = 1;

/// Maximum number of stages in an aggregation pipeline
pub const MAX_PIPELINE_STAGES: usize = 20;

// Largest integer a JSON number can carry without precision loss.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Validates a candidate JSON value and builds a `Plan` from it.
///
/// Fails with the first violated constraint; never partially accepts.
/// Normalizing the serialized form of a plan yields an identical plan.
pub fn normalize(candidate: &Value) -> PlanResult<Plan> {
    let object = candidate
        .as_object()
        .ok_or_else(|| SchemaValidationError::not_an_object(candidate))?;
    let fields = Fields(object);

    let action = match object.get("action") {
        None => return Err(SchemaValidationError::missing_field("action")),
        Some(Value::String(name)) => {
            Action::parse(name).ok_or_else(|| SchemaValidationError::unknown_action(name))?
        }
        Some(other) => {
            return Err(SchemaValidationError::type_mismatch(
                "action", "a string", other,
            ))
        }
    };

    let collection = fields.non_empty_string("collection")?;

    let plan = match action {
        Action::Find => Plan::Find(FindPlan {
            collection,
            filter: fields.filter()?,
            projection: fields.projection()?,
            sort: fields.sort()?,
            limit: fields.integer("limit", 0, Some(MAX_RESULT_LIMIT))?
                .unwrap_or(DEFAULT_FIND_LIMIT),
            skip: fields.integer("skip", 0, None)?.unwrap_or(0),
        }),
        Action::Count => Plan::Count(CountPlan {
            collection,
            filter: fields.filter()?,
        }),
        Action::Distinct => Plan::Distinct(DistinctPlan {
            collection,
            field: fields.non_empty_string("field")?,
            filter: fields.filter()?,
        }),
        Action::Aggregate => Plan::Aggregate(AggregatePlan {
            collection,
            pipeline: fields.pipeline()?,
            allow_disk_use: fields.boolean("allowDiskUse")?.unwrap_or(false),
        }),
        Action::Update => Plan::Update(UpdatePlan {
            collection,
            filter: fields.filter()?,
            update: fields
                .document("update")?
                .ok_or_else(|| SchemaValidationError::missing_field("update"))?,
            upsert: fields.boolean("upsert")?.unwrap_or(false),
            multi: fields.boolean("multi")?.unwrap_or(false),
        }),
        Action::Delete => Plan::Delete(DeletePlan {
            collection,
            filter: fields.filter()?,
            limit: fields.integer("limit", 1, Some(MAX_RESULT_LIMIT))?
                .unwrap_or(DEFAULT_DELETE_LIMIT),
        }),
    };

    Ok(plan)
}

/// Typed accessors over the candidate's fields.
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn non_empty_string(&self, name: &str) -> PlanResult<String> {
        match self.0.get(name) {
            None => Err(SchemaValidationError::missing_field(name)),
            Some(Value::String(s)) if s.is_empty() => Err(SchemaValidationError::out_of_range(
                name,
                "a non-empty string",
            )),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(SchemaValidationError::type_mismatch(name, "a string", other)),
        }
    }

    fn document(&self, name: &str) -> PlanResult<Option<Document>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(Value::Object(doc)) => Ok(Some(doc.clone())),
            Some(other) => Err(SchemaValidationError::type_mismatch(name, "an object", other)),
        }
    }

    fn filter(&self) -> PlanResult<Document> {
        Ok(self.document("filter")?.unwrap_or_default())
    }

    fn boolean(&self, name: &str) -> PlanResult<Option<bool>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(SchemaValidationError::type_mismatch(name, "a boolean", other)),
        }
    }

    fn integer(&self, name: &str, min: u64, max: Option<u64>) -> PlanResult<Option<u64>> {
        let value = match self.0.get(name) {
            None => return Ok(None),
            Some(value) => value,
        };
        let number = value
            .as_f64()
            .ok_or_else(|| SchemaValidationError::type_mismatch(name, "an integer", value))?;

        if !number.is_finite() || number.fract() != 0.0 {
            return Err(SchemaValidationError::type_mismatch(name, "an integer", value));
        }
        if number < min as f64 {
            return Err(SchemaValidationError::out_of_range(name, format!("≥ {}", min)));
        }
        let ceiling = max.unwrap_or(MAX_SAFE_INTEGER);
        if number > ceiling as f64 {
            return Err(SchemaValidationError::out_of_range(name, format!("≤ {}", ceiling)));
        }

        Ok(Some(number as u64))
    }

    fn sort(&self) -> PlanResult<Option<Document>> {
        let Some(sort) = self.document("sort")? else {
            return Ok(None);
        };

        let mut normalized = Document::new();
        for (key, value) in sort {
            let direction = match value.as_f64() {
                Some(d) if d == 1.0 => 1,
                Some(d) if d == -1.0 => -1,
                _ => {
                    return Err(SchemaValidationError::invalid_value(
                        format!("sort.{}", key),
                        "1 or -1",
                    ))
                }
            };
            normalized.insert(key, Value::from(direction));
        }
        Ok(Some(normalized))
    }

    fn projection(&self) -> PlanResult<Option<Document>> {
        let Some(projection) = self.document("projection")? else {
            return Ok(None);
        };

        let mut normalized = Document::new();
        for (key, value) in projection {
            let value = match &value {
                Value::Bool(_) => value.clone(),
                Value::Number(n) if n.as_f64() == Some(0.0) => Value::from(0),
                Value::Number(n) if n.as_f64() == Some(1.0) => Value::from(1),
                _ => {
                    return Err(SchemaValidationError::invalid_value(
                        format!("projection.{}", key),
                        "0, 1, true or false",
                    ))
                }
            };
            normalized.insert(key, value);
        }
        Ok(Some(normalized))
    }

    fn pipeline(&self) -> PlanResult<Vec<Document>> {
        let stages = match self.0.get("pipeline") {
            None => return Err(SchemaValidationError::missing_field("pipeline")),
            Some(Value::Array(stages)) => stages,
            Some(other) => {
                return Err(SchemaValidationError::type_mismatch(
                    "pipeline", "an array", other,
                ))
            }
        };

        if stages.is_empty() {
            return Err(SchemaValidationError::out_of_range(
                "pipeline",
                "at least 1 stage",
            ));
        }
        if stages.len() > MAX_PIPELINE_STAGES {
            return Err(SchemaValidationError::out_of_range(
                "pipeline",
                format!("at most {} stages", MAX_PIPELINE_STAGES),
            ));
        }

        stages
            .iter()
            .enumerate()
            .map(|(i, stage)| {
                let name = format!("pipeline[{}]", i);
                match stage {
                    Value::Object(doc) if doc.is_empty() => Err(
                        SchemaValidationError::out_of_range(name, "a non-empty stage"),
                    ),
                    Value::Object(doc) => Ok(doc.clone()),
                    other => Err(SchemaValidationError::type_mismatch(name, "an object", other)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::SchemaErrorCode;
    use serde_json::json;

    #[test]
    fn test_find_defaults() {
        let plan = normalize(&json!({"action": "find", "collection": "users"})).unwrap();
        assert_eq!(
            plan.to_value(),
            json!({"action": "find", "collection": "users", "filter": {}, "limit": 100, "skip": 0})
        );
    }

    #[test]
    fn test_update_defaults() {
        let plan = normalize(&json!({
            "action": "update",
            "collection": "users",
            "update": {"$set": {"a": 1}}
        }))
        .unwrap();
        let Plan::Update(update) = plan else {
            panic!("expected update plan");
        };
        assert!(update.filter().is_empty());
        assert!(!update.upsert());
        assert!(!update.multi());
    }

    #[test]
    fn test_delete_default_limit_is_one() {
        let plan = normalize(&json!({"action": "delete", "collection": "tmp"})).unwrap();
        let Plan::Delete(delete) = plan else {
            panic!("expected delete plan");
        };
        assert_eq!(delete.limit(), 1);
    }

    #[test]
    fn test_missing_and_unknown_action() {
        let err = normalize(&json!({"collection": "users"})).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MissingField);
        assert_eq!(err.field(), Some("action"));

        let err = normalize(&json!({"action": "drop", "collection": "users"})).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UnknownAction);
    }

    #[test]
    fn test_limit_ceiling_names_constraint() {
        let err = normalize(&json!({"action": "find", "collection": "u", "limit": 1001}))
            .unwrap_err();
        assert_eq!(err.message(), "limit must be ≤ 1000");

        let err = normalize(&json!({"action": "delete", "collection": "u", "limit": 0}))
            .unwrap_err();
        assert_eq!(err.message(), "limit must be ≥ 1");
    }

    #[test]
    fn test_integer_fields_reject_fractions_and_negatives() {
        let err = normalize(&json!({"action": "find", "collection": "u", "limit": 2.5}))
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::TypeMismatch);

        let err = normalize(&json!({"action": "find", "collection": "u", "skip": -1}))
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::OutOfRange);

        let plan = normalize(&json!({"action": "find", "collection": "u", "limit": 10.0}))
            .unwrap();
        assert_eq!(plan.to_value()["limit"], json!(10));
    }

    #[test]
    fn test_sort_values_must_be_unit() {
        let err = normalize(&json!({
            "action": "find", "collection": "u", "sort": {"createdAt": 2}
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("sort.createdAt"));

        let plan = normalize(&json!({
            "action": "find", "collection": "u", "sort": {"b": -1, "a": 1}
        }))
        .unwrap();
        let keys: Vec<_> = plan.to_value()["sort"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_projection_accepts_bits_and_booleans() {
        let plan = normalize(&json!({
            "action": "find", "collection": "u",
            "projection": {"email": 1, "name": true, "_id": 0}
        }))
        .unwrap();
        assert_eq!(
            plan.to_value()["projection"],
            json!({"email": 1, "name": true, "_id": 0})
        );

        let err = normalize(&json!({
            "action": "find", "collection": "u", "projection": {"email": "yes"}
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("projection.email"));
    }

    #[test]
    fn test_pipeline_bounds() {
        let err = normalize(&json!({"action": "aggregate", "collection": "o", "pipeline": []}))
            .unwrap_err();
        assert_eq!(err.field(), Some("pipeline"));

        let stages: Vec<_> = (0..21).map(|i| json!({"$limit": i + 1})).collect();
        let err = normalize(&json!({"action": "aggregate", "collection": "o", "pipeline": stages}))
            .unwrap_err();
        assert_eq!(err.message(), "pipeline must be at most 20 stages");

        let err = normalize(&json!({
            "action": "aggregate", "collection": "o", "pipeline": [{"$match": {}}, {}]
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("pipeline[1]"));
    }

    #[test]
    fn test_distinct_requires_field() {
        let err = normalize(&json!({"action": "distinct", "collection": "o"})).unwrap_err();
        assert_eq!(err.field(), Some("field"));

        let err = normalize(&json!({"action": "distinct", "collection": "o", "field": ""}))
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::OutOfRange);
    }

    #[test]
    fn test_update_requires_update_document() {
        let err = normalize(&json!({"action": "update", "collection": "o"})).unwrap_err();
        assert_eq!(err.field(), Some("update"));
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let plan = normalize(&json!({
            "action": "count", "collection": "o", "explain": true
        }))
        .unwrap();
        assert!(plan.to_value().get("explain").is_none());
    }

    #[test]
    fn test_null_optional_field_is_rejected() {
        let err = normalize(&json!({
            "action": "find", "collection": "o", "projection": null
        }))
        .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::TypeMismatch);
    }
}
