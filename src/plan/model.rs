//! Typed plan representation
//!
//! A `Plan` is one of six operation variants. Variant structs have private
//! fields: the only way to build one is `normalize`, so every `Plan` in the
//! process has already passed structural validation and had its defaults
//! filled.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::normalize::normalize;

/// A JSON document (filter, update, projection, pipeline stage, row)
pub type Document = Map<String, Value>;

/// The six supported operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Find,
    Count,
    Distinct,
    Aggregate,
    Update,
    Delete,
}

impl Action {
    /// All actions in prompt order
    pub const ALL: [Action; 6] = [
        Action::Find,
        Action::Aggregate,
        Action::Count,
        Action::Distinct,
        Action::Update,
        Action::Delete,
    ];

    /// Parses the wire discriminator
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "find" => Some(Action::Find),
            "count" => Some(Action::Count),
            "distinct" => Some(Action::Distinct),
            "aggregate" => Some(Action::Aggregate),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Find => "find",
            Action::Count => "count",
            Action::Distinct => "distinct",
            Action::Aggregate => "aggregate",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Returns true for actions that change stored documents
    pub fn is_mutating(&self) -> bool {
        matches!(self, Action::Update | Action::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for one sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Reads a validated sort value (`1` or `-1`)
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_i64() {
            Some(1) => Some(SortDirection::Asc),
            Some(-1) => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindPlan {
    pub(super) collection: String,
    pub(super) filter: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) projection: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) sort: Option<Document>,
    pub(super) limit: u64,
    pub(super) skip: u64,
}

impl FindPlan {
    pub fn filter(&self) -> &Document {
        &self.filter
    }

    pub fn projection(&self) -> Option<&Document> {
        self.projection.as_ref()
    }

    /// Sort keys in declaration order; values are always `1` or `-1`
    pub fn sort(&self) -> Option<&Document> {
        self.sort.as_ref()
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountPlan {
    pub(super) collection: String,
    pub(super) filter: Document,
}

impl CountPlan {
    pub fn filter(&self) -> &Document {
        &self.filter
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistinctPlan {
    pub(super) collection: String,
    pub(super) field: String,
    pub(super) filter: Document,
}

impl DistinctPlan {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn filter(&self) -> &Document {
        &self.filter
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePlan {
    pub(super) collection: String,
    pub(super) pipeline: Vec<Document>,
    pub(super) allow_disk_use: bool,
}

impl AggregatePlan {
    pub fn pipeline(&self) -> &[Document] {
        &self.pipeline
    }

    pub fn allow_disk_use(&self) -> bool {
        self.allow_disk_use
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatePlan {
    pub(super) collection: String,
    pub(super) filter: Document,
    pub(super) update: Document,
    pub(super) upsert: bool,
    pub(super) multi: bool,
}

impl UpdatePlan {
    pub fn filter(&self) -> &Document {
        &self.filter
    }

    pub fn update(&self) -> &Document {
        &self.update
    }

    pub fn upsert(&self) -> bool {
        self.upsert
    }

    /// Carried for the wire contract; execution always updates every match.
    pub fn multi(&self) -> bool {
        self.multi
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletePlan {
    pub(super) collection: String,
    pub(super) filter: Document,
    pub(super) limit: u64,
}

impl DeletePlan {
    pub fn filter(&self) -> &Document {
        &self.filter
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// A normalized, validated database operation.
///
/// Serializes to the plan wire contract (`{"action": ..., "collection": ...}`).
/// Deserializing goes through [`normalize`], so a plan handed back by a
/// caller is re-validated and default-filled exactly like a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Plan {
    Find(FindPlan),
    Count(CountPlan),
    Distinct(DistinctPlan),
    Aggregate(AggregatePlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
}

impl Plan {
    pub fn action(&self) -> Action {
        match self {
            Plan::Find(_) => Action::Find,
            Plan::Count(_) => Action::Count,
            Plan::Distinct(_) => Action::Distinct,
            Plan::Aggregate(_) => Action::Aggregate,
            Plan::Update(_) => Action::Update,
            Plan::Delete(_) => Action::Delete,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            Plan::Find(p) => &p.collection,
            Plan::Count(p) => &p.collection,
            Plan::Distinct(p) => &p.collection,
            Plan::Aggregate(p) => &p.collection,
            Plan::Update(p) => &p.collection,
            Plan::Delete(p) => &p.collection,
        }
    }

    /// Filter document for every variant except `aggregate`
    pub fn filter(&self) -> Option<&Document> {
        match self {
            Plan::Find(p) => Some(&p.filter),
            Plan::Count(p) => Some(&p.filter),
            Plan::Distinct(p) => Some(&p.filter),
            Plan::Aggregate(_) => None,
            Plan::Update(p) => Some(&p.filter),
            Plan::Delete(p) => Some(&p.filter),
        }
    }

    pub fn is_mutating(&self) -> bool {
        self.action().is_mutating()
    }

    /// Returns the wire form of this plan
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl<'de> Deserialize<'de> for Plan {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let candidate = Value::deserialize(deserializer)?;
        normalize(&candidate).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_round_trips_wire_name() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
        assert_eq!(Action::parse("insert"), None);
    }

    #[test]
    fn test_only_update_and_delete_mutate() {
        let mutating: Vec<_> = Action::ALL.iter().filter(|a| a.is_mutating()).collect();
        assert_eq!(mutating, vec![&Action::Update, &Action::Delete]);
    }

    #[test]
    fn test_plan_serializes_with_action_tag() {
        let plan = normalize(&json!({"action": "count", "collection": "orders"})).unwrap();
        assert_eq!(
            plan.to_value(),
            json!({"action": "count", "collection": "orders", "filter": {}})
        );
    }

    #[test]
    fn test_aggregate_serializes_camel_case() {
        let plan = normalize(&json!({
            "action": "aggregate",
            "collection": "orders",
            "pipeline": [{"$match": {}}]
        }))
        .unwrap();
        assert_eq!(plan.to_value()["allowDiskUse"], json!(false));
    }

    #[test]
    fn test_deserialize_runs_normalization() {
        let plan: Plan = serde_json::from_value(json!({"action": "find", "collection": "users"}))
            .unwrap();
        match plan {
            Plan::Find(find) => assert_eq!(find.limit(), 100),
            other => panic!("unexpected plan {:?}", other),
        }

        let err = serde_json::from_value::<Plan>(json!({"action": "find", "collection": ""}));
        assert!(err.is_err());
    }

    #[test]
    fn test_sort_direction_from_value() {
        assert_eq!(SortDirection::from_value(&json!(1)), Some(SortDirection::Asc));
        assert_eq!(SortDirection::from_value(&json!(-1)), Some(SortDirection::Desc));
        assert_eq!(SortDirection::from_value(&json!(2)), None);
    }
}
