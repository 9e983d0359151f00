//! In-memory aggregation pipeline
//!
//! Stages: `$match`, `$project`, `$sort`, `$skip`, `$limit`, `$count`,
//! `$unwind`, `$group`. Group accumulators: `$sum`, `$avg`, `$min`, `$max`,
//! `$first`, `$last`, `$push`. Field references are `"$path"` strings.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use super::document::{is_truthy, lookup_path, set_path};
use super::errors::{StoreError, StoreResult};
use super::filters::FilterMatcher;
use super::sorter::{compare_values, sort_documents};
use crate::plan::{Document, SortDirection};

/// Runs `pipeline` over `documents`, stage by stage
pub fn run_pipeline(mut documents: Vec<Document>, pipeline: &[Document]) -> StoreResult<Vec<Document>> {
    for stage in pipeline {
        let mut entries = stage.iter();
        let (name, spec) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(StoreError::invalid(
                    "a pipeline stage must have exactly one key",
                ))
            }
        };
        documents = match name.as_str() {
            "$match" => match_stage(documents, object(name, spec)?)?,
            "$project" => {
                let spec = object(name, spec)?;
                documents
                    .iter()
                    .map(|doc| project_stage(doc, spec))
                    .collect::<StoreResult<_>>()?
            }
            "$sort" => sort_stage(documents, object(name, spec)?)?,
            "$skip" => {
                let n = count_arg(name, spec)?;
                documents.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = count_arg(name, spec)?;
                if n == 0 {
                    return Err(StoreError::invalid("$limit must be positive"));
                }
                documents.truncate(n);
                documents
            }
            "$count" => count_stage(&documents, spec)?,
            "$unwind" => unwind_stage(documents, spec)?,
            "$group" => group_stage(&documents, object(name, spec)?)?,
            other => return Err(StoreError::unsupported(other)),
        };
    }
    Ok(documents)
}

fn object<'a>(stage: &str, spec: &'a Value) -> StoreResult<&'a Document> {
    spec.as_object()
        .ok_or_else(|| StoreError::invalid(format!("{} needs an object", stage)))
}

fn count_arg(stage: &str, spec: &Value) -> StoreResult<usize> {
    spec.as_u64()
        .or_else(|| {
            spec.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
        .map(|n| n as usize)
        .ok_or_else(|| StoreError::invalid(format!("{} needs a non-negative integer", stage)))
}

fn match_stage(documents: Vec<Document>, filter: &Document) -> StoreResult<Vec<Document>> {
    let mut kept = Vec::with_capacity(documents.len());
    for doc in documents {
        if FilterMatcher::matches(&doc, filter)? {
            kept.push(doc);
        }
    }
    Ok(kept)
}

fn sort_stage(mut documents: Vec<Document>, spec: &Document) -> StoreResult<Vec<Document>> {
    if spec.is_empty() {
        return Err(StoreError::invalid("$sort needs at least one key"));
    }
    if let Some((key, _)) = spec
        .iter()
        .find(|(_, dir)| SortDirection::from_value(dir).is_none())
    {
        return Err(StoreError::invalid(format!(
            "$sort direction for '{}' must be 1 or -1",
            key
        )));
    }
    sort_documents(&mut documents, spec);
    Ok(documents)
}

fn count_stage(documents: &[Document], spec: &Value) -> StoreResult<Vec<Document>> {
    let name = spec
        .as_str()
        .filter(|s| !s.is_empty() && !s.starts_with('$') && !s.contains('.'))
        .ok_or_else(|| StoreError::invalid("$count needs a plain field name"))?;
    if documents.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Map::new();
    out.insert(name.to_string(), Value::from(documents.len() as u64));
    Ok(vec![out])
}

fn unwind_stage(documents: Vec<Document>, spec: &Value) -> StoreResult<Vec<Document>> {
    let (path, preserve) = match spec {
        Value::String(path) => (path.as_str(), false),
        Value::Object(options) => (
            options
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::invalid("$unwind needs a path"))?,
            options
                .get("preserveNullAndEmptyArrays")
                .map(is_truthy)
                .unwrap_or(false),
        ),
        _ => return Err(StoreError::invalid("$unwind needs a path")),
    };
    let path = path
        .strip_prefix('$')
        .ok_or_else(|| StoreError::invalid("$unwind path must start with '$'"))?;

    let mut out = Vec::new();
    for doc in documents {
        match lookup_path(&doc, path) {
            Some(Value::Array(items)) if !items.is_empty() => {
                for item in items.clone() {
                    let mut copy = doc.clone();
                    set_path(&mut copy, path, item)?;
                    out.push(copy);
                }
            }
            Some(Value::Array(_)) | Some(Value::Null) | None => {
                if preserve {
                    out.push(doc);
                }
            }
            Some(_) => out.push(doc),
        }
    }
    Ok(out)
}

fn project_stage(doc: &Document, spec: &Document) -> StoreResult<Document> {
    let id_flag = spec
        .get("_id")
        .filter(|v| v.is_boolean() || v.is_number());
    let include_id = id_flag.map(is_truthy).unwrap_or(true);

    let mut out = Map::new();
    if include_id {
        if let Some(id) = doc.get("_id") {
            out.insert("_id".to_string(), id.clone());
        }
    }

    let inclusive = spec.iter().any(|(key, value)| {
        key != "_id" && (!(value.is_boolean() || value.is_number()) || is_truthy(value))
    });
    if !inclusive {
        return super::document::project(doc, spec);
    }

    for (key, value) in spec {
        match value {
            Value::Bool(_) | Value::Number(_) => {
                if key == "_id" {
                    continue;
                }
                if !is_truthy(value) {
                    return Err(StoreError::invalid(
                        "$project cannot mix inclusion and exclusion",
                    ));
                }
                if let Some(found) = lookup_path(doc, key) {
                    set_path(&mut out, key, found.clone())?;
                }
            }
            expr => {
                let computed = evaluate(doc, expr)?;
                set_path(&mut out, key, computed)?;
            }
        }
    }
    Ok(out)
}

/// Evaluates an expression: `"$path"` references, literals, and objects or
/// arrays of expressions. Expression operators are not supported.
fn evaluate(doc: &Document, expr: &Value) -> StoreResult<Value> {
    match expr {
        Value::String(s) if s.starts_with('$') => {
            Ok(lookup_path(doc, &s[1..]).cloned().unwrap_or(Value::Null))
        }
        Value::Object(map) => {
            if let Some(op) = map.keys().find(|k| k.starts_with('$')) {
                return Err(StoreError::unsupported(op.as_str()));
            }
            let mut out = Map::new();
            for (key, value) in map {
                out.insert(key.clone(), evaluate(doc, value)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| evaluate(doc, item))
            .collect::<StoreResult<Vec<_>>>()
            .map(Value::Array),
        literal => Ok(literal.clone()),
    }
}

#[derive(Debug, Clone, Copy)]
enum AccumulatorOp {
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
    Push,
}

impl AccumulatorOp {
    fn parse(op: &str) -> StoreResult<Self> {
        Ok(match op {
            "$sum" => AccumulatorOp::Sum,
            "$avg" => AccumulatorOp::Avg,
            "$min" => AccumulatorOp::Min,
            "$max" => AccumulatorOp::Max,
            "$first" => AccumulatorOp::First,
            "$last" => AccumulatorOp::Last,
            "$push" => AccumulatorOp::Push,
            other => return Err(StoreError::unsupported(other)),
        })
    }

    fn start(self) -> Accumulator {
        match self {
            AccumulatorOp::Sum => Accumulator::Sum(Total::Int(0)),
            AccumulatorOp::Avg => Accumulator::Avg { total: 0.0, n: 0 },
            AccumulatorOp::Min => Accumulator::Min(None),
            AccumulatorOp::Max => Accumulator::Max(None),
            AccumulatorOp::First => Accumulator::First(None),
            AccumulatorOp::Last => Accumulator::Last(Value::Null),
            AccumulatorOp::Push => Accumulator::Push(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Total {
    Int(i64),
    Float(f64),
}

impl Total {
    fn add(self, n: &Number) -> Total {
        match (self, n.as_i64()) {
            (Total::Int(a), Some(b)) => match a.checked_add(b) {
                Some(sum) => Total::Int(sum),
                None => Total::Float(a as f64 + b as f64),
            },
            (Total::Int(a), None) => Total::Float(a as f64 + n.as_f64().unwrap_or(0.0)),
            (Total::Float(a), _) => Total::Float(a + n.as_f64().unwrap_or(0.0)),
        }
    }
}

#[derive(Debug, Clone)]
enum Accumulator {
    Sum(Total),
    Avg { total: f64, n: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    First(Option<Value>),
    Last(Value),
    Push(Vec<Value>),
}

impl Accumulator {
    fn feed(&mut self, value: Value) {
        match self {
            Accumulator::Sum(total) => {
                if let Value::Number(n) = &value {
                    *total = total.add(n);
                }
            }
            Accumulator::Avg { total, n } => {
                if let Some(f) = value.as_f64() {
                    *total += f;
                    *n += 1;
                }
            }
            Accumulator::Min(current) => {
                if !value.is_null() && current.as_ref().map_or(true, |c| {
                    compare_values(Some(&value), Some(c)) == Ordering::Less
                }) {
                    *current = Some(value);
                }
            }
            Accumulator::Max(current) => {
                if !value.is_null() && current.as_ref().map_or(true, |c| {
                    compare_values(Some(&value), Some(c)) == Ordering::Greater
                }) {
                    *current = Some(value);
                }
            }
            Accumulator::First(current) => {
                if current.is_none() {
                    *current = Some(value);
                }
            }
            Accumulator::Last(current) => *current = value,
            Accumulator::Push(items) => items.push(value),
        }
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Sum(Total::Int(n)) => Value::from(n),
            Accumulator::Sum(Total::Float(f)) => float(f),
            Accumulator::Avg { n: 0, .. } => Value::Null,
            Accumulator::Avg { total, n } => float(total / n as f64),
            Accumulator::Min(v) | Accumulator::Max(v) | Accumulator::First(v) => {
                v.unwrap_or(Value::Null)
            }
            Accumulator::Last(v) => v,
            Accumulator::Push(items) => Value::Array(items),
        }
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn group_stage(documents: &[Document], spec: &Document) -> StoreResult<Vec<Document>> {
    let key_expr = spec
        .get("_id")
        .ok_or_else(|| StoreError::invalid("$group needs an _id expression"))?;

    let mut fields = Vec::new();
    for (name, acc) in spec {
        if name == "_id" {
            continue;
        }
        let acc = acc
            .as_object()
            .filter(|m| m.len() == 1)
            .ok_or_else(|| {
                StoreError::invalid(format!("$group field '{}' needs one accumulator", name))
            })?;
        let Some((op, expr)) = acc.iter().next() else {
            continue;
        };
        fields.push((name.clone(), AccumulatorOp::parse(op)?, expr));
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Value, Vec<Accumulator>)> = Vec::new();

    for doc in documents {
        let key = evaluate(doc, key_expr)?;
        let slot = index.entry(key.to_string()).or_insert_with(|| {
            groups.push((key.clone(), fields.iter().map(|(_, op, _)| op.start()).collect()));
            groups.len() - 1
        });
        let accumulators = &mut groups[*slot].1;
        for ((_, _, expr), acc) in fields.iter().zip(accumulators.iter_mut()) {
            acc.feed(evaluate(doc, expr)?);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, accumulators)| {
            let mut out = Map::new();
            out.insert("_id".to_string(), key);
            for ((name, _, _), acc) in fields.iter().zip(accumulators) {
                out.insert(name.clone(), acc.finish());
            }
            out
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(value: Value) -> Vec<Document> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d.as_object().cloned().unwrap())
            .collect()
    }

    fn run(input: Value, pipeline: Value) -> StoreResult<Value> {
        run_pipeline(docs(input), &docs(pipeline))
            .map(|out| Value::Array(out.into_iter().map(Value::Object).collect()))
    }

    fn orders() -> Value {
        json!([
            {"_id": 1, "userId": "u1", "status": "shipped", "total": 10},
            {"_id": 2, "userId": "u2", "status": "shipped", "total": 5},
            {"_id": 3, "userId": "u1", "status": "shipped", "total": 7.5},
            {"_id": 4, "userId": "u2", "status": "pending", "total": 100}
        ])
    }

    #[test]
    fn test_match_group_sort_limit() {
        let out = run(
            orders(),
            json!([
                {"$match": {"status": "shipped"}},
                {"$group": {"_id": "$userId", "total": {"$sum": "$total"}, "n": {"$sum": 1}}},
                {"$sort": {"total": -1}},
                {"$limit": 50}
            ]),
        )
        .unwrap();
        assert_eq!(
            out,
            json!([
                {"_id": "u1", "total": 17.5, "n": 2},
                {"_id": "u2", "total": 5, "n": 1}
            ])
        );
    }

    #[test]
    fn test_group_accumulators() {
        let out = run(
            orders(),
            json!([
                {"$group": {
                    "_id": null,
                    "avg": {"$avg": "$total"},
                    "min": {"$min": "$total"},
                    "max": {"$max": "$total"},
                    "first": {"$first": "$_id"},
                    "last": {"$last": "$_id"},
                    "statuses": {"$push": "$status"}
                }}
            ]),
        )
        .unwrap();
        assert_eq!(
            out,
            json!([{
                "_id": null,
                "avg": 30.625,
                "min": 5,
                "max": 100,
                "first": 1,
                "last": 4,
                "statuses": ["shipped", "shipped", "shipped", "pending"]
            }])
        );
    }

    #[test]
    fn test_unwind_and_count() {
        let input = json!([
            {"_id": 1, "tags": ["a", "b"]},
            {"_id": 2, "tags": []},
            {"_id": 3}
        ]);
        let out = run(input.clone(), json!([{"$unwind": "$tags"}, {"$count": "n"}])).unwrap();
        assert_eq!(out, json!([{"n": 2}]));

        let out = run(
            input,
            json!([{"$unwind": {"path": "$tags", "preserveNullAndEmptyArrays": true}}]),
        )
        .unwrap();
        assert_eq!(out.as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_count_on_empty_input_yields_nothing() {
        let out = run(orders(), json!([{"$match": {"status": "lost"}}, {"$count": "n"}])).unwrap();
        assert_eq!(out, json!([]));
    }

    #[test]
    fn test_project_with_field_reference() {
        let out = run(
            orders(),
            json!([{"$skip": 3}, {"$project": {"_id": 0, "who": "$userId", "total": 1}}]),
        )
        .unwrap();
        assert_eq!(out, json!([{"who": "u2", "total": 100}]));
    }

    #[test]
    fn test_unsupported_stage_and_operator() {
        let err = run(orders(), json!([{"$lookup": {"from": "users"}}])).unwrap_err();
        assert_eq!(err, StoreError::unsupported("$lookup"));

        let err = run(
            orders(),
            json!([{"$group": {"_id": "$userId", "s": {"$stdDevPop": "$total"}}}]),
        )
        .unwrap_err();
        assert_eq!(err, StoreError::unsupported("$stdDevPop"));
    }
}
