//! Update operator application
//!
//! Supported: `$set`, `$unset`, `$inc`, `$push`. An update document must
//! consist of operators only; replacement documents are rejected.

use serde_json::{Number, Value};

use super::document::{lookup_path, remove_path, set_path};
use super::errors::{StoreError, StoreResult};
use crate::plan::Document;

/// Checks that `update` can be applied, without touching any document
pub fn validate_update(update: &Document) -> StoreResult<()> {
    if update.is_empty() {
        return Err(StoreError::invalid("update document must not be empty"));
    }
    for (op, fields) in update {
        match op.as_str() {
            "$set" | "$unset" | "$inc" | "$push" => {}
            other if other.starts_with('$') => return Err(StoreError::unsupported(other)),
            other => {
                return Err(StoreError::invalid(format!(
                    "update document must use operators, found field '{}'",
                    other
                )))
            }
        }
        let fields = fields
            .as_object()
            .ok_or_else(|| StoreError::invalid(format!("{} needs an object", op)))?;
        if fields.contains_key("_id") {
            return Err(StoreError::invalid("_id is immutable"));
        }
        if op == "$inc" && fields.values().any(|v| !v.is_number()) {
            return Err(StoreError::invalid("$inc needs numeric values"));
        }
    }
    Ok(())
}

/// Applies `update` in place. Returns true if the document changed.
pub fn apply_update(doc: &mut Document, update: &Document) -> StoreResult<bool> {
    validate_update(update)?;
    let mut changed = false;

    for (op, fields) in update {
        let Some(fields) = fields.as_object() else {
            continue;
        };
        for (path, operand) in fields {
            changed |= match op.as_str() {
                "$set" => {
                    let previous = set_path(doc, path, operand.clone())?;
                    previous.as_ref() != Some(operand)
                }
                "$unset" => remove_path(doc, path).is_some(),
                "$inc" => {
                    let next = increment(lookup_path(doc, path), operand, path)?;
                    set_path(doc, path, next)?;
                    operand.as_f64() != Some(0.0)
                }
                "$push" => {
                    let mut items = match lookup_path(doc, path) {
                        None => Vec::new(),
                        Some(Value::Array(items)) => items.clone(),
                        Some(_) => {
                            return Err(StoreError::invalid(format!(
                                "$push target '{}' is not an array",
                                path
                            )))
                        }
                    };
                    items.push(operand.clone());
                    set_path(doc, path, Value::Array(items))?;
                    true
                }
                other => return Err(StoreError::unsupported(other)),
            };
        }
    }
    Ok(changed)
}

fn increment(current: Option<&Value>, by: &Value, path: &str) -> StoreResult<Value> {
    let current = match current {
        None | Some(Value::Null) => return Ok(by.clone()),
        Some(Value::Number(n)) => n,
        Some(_) => {
            return Err(StoreError::invalid(format!(
                "cannot $inc non-numeric field '{}'",
                path
            )))
        }
    };

    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }
    let sum = current.as_f64().unwrap_or(0.0) + by.as_f64().unwrap_or(0.0);
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| StoreError::invalid(format!("$inc on '{}' overflowed", path)))
}

/// Builds the base document for an upsert from the filter's equality clauses
/// (`{field: value}`, `{field: {$eq: value}}` and `$and` members).
pub fn upsert_seed(filter: &Document) -> StoreResult<Document> {
    let mut seed = Document::new();
    collect_equalities(filter, &mut seed)?;
    Ok(seed)
}

fn collect_equalities(filter: &Document, seed: &mut Document) -> StoreResult<()> {
    for (key, condition) in filter {
        if key == "$and" {
            for clause in condition.as_array().into_iter().flatten() {
                if let Some(clause) = clause.as_object() {
                    collect_equalities(clause, seed)?;
                }
            }
            continue;
        }
        if key.starts_with('$') {
            continue;
        }
        match condition {
            Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                if let Some(value) = ops.get("$eq") {
                    set_path(seed, key, value.clone())?;
                }
            }
            value => {
                set_path(seed, key, value.clone())?;
            }
        }
    }
    Ok(())
}
