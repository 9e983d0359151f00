//! Query filter evaluation
//!
//! Supports equality (with array membership), the comparison operators,
//! `$in`/`$nin`, `$exists`, `$regex`, `$not` and the `$and`/`$or`/`$nor`
//! combinators over dotted paths. No type coercion: `"123"` never equals
//! `123`. Anything else is an unsupported-operator error, never a silent
//! non-match.

use std::cmp::Ordering;

use regex::RegexBuilder;
use serde_json::Value;

use super::document::lookup_path;
use super::errors::{StoreError, StoreResult};
use super::sorter::compare_values;
use crate::plan::Document;

/// Evaluates filter documents against stored documents
pub struct FilterMatcher;

impl FilterMatcher {
    /// Checks if a document matches every clause of `filter` (AND semantics)
    pub fn matches(document: &Document, filter: &Document) -> StoreResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => Self::all(document, clauses(key, condition)?)?,
                "$or" => Self::any(document, clauses(key, condition)?)?,
                "$nor" => !Self::any(document, clauses(key, condition)?)?,
                op if op.starts_with('$') => return Err(StoreError::unsupported(op)),
                path => Self::matches_field(lookup_path(document, path), condition)?,
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn all(document: &Document, filters: Vec<&Document>) -> StoreResult<bool> {
        for filter in filters {
            if !Self::matches(document, filter)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn any(document: &Document, filters: Vec<&Document>) -> StoreResult<bool> {
        for filter in filters {
            if Self::matches(document, filter)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn matches_field(actual: Option<&Value>, condition: &Value) -> StoreResult<bool> {
        match condition {
            Value::Object(ops) if is_operator_document(ops) => {
                Self::matches_operators(actual, ops)
            }
            _ => Ok(equals(actual, condition)),
        }
    }

    fn matches_operators(actual: Option<&Value>, ops: &Document) -> StoreResult<bool> {
        for (op, operand) in ops {
            let matched = match op.as_str() {
                "$eq" => equals(actual, operand),
                "$ne" => !equals(actual, operand),
                "$gt" => compares(actual, operand, |o| o == Ordering::Greater),
                "$gte" => compares(actual, operand, |o| o != Ordering::Less),
                "$lt" => compares(actual, operand, |o| o == Ordering::Less),
                "$lte" => compares(actual, operand, |o| o != Ordering::Greater),
                "$in" => in_list(actual, op, operand)?,
                "$nin" => !in_list(actual, op, operand)?,
                "$exists" => actual.is_some() == truthy_flag(operand),
                "$regex" => regex_match(actual, operand, ops.get("$options"))?,
                "$options" => {
                    if !ops.contains_key("$regex") {
                        return Err(StoreError::invalid("$options requires $regex"));
                    }
                    true
                }
                "$not" => !Self::negated(actual, operand)?,
                other => return Err(StoreError::unsupported(other)),
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn negated(actual: Option<&Value>, operand: &Value) -> StoreResult<bool> {
        match operand {
            Value::Object(ops) if is_operator_document(ops) => {
                Self::matches_operators(actual, ops)
            }
            Value::String(_) => regex_match(actual, operand, None),
            _ => Err(StoreError::invalid("$not needs an operator document or a regex")),
        }
    }
}

fn clauses<'a>(op: &str, condition: &'a Value) -> StoreResult<Vec<&'a Document>> {
    let items = condition
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| StoreError::invalid(format!("{} needs a non-empty array", op)))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| StoreError::invalid(format!("{} entries must be objects", op)))
        })
        .collect()
}

fn is_operator_document(map: &Document) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

/// Equality with array membership; `null` also matches a missing field
fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(value) => {
            scalar_equals(value, expected)
                || matches!(value, Value::Array(items) if items.iter().any(|i| scalar_equals(i, expected)))
        }
    }
}

fn scalar_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordered comparison; only same-kind numbers or strings compare
fn compares(actual: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |value: &Value| match (value, bound) {
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_)) => {
            accept(compare_values(Some(value), Some(bound)))
        }
        _ => false,
    };
    match actual {
        Some(Value::Array(items)) => items.iter().any(check),
        Some(value) => check(value),
        None => false,
    }
}

fn in_list(actual: Option<&Value>, op: &str, operand: &Value) -> StoreResult<bool> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| StoreError::invalid(format!("{} needs an array", op)))?;
    Ok(candidates.iter().any(|candidate| equals(actual, candidate)))
}

fn truthy_flag(operand: &Value) -> bool {
    match operand {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Null => false,
        _ => true,
    }
}

fn regex_match(actual: Option<&Value>, pattern: &Value, options: Option<&Value>) -> StoreResult<bool> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| StoreError::invalid("$regex needs a string pattern"))?;
    let options = match options {
        None => "",
        Some(Value::String(s)) => s.as_str(),
        Some(_) => return Err(StoreError::invalid("$options must be a string")),
    };

    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(StoreError::invalid(format!(
                    "unsupported regex option '{}'",
                    other
                )))
            }
        };
    }
    let regex = builder
        .build()
        .map_err(|e| StoreError::invalid(format!("invalid $regex: {}", e)))?;

    Ok(match actual {
        Some(Value::String(s)) => regex.is_match(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| regex.is_match(s)),
        _ => false,
    })
}
