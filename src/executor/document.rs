//! Dotted-path access and projection over JSON documents

use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};
use crate::plan::Document;

/// Resolves a dotted path (`address.city`, `items.0.sku`)
pub fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Sets a dotted path, creating intermediate objects. Returns the previous value.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> StoreResult<Option<Value>> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    if leaf.is_empty() {
        return Err(StoreError::invalid(format!("invalid field path '{}'", path)));
    }

    let mut current = doc;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            current = match current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
            {
                Value::Object(map) => map,
                _ => {
                    return Err(StoreError::invalid(format!(
                        "cannot set '{}': '{}' is not an object",
                        path, segment
                    )))
                }
            };
        }
    }
    Ok(current.insert(leaf.to_string(), value))
}

/// Removes a dotted path. Returns the removed value.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, rest)) => match doc.get_mut(head)? {
            Value::Object(map) => remove_path(map, rest),
            _ => None,
        },
    }
}

/// Truthiness of a projection flag
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Null => false,
        _ => true,
    }
}

/// Applies an inclusion or exclusion projection.
///
/// `_id` is kept unless explicitly excluded. Mixing inclusion and exclusion
/// on other fields is rejected.
pub fn project(doc: &Document, projection: &Document) -> StoreResult<Document> {
    let include_id = projection.get("_id").map(is_truthy).unwrap_or(true);
    let includes = projection
        .iter()
        .filter(|(key, _)| key.as_str() != "_id")
        .filter(|(_, flag)| is_truthy(flag))
        .count();
    let excludes = projection
        .iter()
        .filter(|(key, _)| key.as_str() != "_id")
        .filter(|(_, flag)| !is_truthy(flag))
        .count();

    if includes > 0 && excludes > 0 {
        return Err(StoreError::invalid(
            "projection cannot mix inclusion and exclusion",
        ));
    }

    if includes == 0 {
        let mut out = doc.clone();
        for (path, flag) in projection {
            if !is_truthy(flag) {
                remove_path(&mut out, path);
            }
        }
        return Ok(out);
    }

    let mut out = Map::new();
    if include_id {
        if let Some(id) = doc.get("_id") {
            out.insert("_id".to_string(), id.clone());
        }
    }
    for (path, flag) in projection {
        if path == "_id" || !is_truthy(flag) {
            continue;
        }
        if let Some(value) = lookup_path(doc, path) {
            set_path(&mut out, path, value.clone())?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lookup_nested_and_indexed() {
        let d = doc(json!({"address": {"city": "Oslo"}, "items": [{"sku": "a1"}]}));
        assert_eq!(lookup_path(&d, "address.city"), Some(&json!("Oslo")));
        assert_eq!(lookup_path(&d, "items.0.sku"), Some(&json!("a1")));
        assert_eq!(lookup_path(&d, "address.zip"), None);
    }

    #[test]
    fn test_set_path_creates_parents() {
        let mut d = Document::new();
        set_path(&mut d, "a.b.c", json!(1)).unwrap();
        assert_eq!(Value::Object(d), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_set_path_through_scalar_fails() {
        let mut d = doc(json!({"a": 5}));
        assert!(set_path(&mut d, "a.b", json!(1)).is_err());
    }

    #[test]
    fn test_inclusion_keeps_id() {
        let d = doc(json!({"_id": 1, "email": "x@y", "password": "secret"}));
        let out = project(&d, &doc(json!({"email": 1}))).unwrap();
        assert_eq!(Value::Object(out), json!({"_id": 1, "email": "x@y"}));
    }

    #[test]
    fn test_exclusion_and_id_suppression() {
        let d = doc(json!({"_id": 1, "email": "x@y", "password": "secret"}));
        let out = project(&d, &doc(json!({"password": 0}))).unwrap();
        assert_eq!(Value::Object(out), json!({"_id": 1, "email": "x@y"}));

        let out = project(&d, &doc(json!({"_id": false, "email": true}))).unwrap();
        assert_eq!(Value::Object(out), json!({"email": "x@y"}));
    }

    #[test]
    fn test_mixed_projection_rejected() {
        let d = doc(json!({"a": 1, "b": 2}));
        assert!(project(&d, &doc(json!({"a": 1, "b": 0}))).is_err());
    }
}
