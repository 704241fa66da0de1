//! Single-field equality filter over a stored JSON array.

use serde_json::Value;

use crate::error::{Error, Result};

/// Keep the elements of the JSON array `json` whose field `key` equals
/// `value`.
///
/// An empty `key` returns `json` untouched. `key` may be a dotted path
/// (`address.city`); numeric segments index into arrays (`tags.0`). String
/// fields compare by content, numbers and booleans by their JSON text. No
/// match yields `[]`.
pub fn filter_json(json: &str, key: &str, value: &str) -> Result<String> {
    if key.is_empty() {
        return Ok(json.to_string());
    }
    let doc: Value = serde_json::from_str(json)?;
    let items = match doc {
        Value::Array(items) => items,
        other => {
            return Err(Error::Filter(format!(
                "expected a JSON array, found {}",
                kind(&other)
            )));
        }
    };
    let matches: Vec<Value> = items
        .into_iter()
        .filter(|item| lookup(item, key).is_some_and(|field| field_equals(field, value)))
        .collect();
    tracing::debug!(key, value, matches = matches.len(), "filtered document");
    Ok(serde_json::to_string(&matches)?)
}

fn lookup<'a>(item: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(item, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn field_equals(field: &Value, value: &str) -> bool {
    match field {
        Value::String(s) => s == value,
        Value::Number(n) => n.to_string() == value,
        Value::Bool(b) => b.to_string() == value,
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
