use crate::domain::model::{JsonObject, TokenMap};
use serde_json::Value;

/// Replaces every string leaf that is a key of `tokens` with its label.
///
/// Strings without an entry are kept verbatim; an entry with an empty label
/// replaces the token with an empty string. Empty strings themselves are
/// never looked up. Numbers, booleans and nulls pass through.
pub fn substitute(tree: &Value, tokens: &TokenMap) -> Value {
    match tree {
        Value::Object(map) => Value::Object(substitute_object(map, tokens)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute(item, tokens))
                .collect(),
        ),
        Value::String(text) if !text.is_empty() => match tokens.get(text) {
            Some(label) => Value::String(label.clone()),
            None => tree.clone(),
        },
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => tree.clone(),
    }
}

pub fn substitute_object(map: &JsonObject, tokens: &TokenMap) -> JsonObject {
    map.iter()
        .map(|(key, value)| (key.clone(), substitute(value, tokens)))
        .collect()
}
