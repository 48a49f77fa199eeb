use crate::domain::model::JsonObject;
use std::collections::HashSet;

/// Keeps the top-level fields of `tree` that appear in `allowed`.
///
/// Kept fields are copied whole, nested structure included, in the order
/// they appear in `tree`. Allowed names missing from `tree` are skipped.
pub fn filter_fields(tree: &JsonObject, allowed: &HashSet<String>) -> JsonObject {
    tree.iter()
        .filter(|(key, _)| allowed.contains(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
