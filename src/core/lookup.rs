use crate::domain::model::{LookupRow, TokenMap};
use std::collections::{BTreeMap, HashSet};

/// Builds the guid -> label map for one tenant.
///
/// Candidates are restricted to live rows with a collection and a guid, that
/// belong to `tenant_id` or to no tenant, and whose selector is either
/// `selector` or `fallback_selector`. Within each `(collection, guid)` group
/// the winner is the row with the highest priority key:
///
/// 1. tenant-specific rows over global rows,
/// 2. exact selector (2) over fallback selector (1) over anything else (0),
/// 3. highest id.
///
/// Groups are visited in ascending `(collection, guid)` order and a guid
/// seen under an earlier collection keeps that label. A missing value
/// resolves to an empty label.
pub fn resolve(
    candidates: &[LookupRow],
    tenant_id: i64,
    selector: &str,
    fallback_selector: &str,
) -> TokenMap {
    let mut tokens = TokenMap::new();
    for row in select_rows(candidates, tenant_id, selector, fallback_selector) {
        if let Some(guid) = row.guid.as_deref() {
            tokens
                .entry(guid.to_string())
                .or_insert_with(|| row.value.clone().unwrap_or_default());
        }
    }

    tracing::debug!(
        "🔖 Resolved {} tokens from {} lookup candidates (selector '{}', fallback '{}')",
        tokens.len(),
        candidates.len(),
        selector,
        fallback_selector
    );
    tokens
}

/// The winning row of every guid, ordered by collection then guid.
pub fn select_rows<'a>(
    candidates: &'a [LookupRow],
    tenant_id: i64,
    selector: &str,
    fallback_selector: &str,
) -> Vec<&'a LookupRow> {
    let mut groups: BTreeMap<(&str, &str), &LookupRow> = BTreeMap::new();

    for row in candidates {
        if !is_candidate(row, tenant_id, selector, fallback_selector) {
            continue;
        }
        let (Some(collection), Some(guid)) = (row.collection.as_deref(), row.guid.as_deref())
        else {
            continue;
        };

        groups
            .entry((collection, guid))
            .and_modify(|current| {
                if priority(row, selector, fallback_selector)
                    > priority(current, selector, fallback_selector)
                {
                    *current = row;
                }
            })
            .or_insert(row);
    }

    // 同一個 guid 可能出現在多個 collection，保留第一個
    let mut seen = HashSet::new();
    groups
        .into_iter()
        .filter(|((_, guid), _)| seen.insert(*guid))
        .map(|(_, row)| row)
        .collect()
}

fn is_candidate(row: &LookupRow, tenant_id: i64, selector: &str, fallback_selector: &str) -> bool {
    !row.is_deleted
        && row.guid.is_some()
        && row.collection.as_deref().is_some_and(|c| !c.is_empty())
        && row.tenant_id.map_or(true, |owner| owner == tenant_id)
        && selector_score(row, selector, fallback_selector) > 0
}

fn selector_score(row: &LookupRow, selector: &str, fallback_selector: &str) -> u8 {
    match row.selector.as_deref() {
        Some(s) if s == selector => 2,
        Some(s) if s == fallback_selector => 1,
        _ => 0,
    }
}

fn priority(row: &LookupRow, selector: &str, fallback_selector: &str) -> (bool, u8, i64) {
    (
        row.tenant_id.is_some(),
        selector_score(row, selector, fallback_selector),
        row.id,
    )
}
