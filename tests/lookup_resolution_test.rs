use pcr_export::core::{field_filter, flatten, lookup, substitute};
use pcr_export::domain::model::ParsedRecord;
use pcr_export::LookupRow;
use std::collections::HashSet;

fn option(id: i64, tenant: Option<i64>, selector: &str, collection: &str, guid: &str, value: Option<&str>) -> LookupRow {
    LookupRow {
        id,
        tenant_id: tenant,
        selector: Some(selector.to_string()),
        guid: Some(guid.to_string()),
        value: value.map(str::to_string),
        collection: Some(collection.to_string()),
        is_deleted: false,
    }
}

/// 模擬同一個 guid 在多個範圍內都有定義的情況
fn overlapping_rows() -> Vec<LookupRow> {
    vec![
        option(1, None, "Default", "Route", "R-IV", Some("IV")),
        option(2, None, "TX", "Route", "R-IV", Some("Intravenous (TX)")),
        option(3, Some(42), "Default", "Route", "R-IV", Some("IV line")),
        option(4, Some(42), "TX", "Route", "R-IV", Some("IV line (TX)")),
        option(5, Some(7), "TX", "Route", "R-IV", Some("Other agency")),
        option(6, None, "Default", "Route", "R-PO", Some("By mouth")),
        option(7, None, "Default", "Route", "R-PO", Some("Oral")),
        option(8, None, "TX", "Route", "R-IM", None),
    ]
}

#[test]
fn test_most_specific_scope_wins() {
    let tokens = lookup::resolve(&overlapping_rows(), 42, "TX", "Default");

    assert_eq!(tokens["R-IV"], "IV line (TX)");
    assert_eq!(tokens["R-PO"], "Oral");
    assert_eq!(tokens["R-IM"], "");
}

#[test]
fn test_other_tenant_sees_global_rows() {
    let tokens = lookup::resolve(&overlapping_rows(), 99, "TX", "Default");

    assert_eq!(tokens["R-IV"], "Intravenous (TX)");
}

#[test]
fn test_insertion_order_does_not_matter() {
    let mut reversed = overlapping_rows();
    reversed.reverse();

    assert_eq!(
        lookup::resolve(&overlapping_rows(), 42, "TX", "Default"),
        lookup::resolve(&reversed, 42, "TX", "Default")
    );
}

#[test]
fn test_selected_rows_are_ordered_by_collection() {
    let mut rows = overlapping_rows();
    rows.push(option(9, None, "Default", "Avpu", "A-ALERT", Some("Alert")));

    let selected = lookup::select_rows(&rows, 42, "TX", "Default");
    let collections: Vec<&str> = selected
        .iter()
        .filter_map(|row| row.collection.as_deref())
        .collect();

    assert_eq!(collections, vec!["Avpu", "Route", "Route", "Route"]);
}

#[test]
fn test_filter_substitute_flatten_chain() {
    let tokens = lookup::resolve(&overlapping_rows(), 42, "TX", "Default");
    let allowed: HashSet<String> = ["route", "doses"].iter().map(|s| s.to_string()).collect();

    let raw = serde_json::json!({
        "route": "R-IV",
        "doses": [{"route": "R-PO", "mg": 2.5}, {"route": "R-IM", "mg": 10}],
        "dropped": "R-IV"
    });
    let tree = raw.as_object().cloned().unwrap();

    let filtered = field_filter::filter_fields(&tree, &allowed);
    let substituted = substitute::substitute_object(&filtered, &tokens);
    let table = flatten::flatten(&[ParsedRecord { id: 1, tree: substituted }]);

    assert_eq!(table.columns, vec!["route", "doses"]);
    assert_eq!(
        table.rows[0].cells,
        vec!["IV line (TX)", "route:Oral|mg:2.5, route:|mg:10"]
    );
}
