use crate::domain::model::{ParsedRecord, ReportRow, ReportTable};
use serde_json::Value;
use std::collections::HashSet;

const OBJECT_SEPARATOR: &str = "|";
const ARRAY_SEPARATOR: &str = ", ";

/// Turns per-record trees into one table.
///
/// Columns are the union of top-level field names in first-seen order.
/// Each record yields one row with a cell for every column; fields the
/// record lacks render as an empty string.
pub fn flatten(records: &[ParsedRecord]) -> ReportTable {
    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for record in records {
        for key in record.tree.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .map(|record| ReportRow {
            record_id: record.id,
            cells: columns
                .iter()
                .map(|column| record.tree.get(column).map(render_cell).unwrap_or_default())
                .collect(),
        })
        .collect();

    ReportTable { columns, rows }
}

/// Renders one value as cell text.
///
/// Objects become `key:value` pairs joined by `|`, arrays their elements
/// joined by `, `. Numbers use serde_json's text form: integers are exact,
/// floats use the shortest representation that round-trips.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{}:{}", key, render_cell(value)))
            .collect::<Vec<_>>()
            .join(OBJECT_SEPARATOR),
        Value::Array(items) => items
            .iter()
            .map(render_cell)
            .collect::<Vec<_>>()
            .join(ARRAY_SEPARATOR),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: i64, value: Value) -> ParsedRecord {
        match value {
            Value::Object(tree) => ParsedRecord { id, tree },
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_columns_are_union_in_first_seen_order() {
        let records = vec![
            record(1, json!({"a": "Red", "b": 2})),
            record(2, json!({"b": 3, "c": "x"})),
        ];

        let table = flatten(&records);

        assert_eq!(table.columns, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0].record_id, 1);
        assert_eq!(table.rows[0].cells, vec!["Red", "2", ""]);
        assert_eq!(table.rows[1].cells, vec!["", "3", "x"]);
    }

    #[test]
    fn test_every_row_has_every_column() {
        let records = vec![
            record(1, json!({"a": 1})),
            record(2, json!({"b": 2})),
            record(3, json!({})),
        ];

        let table = flatten(&records);

        assert!(table.rows.iter().all(|row| row.cells.len() == table.columns.len()));
        assert_eq!(table.cell(3, "a"), Some(""));
    }

    #[test]
    fn test_nested_values_render_with_delimiters() {
        let value = json!({
            "bp": {"sys": 120, "dia": 80},
            "meds": ["Aspirin", {"name": "Saline", "ml": 250.5}],
            "ok": false,
            "gone": null
        });

        assert_eq!(
            render_cell(&value),
            "bp:sys:120|dia:80|meds:Aspirin, name:Saline|ml:250.5|ok:false|gone:"
        );
    }

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(render_cell(&json!("text")), "text");
        assert_eq!(render_cell(&json!(-7)), "-7");
        assert_eq!(render_cell(&json!(9007199254740993_i64)), "9007199254740993");
        assert_eq!(render_cell(&json!(0.1)), "0.1");
        assert_eq!(render_cell(&json!(true)), "true");
        assert_eq!(render_cell(&json!(null)), "");
        assert_eq!(render_cell(&json!([])), "");
        assert_eq!(render_cell(&json!({})), "");
    }

    #[test]
    fn test_no_records_yields_empty_table() {
        let table = flatten(&[]);
        assert!(table.columns.is_empty());
        assert!(table.rows.is_empty());
        assert!(table.is_empty());
    }
}
