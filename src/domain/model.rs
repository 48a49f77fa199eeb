use crate::utils::error::{ExportError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One PCR payload as handed over by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(alias = "pcrId")]
    pub id: i64,
    #[serde(default, alias = "jsonData")]
    pub raw_json: Option<String>,
}

impl RawRecord {
    pub fn new(id: i64, raw_json: impl Into<String>) -> Self {
        Self {
            id,
            raw_json: Some(raw_json.into()),
        }
    }

    /// Absent and whitespace-only payloads are never parsed.
    pub fn has_payload(&self) -> bool {
        self.raw_json
            .as_deref()
            .map(|json| !json.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Top-level shape of every payload that survives parsing.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// A record whose payload parsed into a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub id: i64,
    pub tree: JsonObject,
}

/// One candidate label for a token, scoped by tenant and selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRow {
    pub id: i64,
    #[serde(default)]
    pub tenant_id: Option<i64>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

/// guid -> resolved label, built fresh for every export.
pub type TokenMap = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub record_id: i64,
    /// One cell per column of the owning table, in column order.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Looks up the cell of `record_id` under `column`.
    pub fn cell(&self, record_id: i64, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row.record_id == record_id)
            .and_then(|row| row.cells.get(index))
            .map(String::as_str)
    }
}

/// Creation-time range of the records to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ExportWindow {
    /// Fills in omitted bounds only: start defaults to `now - default_days`,
    /// end defaults to `now`. Explicit bounds are kept as given, even when
    /// start is after end.
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        default_days: i64,
    ) -> Result<Self> {
        let start = match start {
            Some(start) => start,
            None => Duration::try_days(default_days)
                .and_then(|days| now.checked_sub_signed(days))
                .ok_or_else(|| ExportError::InvalidConfigValueError {
                    field: "default_window_days".to_string(),
                    value: default_days.to_string(),
                    reason: "Window start is out of the supported date range".to_string(),
                })?,
        };

        Ok(Self {
            start,
            end: end.unwrap_or(now),
        })
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub records_fetched: usize,
    pub records_parsed: usize,
    pub dropped_unparseable: usize,
    pub dropped_non_object: usize,
    pub lookup_candidates: usize,
    pub tokens_resolved: usize,
}

/// The complete result of one export request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub agency_id: i64,
    pub window: ExportWindow,
    pub table: ReportTable,
    pub stats: ExportStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_defaults_only_missing_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let window = ExportWindow::resolve(None, None, now, 5).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 5, 5, 12, 0, 0).unwrap());
        assert_eq!(window.end, now);

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let window = ExportWindow::resolve(Some(start), None, now, 5).unwrap();
        assert_eq!(window.start, start);
        assert_eq!(window.end, now);
    }

    #[test]
    fn test_window_keeps_inverted_range() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let window = ExportWindow::resolve(Some(start), Some(end), now, 5).unwrap();
        assert_eq!(window.start, start);
        assert_eq!(window.end, end);
        assert!(!window.contains(&now));
    }

    #[test]
    fn test_window_default_out_of_range_is_config_error() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();

        let err = ExportWindow::resolve(None, None, now, 1_000_000_000).unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfigValueError { .. }));

        let err = ExportWindow::resolve(None, None, now, i64::MAX).unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfigValueError { .. }));

        // 已指定起始日時不需要計算預設值
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(ExportWindow::resolve(Some(start), None, now, i64::MAX).is_ok());
    }

    #[test]
    fn test_raw_record_payload_detection() {
        assert!(RawRecord::new(1, "{}").has_payload());
        assert!(!RawRecord::new(2, "   ").has_payload());
        assert!(!RawRecord { id: 3, raw_json: None }.has_payload());
    }

    #[test]
    fn test_raw_record_accepts_store_field_names() {
        let record: RawRecord =
            serde_json::from_str(r#"{"pcrId": 7, "jsonData": "{\"a\":1}"}"#).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.raw_json.as_deref(), Some("{\"a\":1}"));
    }
}
