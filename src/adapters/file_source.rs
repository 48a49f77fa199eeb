use crate::core::{LookupSource, RecordSource, Storage};
use crate::domain::model::{ExportWindow, LookupRow, RawRecord};
use crate::utils::error::{ExportError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// A PCR row as found in a record store dump.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(alias = "pcrId")]
    id: i64,
    #[serde(default)]
    tenant_id: Option<i64>,
    #[serde(default)]
    creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default, alias = "rawJson")]
    json_data: Option<String>,
}

impl StoredRecord {
    fn matches(&self, agency_id: i64, window: &ExportWindow) -> bool {
        !self.is_deleted
            && self.tenant_id == Some(agency_id)
            && self
                .creation_time
                .as_ref()
                .is_some_and(|created| window.contains(created))
    }
}

/// Serves records and lookup rows from JSON dump files, applying the same
/// tenant, date and deletion filters the record store query does.
#[derive(Debug, Clone)]
pub struct FileSource<S: Storage> {
    storage: S,
    records_file: String,
    lookups_file: String,
}

impl<S: Storage> FileSource<S> {
    pub fn new(storage: S, records_file: impl Into<String>, lookups_file: impl Into<String>) -> Self {
        Self {
            storage,
            records_file: records_file.into(),
            lookups_file: lookups_file.into(),
        }
    }

    async fn read_array<T: DeserializeOwned>(&self, source_name: &str, path: &str) -> Result<Vec<T>> {
        let data = self.storage.read_file(path).await.map_err(|e| {
            ExportError::source_unavailable(source_name, format!("cannot read {}: {}", path, e))
        })?;
        Ok(serde_json::from_slice(&data)?)
    }
}

#[async_trait::async_trait]
impl<S: Storage> RecordSource for FileSource<S> {
    async fn fetch_records(&self, agency_id: i64, window: &ExportWindow) -> Result<Vec<RawRecord>> {
        let stored: Vec<StoredRecord> = self.read_array("records", &self.records_file).await?;
        let total = stored.len();

        let records: Vec<RawRecord> = stored
            .into_iter()
            .filter(|record| record.matches(agency_id, window))
            .map(|record| RawRecord {
                id: record.id,
                raw_json: record.json_data,
            })
            .filter(RawRecord::has_payload)
            .collect();

        tracing::info!(
            "📂 Selected {} of {} records from {} for agency {}",
            records.len(),
            total,
            self.records_file,
            agency_id
        );
        Ok(records)
    }
}

#[async_trait::async_trait]
impl<S: Storage> LookupSource for FileSource<S> {
    async fn fetch_lookups(&self, agency_id: i64) -> Result<Vec<LookupRow>> {
        let rows: Vec<LookupRow> = self.read_array("lookups", &self.lookups_file).await?;

        Ok(rows
            .into_iter()
            .filter(|row| !row.is_deleted)
            .filter(|row| row.tenant_id.map_or(true, |owner| owner == agency_id))
            .collect())
    }
}
