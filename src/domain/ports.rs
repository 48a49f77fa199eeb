use crate::domain::model::{ExportReport, ExportWindow, LookupRow, RawRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Settings that shape one export: the allow-list and the lookup selectors.
pub trait ExportSettings: Send + Sync {
    fn fields_to_export(&self) -> &[String];
    fn selector(&self) -> &str;
    fn state_code(&self) -> &str;
    fn default_window_days(&self) -> i64;
}

/// Record store access for PCR payloads.
///
/// Implementations return only non-deleted records of `agency_id` created
/// inside `window` whose payload is non-blank.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self, agency_id: i64, window: &ExportWindow) -> Result<Vec<RawRecord>>;
}

/// Record store access for lookup (dropdown option) rows.
///
/// Implementations return every non-deleted row visible to `agency_id`,
/// tenant-specific and global, duplicates included.
#[async_trait]
pub trait LookupSource: Send + Sync {
    async fn fetch_lookups(&self, agency_id: i64) -> Result<Vec<LookupRow>>;
}

/// Final destination of a finished report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Serializes the report and returns where it was written.
    async fn write_report(&self, report: &ExportReport) -> Result<String>;

    fn content_type(&self) -> &'static str;
}

/// One export request, end to end up to the finished table.
#[async_trait]
pub trait ExportPipeline: Send + Sync {
    async fn export(
        &self,
        agency_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<ExportReport>;
}
