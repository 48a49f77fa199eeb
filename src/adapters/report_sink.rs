use crate::config::toml_config::DEFAULT_FILENAME;
use crate::core::{ReportSink, Storage};
use crate::domain::model::{ExportReport, ReportTable};
use crate::utils::error::{ExportError, Result};
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const SHEET_NAME: &str = "PCRs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Zip,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Zip => "zip",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "text/csv",
            OutputFormat::Zip => "application/zip",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "zip" => Ok(OutputFormat::Zip),
            other => Err(ExportError::InvalidConfigValueError {
                field: "load.format".to_string(),
                value: other.to_string(),
                reason: "Supported values: csv, zip".to_string(),
            }),
        }
    }
}

#[derive(Serialize)]
struct ReportMetadata<'a> {
    sheet: &'a str,
    agency_id: i64,
    start: String,
    end: String,
    columns: usize,
    rows: usize,
    stats: &'a crate::domain::model::ExportStats,
    generated_at: String,
}

/// Writes the report as a CSV sheet, optionally zipped with a metadata file.
#[derive(Debug, Clone)]
pub struct CsvReportSink<S: Storage> {
    storage: S,
    location: String,
    format: OutputFormat,
    filename_template: String,
}

impl<S: Storage> CsvReportSink<S> {
    /// `location` is only used to describe where `storage` writes.
    pub fn new(storage: S, location: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            storage,
            location: location.into(),
            format,
            filename_template: DEFAULT_FILENAME.to_string(),
        }
    }

    pub fn with_filename_template(mut self, template: &str) -> Self {
        self.filename_template = template.to_string();
        self
    }

    pub fn file_name(&self, report: &ExportReport) -> String {
        let stem = self
            .filename_template
            .replace("{agency_id}", &report.agency_id.to_string())
            .replace("{start}", &report.window.start.format("%Y%m%d").to_string())
            .replace("{end}", &report.window.end.format("%Y%m%d").to_string())
            .replace(
                "{timestamp}",
                &chrono::Utc::now().format("%Y%m%d%H%M%S").to_string(),
            );
        format!("{}.{}", stem, self.format.extension())
    }

    fn build_zip(&self, report: &ExportReport, sheet: &[u8]) -> Result<Vec<u8>> {
        let metadata = ReportMetadata {
            sheet: SHEET_NAME,
            agency_id: report.agency_id,
            start: report.window.start.to_rfc3339(),
            end: report.window.end.to_rfc3339(),
            columns: report.table.columns.len(),
            rows: report.table.rows.len(),
            stats: &report.stats,
            generated_at: chrono::Utc::now().to_rfc3339(),
        };

        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        zip.start_file(format!("{}.csv", SHEET_NAME), file_options())?;
        zip.write_all(sheet)?;

        zip.start_file("metadata.json", file_options())?;
        zip.write_all(serde_json::to_string_pretty(&metadata)?.as_bytes())?;

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
}

/// Serializes the table as CSV: a header row, then one line per record.
/// A table without columns produces no output at all.
pub fn table_to_csv(table: &ReportTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if !table.columns.is_empty() {
        writer.write_record(&table.columns)?;
        for row in &table.rows {
            writer.write_record(&row.cells)?;
        }
    }

    writer.into_inner().map_err(|e| ExportError::ProcessingError {
        message: format!("Failed to flush CSV output: {}", e),
    })
}

#[async_trait::async_trait]
impl<S: Storage> ReportSink for CsvReportSink<S> {
    async fn write_report(&self, report: &ExportReport) -> Result<String> {
        let sheet = table_to_csv(&report.table)?;
        let data = match self.format {
            OutputFormat::Csv => sheet,
            OutputFormat::Zip => self.build_zip(report, &sheet)?,
        };

        let file_name = self.file_name(report);
        tracing::debug!("💾 Writing {} ({} bytes)", file_name, data.len());
        self.storage.write_file(&file_name, &data).await?;

        Ok(format!("{}/{}", self.location.trim_end_matches('/'), file_name))
    }

    fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ExportStats, ExportWindow, ReportRow};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.get_file(path).await.ok_or_else(|| {
                ExportError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn report(table: ReportTable) -> ExportReport {
        ExportReport {
            agency_id: 42,
            window: ExportWindow {
                start: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(),
            },
            table,
            stats: ExportStats::default(),
        }
    }

    fn sample_table() -> ReportTable {
        ReportTable {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![
                ReportRow {
                    record_id: 1,
                    cells: vec!["Red".to_string(), "x:1|y:2".to_string()],
                },
                ReportRow {
                    record_id: 2,
                    cells: vec!["".to_string(), "Aspirin, Saline".to_string()],
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_csv_output() {
        let storage = MockStorage::default();
        let sink = CsvReportSink::new(storage.clone(), "./reports/", OutputFormat::Csv);

        let location = sink.write_report(&report(sample_table())).await.unwrap();

        assert_eq!(location, "./reports/PCR_Report_42_From_20240301_To_20240331.csv");
        assert_eq!(sink.content_type(), "text/csv");
        let data = storage
            .get_file("PCR_Report_42_From_20240301_To_20240331.csv")
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(data).unwrap(),
            "a,b\nRed,x:1|y:2\n,\"Aspirin, Saline\"\n"
        );
    }

    #[tokio::test]
    async fn test_zip_output_contains_sheet_and_metadata() {
        let storage = MockStorage::default();
        let sink = CsvReportSink::new(storage.clone(), "out", OutputFormat::Zip)
            .with_filename_template("report_{agency_id}");

        let location = sink.write_report(&report(sample_table())).await.unwrap();
        assert_eq!(location, "out/report_42.zip");
        assert_eq!(sink.content_type(), "application/zip");

        let zip_bytes = storage.get_file("report_42.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["PCRs.csv", "metadata.json"]);

        let mut metadata = String::new();
        archive
            .by_name("metadata.json")
            .unwrap()
            .read_to_string(&mut metadata)
            .unwrap();
        let metadata: serde_json::Value = serde_json::from_str(&metadata).unwrap();
        assert_eq!(metadata["agency_id"], 42);
        assert_eq!(metadata["rows"], 2);
    }

    #[test]
    fn test_empty_table_writes_nothing() {
        assert!(table_to_csv(&ReportTable::default()).unwrap().is_empty());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("zip".parse::<OutputFormat>().unwrap(), OutputFormat::Zip);
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }
}
