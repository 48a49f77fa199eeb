use crate::core::{field_filter, flatten, lookup, substitute};
use crate::domain::model::{
    ExportReport, ExportStats, ExportWindow, ParsedRecord, RawRecord, TokenMap,
};
use crate::domain::ports::{ExportPipeline, ExportSettings, LookupSource, RecordSource};
use crate::utils::error::{ExportError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;

pub const DEFAULT_SELECTOR: &str = "Default";
pub const DEFAULT_WINDOW_DAYS: i64 = 5;
/// Upper bound accepted for `default_window_days` (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Plain in-memory settings, for callers that do not load a config file.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub fields_to_export: Vec<String>,
    pub selector: String,
    pub state_code: String,
    pub default_window_days: i64,
}

impl ExportOptions {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields_to_export: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_selectors(mut self, selector: &str, state_code: &str) -> Self {
        self.selector = selector.to_string();
        self.state_code = state_code.to_string();
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fields_to_export: Vec::new(),
            selector: DEFAULT_SELECTOR.to_string(),
            state_code: DEFAULT_SELECTOR.to_string(),
            default_window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl ExportSettings for ExportOptions {
    fn fields_to_export(&self) -> &[String] {
        &self.fields_to_export
    }

    fn selector(&self) -> &str {
        &self.selector
    }

    fn state_code(&self) -> &str {
        &self.state_code
    }

    fn default_window_days(&self) -> i64 {
        self.default_window_days
    }
}

/// Runs fetch, parse, resolve, filter, substitute and flatten for one agency.
pub struct PcrExporter<R: RecordSource, L: LookupSource, C: ExportSettings> {
    records: R,
    lookups: L,
    settings: C,
}

impl<R: RecordSource, L: LookupSource, C: ExportSettings> PcrExporter<R, L, C> {
    pub fn new(records: R, lookups: L, settings: C) -> Self {
        Self {
            records,
            lookups,
            settings,
        }
    }

    pub fn settings(&self) -> &C {
        &self.settings
    }

    pub fn resolve_window(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<ExportWindow> {
        ExportWindow::resolve(start, end, Utc::now(), self.settings.default_window_days())
    }

    pub async fn export_window(&self, agency_id: i64, window: ExportWindow) -> Result<ExportReport> {
        tracing::info!(
            "📥 Exporting PCRs for agency {} from {} to {}",
            agency_id,
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        );

        // 兩個來源互不相依，可同時讀取
        let (raw_records, candidates) = tokio::try_join!(
            self.records.fetch_records(agency_id, &window),
            self.lookups.fetch_lookups(agency_id),
        )?;

        let mut stats = ExportStats {
            records_fetched: raw_records.len(),
            lookup_candidates: candidates.len(),
            ..ExportStats::default()
        };

        let parsed = parse_records(raw_records, &mut stats);
        tracing::info!(
            "📄 Parsed {}/{} records ({} unparseable, {} non-object)",
            stats.records_parsed,
            stats.records_fetched,
            stats.dropped_unparseable,
            stats.dropped_non_object
        );

        let tokens = lookup::resolve(
            &candidates,
            agency_id,
            self.settings.selector(),
            self.settings.state_code(),
        );
        stats.tokens_resolved = tokens.len();

        let allowed: HashSet<String> = self.settings.fields_to_export().iter().cloned().collect();
        let prepared = prepare_records(parsed, &allowed, &tokens);
        let table = flatten::flatten(&prepared);

        tracing::info!(
            "📊 Built table with {} columns and {} rows",
            table.columns.len(),
            table.rows.len()
        );

        Ok(ExportReport {
            agency_id,
            window,
            table,
            stats,
        })
    }

    /// Same as [`ExportPipeline::export`], abandoned as soon as `cancel`
    /// completes. A cancelled export never yields a partial table.
    pub async fn export_until<F>(
        &self,
        agency_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        cancel: F,
    ) -> Result<ExportReport>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                tracing::warn!("🛑 Export for agency {} cancelled", agency_id);
                Err(ExportError::Cancelled)
            }
            report = self.export(agency_id, start, end) => report,
        }
    }
}

#[async_trait::async_trait]
impl<R: RecordSource, L: LookupSource, C: ExportSettings> ExportPipeline for PcrExporter<R, L, C> {
    async fn export(
        &self,
        agency_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<ExportReport> {
        let window = self.resolve_window(start, end)?;
        self.export_window(agency_id, window).await
    }
}

/// Parses payloads into object trees. Blank, unparseable and non-object
/// payloads are dropped and counted; they never fail the batch.
pub fn parse_records(raw_records: Vec<RawRecord>, stats: &mut ExportStats) -> Vec<ParsedRecord> {
    let mut parsed = Vec::with_capacity(raw_records.len());

    for record in raw_records {
        let Some(json) = record.raw_json.as_deref().filter(|j| !j.trim().is_empty()) else {
            tracing::debug!("Skipping record {} with blank payload", record.id);
            continue;
        };

        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(tree)) => parsed.push(ParsedRecord {
                id: record.id,
                tree,
            }),
            Ok(_) => {
                stats.dropped_non_object += 1;
                tracing::warn!("⚠️ Record {} payload is not a JSON object, skipped", record.id);
            }
            Err(e) => {
                stats.dropped_unparseable += 1;
                tracing::warn!("⚠️ Record {} payload failed to parse: {}", record.id, e);
            }
        }
    }

    stats.records_parsed = parsed.len();
    parsed
}

/// Applies the allow-list then token substitution to every record.
pub fn prepare_records(
    records: Vec<ParsedRecord>,
    allowed: &HashSet<String>,
    tokens: &TokenMap,
) -> Vec<ParsedRecord> {
    records
        .into_iter()
        .map(|record| {
            let filtered = field_filter::filter_fields(&record.tree, allowed);
            ParsedRecord {
                id: record.id,
                tree: substitute::substitute_object(&filtered, tokens),
            }
        })
        .collect()
}
