use crate::core::{ExportPipeline, ReportSink};
use crate::domain::model::ExportStats;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::{DateTime, Utc};

/// Where a finished export ended up.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub location: String,
    pub content_type: &'static str,
    pub columns: usize,
    pub rows: usize,
    pub stats: ExportStats,
}

/// Runs one export and hands the table to a sink.
pub struct ExportEngine<P: ExportPipeline, K: ReportSink> {
    pipeline: P,
    sink: K,
    monitor: SystemMonitor,
}

impl<P: ExportPipeline, K: ReportSink> ExportEngine<P, K> {
    pub fn new(pipeline: P, sink: K) -> Self {
        Self::new_with_monitoring(pipeline, sink, false)
    }

    pub fn new_with_monitoring(pipeline: P, sink: K, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            sink,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(
        &self,
        agency_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<ExportOutcome> {
        tracing::info!("🚀 Starting PCR export for agency {}", agency_id);
        self.monitor.log_stats("Start");

        let report = self.pipeline.export(agency_id, start, end).await?;
        self.monitor.log_stats("Export");

        // 整份表格完成後才寫出，不會留下部分結果
        let location = self.sink.write_report(&report).await?;
        self.monitor.log_stats("Write");
        self.monitor.log_final_stats();

        tracing::info!(
            "✅ Wrote {} rows x {} columns to {}",
            report.table.rows.len(),
            report.table.columns.len(),
            location
        );

        Ok(ExportOutcome {
            location,
            content_type: self.sink.content_type(),
            columns: report.table.columns.len(),
            rows: report.table.rows.len(),
            stats: report.stats,
        })
    }
}
