use chrono::Utc;
use clap::Parser;
use pcr_export::adapters::{ApiSource, CsvReportSink, FileSource, OutputFormat};
use pcr_export::core::{LookupSource, RecordSource, ReportSink};
use pcr_export::utils::{logger, validation::Validate};
use pcr_export::{
    CliConfig, ExportConfig, ExportEngine, ExportError, ExportOutcome, ExportWindow, LocalStorage,
    PcrExporter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting pcr-export");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if args.dry_run {
        display_dry_run(&args, &config)?;
        return Ok(());
    }

    let monitor_enabled = args.monitor || config.monitoring_enabled();
    let format: OutputFormat = config.load.format.parse()?;
    let storage = LocalStorage::new(config.output_path());
    let sink = CsvReportSink::new(storage, config.output_path(), format)
        .with_filename_template(config.filename_template());

    let result = if config.is_api_source() {
        let source = ApiSource::from_config(&config.source)?;
        run_export(&args, source.clone(), source, config, sink, monitor_enabled).await
    } else {
        let data_storage = LocalStorage::new(config.source.data_path.as_deref().unwrap_or("."));
        let source = FileSource::new(
            data_storage,
            config.source.records_file.clone().unwrap_or_default(),
            config.source.lookups_file.clone().unwrap_or_default(),
        );
        run_export(&args, source.clone(), source, config, sink, monitor_enabled).await
    };

    match result {
        Ok(outcome) => {
            tracing::info!(
                "📊 {} records fetched, {} exported, {} dropped",
                outcome.stats.records_fetched,
                outcome.rows,
                outcome.stats.dropped_unparseable + outcome.stats.dropped_non_object
            );
            println!("✅ Report generated successfully!");
            println!("📁 Saved as: {}", outcome.location);
        }
        Err(e) => {
            tracing::error!(
                "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn load_config(args: &CliConfig) -> pcr_export::Result<ExportConfig> {
    args.validate()?;

    let mut config = ExportConfig::from_file(&args.config)?;

    // 應用命令列覆蓋設定
    if let Some(output_path) = &args.output_path {
        config.load.output_path = output_path.clone();
    }
    if let Some(format) = &args.format {
        config.load.format = format.clone();
    }

    config.validate()?;
    tracing::info!("✅ Configuration loaded and validated successfully");
    Ok(config)
}

async fn run_export<R, L, K>(
    args: &CliConfig,
    records: R,
    lookups: L,
    config: ExportConfig,
    sink: K,
    monitor_enabled: bool,
) -> pcr_export::Result<ExportOutcome>
where
    R: RecordSource,
    L: LookupSource,
    K: ReportSink,
{
    let exporter = PcrExporter::new(records, lookups, config);
    let engine = ExportEngine::new_with_monitoring(exporter, sink, monitor_enabled);

    // Ctrl-C 時放棄整個匯出，不寫出任何檔案
    tokio::select! {
        outcome = engine.run(args.agency_id, args.start_date, args.end_date) => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("🛑 Interrupted, no report written");
            Err(ExportError::Cancelled)
        }
    }
}

fn display_dry_run(args: &CliConfig, config: &ExportConfig) -> pcr_export::Result<()> {
    let window = ExportWindow::resolve(
        args.start_date,
        args.end_date,
        Utc::now(),
        config.export.default_window_days,
    )?;

    tracing::info!("🔍 DRY RUN MODE - nothing will be fetched or written");
    println!("Agency:        {}", args.agency_id);
    println!("Window:        {} -> {}", window.start.to_rfc3339(), window.end.to_rfc3339());
    println!("Source:        {}", config.source.r#type);
    if let Some(endpoint) = &config.source.endpoint {
        println!("Endpoint:      {}", endpoint);
    }
    println!("Fields:        {}", config.export.fields_to_export.join(", "));
    println!("Selector:      {} (fallback {})", config.export.selector, config.export.state_code);
    println!("Output:        {} ({})", config.output_path(), config.load.format);
    Ok(())
}
