use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use pcr_export::adapters::{ApiSource, CsvReportSink, OutputFormat};
use pcr_export::config::lambda::{LambdaConfig, S3Storage};
use pcr_export::config::parse_date;
use pcr_export::utils::{logger, validation::Validate};
use pcr_export::{ExportEngine, PcrExporter};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct Request {
    pub agency_id: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
pub struct Response {
    pub message: String,
    pub output_path: String,
    pub content_type: String,
    pub rows: usize,
    pub columns: usize,
}

fn boxed(e: pcr_export::ExportError) -> Error {
    Box::new(e)
}

async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    let request = event.payload;
    tracing::info!("Starting PCR export for agency {}", request.agency_id);

    let start = request.start_date.as_deref().map(parse_date).transpose().map_err(boxed)?;
    let end = request.end_date.as_deref().map(parse_date).transpose().map_err(boxed)?;

    let lambda_config = LambdaConfig::from_env().map_err(boxed)?;
    lambda_config.validate().map_err(boxed)?;

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .region(Region::new(lambda_config.s3_region.clone()))
        .force_path_style(true)
        .build();
    let storage = S3Storage::new(
        S3Client::from_conf(s3_config),
        lambda_config.s3_bucket.clone(),
        lambda_config.s3_prefix.clone(),
    );
    let location = format!("s3://{}/{}", lambda_config.s3_bucket, lambda_config.s3_prefix);

    let source = ApiSource::new(lambda_config.api_endpoint.clone());
    let exporter = PcrExporter::new(source.clone(), source, lambda_config);
    let sink = CsvReportSink::new(storage, location, OutputFormat::Zip);

    let engine = ExportEngine::new(exporter, sink);
    let outcome = engine.run(request.agency_id, start, end).await.map_err(boxed)?;

    tracing::info!("PCR export completed: {}", outcome.location);
    Ok(Response {
        message: "PCR export completed successfully".to_string(),
        output_path: outcome.location,
        content_type: outcome.content_type.to_string(),
        rows: outcome.rows,
        columns: outcome.columns,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();
    run(service_fn(function_handler)).await
}
