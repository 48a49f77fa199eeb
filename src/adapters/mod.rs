// Adapters layer: concrete record store clients and report writers.

pub mod api_source;
pub mod file_source;
pub mod report_sink;

pub use api_source::ApiSource;
pub use file_source::FileSource;
pub use report_sink::{CsvReportSink, OutputFormat};
