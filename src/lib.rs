pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::ExportConfig};

#[cfg(feature = "lambda")]
pub use config::lambda::{LambdaConfig, S3Storage};

pub use core::{
    etl::{ExportEngine, ExportOutcome},
    export::{ExportOptions, PcrExporter},
};
pub use domain::model::{ExportReport, ExportWindow, LookupRow, RawRecord, ReportTable};
pub use utils::error::{ExportError, Result};
