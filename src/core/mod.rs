pub mod etl;
pub mod export;
pub mod field_filter;
pub mod flatten;
pub mod lookup;
pub mod substitute;

pub use crate::domain::model::{ExportReport, ParsedRecord, RawRecord, ReportTable, TokenMap};
pub use crate::domain::ports::{
    ExportPipeline, ExportSettings, LookupSource, RecordSource, ReportSink, Storage,
};
pub use crate::utils::error::Result;
