use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Source '{source_name}' unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Export cancelled before completion")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Io,
    Config,
    Processing,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExportError {
    pub fn source_unavailable(source_name: &str, message: impl Into<String>) -> Self {
        ExportError::SourceUnavailable {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::ApiError(_) | ExportError::SourceUnavailable { .. } => {
                ErrorCategory::Source
            }
            ExportError::IoError(_) => ErrorCategory::Io,
            ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. }
            | ExportError::MissingConfigError { .. } => ErrorCategory::Config,
            ExportError::SerializationError(_)
            | ExportError::ProcessingError { .. }
            | ExportError::Cancelled => ErrorCategory::Processing,
            ExportError::ZipError(_) | ExportError::CsvError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExportError::Cancelled => ErrorSeverity::Low,
            // 資料來源可能只是暫時無法連線
            ExportError::ApiError(_) | ExportError::SourceUnavailable { .. } => {
                ErrorSeverity::Medium
            }
            ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. }
            | ExportError::MissingConfigError { .. }
            | ExportError::SerializationError(_)
            | ExportError::ProcessingError { .. } => ErrorSeverity::High,
            ExportError::IoError(_) | ExportError::ZipError(_) | ExportError::CsvError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// Process exit code for the CLI. Every failure, including an
    /// interrupted export, exits non-zero since no report was written.
    pub fn exit_code(&self) -> i32 {
        match self {
            // 與 shell 的 SIGINT 慣例一致 (128 + 2)
            ExportError::Cancelled => 130,
            _ => match self.severity() {
                ErrorSeverity::Low | ErrorSeverity::High => 1,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::Critical => 3,
            },
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Source => {
                "Check that the record store endpoint is reachable and retry the export"
            }
            ErrorCategory::Io => "Check file permissions and available disk space",
            ErrorCategory::Config => "Review the configuration file and command line arguments",
            ErrorCategory::Processing => "Re-run the export with --verbose for details",
            ErrorCategory::Output => "Check the output path and format settings",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ExportError::SourceUnavailable { source_name, .. } => {
                format!("Could not read from the {} source", source_name)
            }
            ExportError::ApiError(_) => "The record store did not respond".to_string(),
            ExportError::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            ExportError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            ExportError::Cancelled => "Export was cancelled".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_errors_are_retryable_severity() {
        let err = ExportError::source_unavailable("records", "connection refused");
        assert_eq!(err.category(), ErrorCategory::Source);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.user_friendly_message(), "Could not read from the records source");
    }

    #[test]
    fn test_config_errors() {
        let err = ExportError::MissingConfigError {
            field: "S3_BUCKET".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Config);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.to_string().contains("S3_BUCKET"));
    }

    #[test]
    fn test_every_failure_exits_non_zero() {
        assert_eq!(ExportError::Cancelled.exit_code(), 130);
        assert_eq!(
            ExportError::source_unavailable("lookups", "timeout").exit_code(),
            2
        );
        assert_eq!(
            ExportError::ProcessingError {
                message: "bad".to_string()
            }
            .exit_code(),
            1
        );
        assert_eq!(
            ExportError::IoError(std::io::Error::other("disk full")).exit_code(),
            3
        );
    }
}
