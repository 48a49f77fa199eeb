pub mod cli;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod toml_config;

use crate::utils::error::{ExportError, Result};
use chrono::{DateTime, NaiveDate, Utc};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "pcr-export")]
#[command(about = "Export patient care reports for an agency into a spreadsheet")]
pub struct CliConfig {
    /// Agency (tenant) whose PCRs are exported
    #[arg(long)]
    pub agency_id: i64,

    /// First creation date to include (YYYY-MM-DD or RFC 3339); defaults to five days ago
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<DateTime<Utc>>,

    /// Last creation date to include (YYYY-MM-DD or RFC 3339); defaults to now
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<DateTime<Utc>>,

    /// Path to TOML configuration file
    #[arg(short, long, default_value = "pcr-export.toml")]
    pub config: String,

    /// Override load.output_path from config
    #[arg(long)]
    pub output_path: Option<String>,

    /// Override load.format from config (csv or zip)
    #[arg(long)]
    pub format: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    /// Show the resolved window and configuration without exporting
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl crate::utils::validation::Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        crate::utils::validation::validate_positive_number("agency_id", self.agency_id, 1)?;
        if let Some(format) = &self.format {
            crate::utils::validation::validate_one_of(
                "format",
                format,
                toml_config::OUTPUT_FORMATS,
            )?;
        }
        Ok(())
    }
}

/// Accepts a calendar date (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }

    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ExportError::InvalidConfigValueError {
            field: "date".to_string(),
            value: input.to_string(),
            reason: format!("expected YYYY-MM-DD or RFC 3339: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(
            parse_date("2024-03-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        assert_eq!(
            parse_date("2024-03-15T08:30:00-05:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 13, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_date("15/03/2024").is_err());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_arguments() {
        use crate::utils::validation::Validate;

        let config = CliConfig::parse_from([
            "pcr-export",
            "--agency-id",
            "42",
            "--start-date",
            "2024-03-01",
            "--format",
            "zip",
        ]);

        assert_eq!(config.agency_id, 42);
        assert!(config.start_date.is_some());
        assert!(config.end_date.is_none());
        assert_eq!(config.config, "pcr-export.toml");
        assert!(config.validate().is_ok());

        let config = CliConfig::parse_from(["pcr-export", "--agency-id", "0"]);
        assert!(config.validate().is_err());
    }
}
