use crate::core::export::{DEFAULT_SELECTOR, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::core::{ExportSettings, Storage};
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_number_range, validate_url, Validate,
};
use aws_sdk_s3::Client as S3Client;
use std::env;

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub api_endpoint: String,
    pub s3_bucket: String,
    pub s3_prefix: String,
    pub s3_region: String,
    pub fields_to_export: Vec<String>,
    pub selector: String,
    pub state_code: String,
    pub default_window_days: i64,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_endpoint: env::var("API_ENDPOINT").map_err(|_| ExportError::MissingConfigError {
                field: "API_ENDPOINT".to_string(),
            })?,
            s3_bucket: env::var("S3_BUCKET").map_err(|_| ExportError::MissingConfigError {
                field: "S3_BUCKET".to_string(),
            })?,
            s3_prefix: env::var("S3_PREFIX").unwrap_or_else(|_| "pcr-reports".to_string()),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            fields_to_export: parse_field_list(&env::var("FIELDS_TO_EXPORT").unwrap_or_default()),
            selector: env::var("SELECTOR").unwrap_or_else(|_| DEFAULT_SELECTOR.to_string()),
            state_code: env::var("STATE_CODE").unwrap_or_else(|_| DEFAULT_SELECTOR.to_string()),
            default_window_days: env::var("DEFAULT_WINDOW_DAYS")
                .ok()
                .and_then(|days| days.parse().ok())
                .unwrap_or(DEFAULT_WINDOW_DAYS),
        })
    }
}

/// Splits a comma separated field list, dropping blanks.
pub fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

impl ExportSettings for LambdaConfig {
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

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_url("API_ENDPOINT", &self.api_endpoint)?;
        validate_s3_bucket_name("S3_BUCKET", &self.s3_bucket)?;
        validate_non_empty_string("S3_PREFIX", &self.s3_prefix)?;
        validate_aws_region("S3_REGION", &self.s3_region)?;
        validate_number_range(
            "DEFAULT_WINDOW_DAYS",
            self.default_window_days,
            0,
            MAX_WINDOW_DAYS,
        )?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    let reason = if bucket_name.len() < 3 || bucket_name.len() > 63 {
        Some("S3 bucket name must be between 3 and 63 characters")
    } else if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        Some("S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots")
    } else if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        Some("S3 bucket name cannot start or end with a hyphen")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ExportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ExportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "AWS region can only contain lowercase letters, numbers, and hyphens"
                .to_string(),
        });
    }

    Ok(())
}

/// Storage backed by an S3 bucket; paths are keys under `prefix`.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String, prefix: String) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }

    pub fn key(&self, path: &str) -> String {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", prefix, path)
        }
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(path))
            .send()
            .await
            .map_err(|e| ExportError::source_unavailable("s3", format!("read failed: {}", e)))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| ExportError::source_unavailable("s3", format!("read failed: {}", e)))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(path))
            .body(data.to_vec().into())
            .send()
            .await
            .map_err(|e| ExportError::ProcessingError {
                message: format!("Failed to write to S3: {}", e.into_service_error()),
            })?;

        Ok(())
    }
}
