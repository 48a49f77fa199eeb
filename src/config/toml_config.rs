use crate::core::export::{DEFAULT_SELECTOR, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::core::ExportSettings;
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

pub const SOURCE_TYPES: &[&str] = &["api", "file"];
pub const OUTPUT_FORMATS: &[&str] = &["csv", "zip"];
pub const DEFAULT_FILENAME: &str = "PCR_Report_{agency_id}_From_{start}_To_{end}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub export: ExportSection,
    pub source: SourceConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSection {
    #[serde(default)]
    pub fields_to_export: Vec<String>,
    #[serde(default = "default_selector")]
    pub selector: String,
    #[serde(default = "default_selector")]
    pub state_code: String,
    #[serde(default = "default_window_days")]
    pub default_window_days: i64,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            fields_to_export: Vec::new(),
            selector: default_selector(),
            state_code: default_selector(),
            default_window_days: default_window_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub r#type: String,
    pub endpoint: Option<String>,
    pub records_path: Option<String>,
    pub lookups_path: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
    pub data_path: Option<String>,
    pub records_file: Option<String>,
    pub lookups_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_format")]
    pub format: String,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_selector() -> String {
    DEFAULT_SELECTOR.to_string()
}

fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS
}

fn default_format() -> String {
    "csv".to_string()
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"))
}

impl ExportConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ExportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PCR_API_TOKEN})，找不到的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn is_api_source(&self) -> bool {
        self.source.r#type == "api"
    }

    pub fn output_path(&self) -> &str {
        &self.load.output_path
    }

    pub fn filename_template(&self) -> &str {
        self.load.filename.as_deref().unwrap_or(DEFAULT_FILENAME)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_one_of("source.type", &self.source.r#type, SOURCE_TYPES)?;

        if self.is_api_source() {
            let endpoint = validation::validate_required_field("source.endpoint", &self.source.endpoint)?;
            validation::validate_url("source.endpoint", endpoint)?;
        } else {
            let records = validation::validate_required_field("source.records_file", &self.source.records_file)?;
            validation::validate_file_extension("source.records_file", records, &["json"])?;
            let lookups = validation::validate_required_field("source.lookups_file", &self.source.lookups_file)?;
            validation::validate_file_extension("source.lookups_file", lookups, &["json"])?;
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_one_of("load.format", &self.load.format, OUTPUT_FORMATS)?;
        validation::validate_non_empty_string("export.selector", &self.export.selector)?;
        validation::validate_non_empty_string("export.state_code", &self.export.state_code)?;
        validation::validate_number_range(
            "export.default_window_days",
            self.export.default_window_days,
            0,
            MAX_WINDOW_DAYS,
        )?;

        if self.export.fields_to_export.is_empty() {
            tracing::warn!("⚠️ export.fields_to_export is empty, the report will have no columns");
        }

        Ok(())
    }
}

impl ExportSettings for ExportConfig {
    fn fields_to_export(&self) -> &[String] {
        &self.export.fields_to_export
    }

    fn selector(&self) -> &str {
        &self.export.selector
    }

    fn state_code(&self) -> &str {
        &self.export.state_code
    }

    fn default_window_days(&self) -> i64 {
        self.export.default_window_days
    }
}

impl Validate for ExportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const API_CONFIG: &str = r#"
[export]
fields_to_export = ["patientName", "chiefComplaint", "vitals"]
state_code = "TX"

[source]
type = "api"
endpoint = "https://records.example.com/api"
timeout_seconds = 30

[load]
output_path = "./reports"
format = "zip"
"#;

    #[test]
    fn test_parse_api_config() {
        let config = ExportConfig::from_toml_str(API_CONFIG).unwrap();

        assert!(config.is_api_source());
        assert_eq!(config.fields_to_export().len(), 3);
        assert_eq!(config.selector(), "Default");
        assert_eq!(config.state_code(), "TX");
        assert_eq!(config.default_window_days(), 5);
        assert_eq!(config.load.format, "zip");
        assert_eq!(config.filename_template(), DEFAULT_FILENAME);
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PCR_TEST_ENDPOINT", "https://pcr.test.com");

        let toml_content = r#"
[source]
type = "api"
endpoint = "${PCR_TEST_ENDPOINT}"
headers = { Authorization = "Bearer ${PCR_TEST_MISSING_TOKEN}" }

[load]
output_path = "./output"
"#;

        let config = ExportConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source.endpoint.as_deref(), Some("https://pcr.test.com"));
        assert_eq!(
            config.source.headers.unwrap()["Authorization"],
            "Bearer ${PCR_TEST_MISSING_TOKEN}"
        );
        assert_eq!(config.load.format, "csv");

        std::env::remove_var("PCR_TEST_ENDPOINT");
    }

    #[test]
    fn test_config_validation() {
        let invalid_endpoint = API_CONFIG.replace("https://records.example.com/api", "invalid-url");
        let config = ExportConfig::from_toml_str(&invalid_endpoint).unwrap();
        assert!(config.validate().is_err());

        let invalid_format = API_CONFIG.replace("format = \"zip\"", "format = \"xlsx\"");
        let config = ExportConfig::from_toml_str(&invalid_format).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_days_upper_bound() {
        let at_limit = API_CONFIG.replace(
            "state_code = \"TX\"",
            &format!("state_code = \"TX\"\ndefault_window_days = {}", MAX_WINDOW_DAYS),
        );
        assert!(ExportConfig::from_toml_str(&at_limit).unwrap().validate().is_ok());

        let too_far = API_CONFIG.replace(
            "state_code = \"TX\"",
            "state_code = \"TX\"\ndefault_window_days = 1000000000",
        );
        let config = ExportConfig::from_toml_str(&too_far).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ExportError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_file_source_requires_files() {
        let toml_content = r#"
[source]
type = "file"
records_file = "pcrs.json"

[load]
output_path = "./output"
"#;

        let config = ExportConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ExportError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(API_CONFIG.as_bytes()).unwrap();

        let config = ExportConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.source.timeout_seconds, Some(30));
    }
}
