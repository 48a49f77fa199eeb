use crate::config::toml_config::SourceConfig;
use crate::core::{LookupSource, RecordSource};
use crate::domain::model::{ExportWindow, LookupRow, RawRecord};
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::validate_required_field;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_RECORDS_PATH: &str = "/pcrs";
pub const DEFAULT_LOOKUPS_PATH: &str = "/dropdown-options";

/// HTTP client for the record store API.
///
/// Records come from `GET {endpoint}{records_path}?tenantId=&startDate=&endDate=`
/// and lookup rows from `GET {endpoint}{lookups_path}?tenantId=`; both answer
/// with a JSON array.
#[derive(Debug, Clone)]
pub struct ApiSource {
    client: Client,
    endpoint: String,
    records_path: String,
    lookups_path: String,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl ApiSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            records_path: DEFAULT_RECORDS_PATH.to_string(),
            lookups_path: DEFAULT_LOOKUPS_PATH.to_string(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let endpoint = validate_required_field("source.endpoint", &config.endpoint)?;
        let mut source = Self::new(endpoint.as_str());

        if let Some(path) = &config.records_path {
            source.records_path = path.clone();
        }
        if let Some(path) = &config.lookups_path {
            source.lookups_path = path.clone();
        }
        if let Some(headers) = &config.headers {
            source.headers = headers.clone();
        }
        source.timeout = config.timeout_seconds.map(Duration::from_secs);

        Ok(source)
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let mut request = self.client.get(url);

        // 添加自定義標頭
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        request
    }

    async fn fetch_array<T: DeserializeOwned>(
        &self,
        source_name: &str,
        request: RequestBuilder,
    ) -> Result<Vec<T>> {
        let response = request.send().await?;
        tracing::debug!("📡 {} response status: {}", source_name, response.status());

        if !response.status().is_success() {
            return Err(ExportError::source_unavailable(
                source_name,
                format!("request failed with status: {}", response.status()),
            ));
        }

        Ok(response.json::<Vec<T>>().await?)
    }
}

#[async_trait::async_trait]
impl RecordSource for ApiSource {
    async fn fetch_records(&self, agency_id: i64, window: &ExportWindow) -> Result<Vec<RawRecord>> {
        let url = self.url(&self.records_path);
        tracing::debug!("📡 Fetching records from: {}", url);

        let request = self.request(&url).query(&[
            ("tenantId", agency_id.to_string()),
            ("startDate", window.start.to_rfc3339()),
            ("endDate", window.end.to_rfc3339()),
        ]);
        let mut records: Vec<RawRecord> = self.fetch_array("records", request).await?;

        // 防止資料來源回傳空白內容
        records.retain(RawRecord::has_payload);
        tracing::info!("📡 Fetched {} records for agency {}", records.len(), agency_id);
        Ok(records)
    }
}

#[async_trait::async_trait]
impl LookupSource for ApiSource {
    async fn fetch_lookups(&self, agency_id: i64) -> Result<Vec<LookupRow>> {
        let url = self.url(&self.lookups_path);
        tracing::debug!("📡 Fetching lookup rows from: {}", url);

        let request = self
            .request(&url)
            .query(&[("tenantId", agency_id.to_string())]);
        let rows: Vec<LookupRow> = self.fetch_array("lookups", request).await?;

        tracing::info!("📡 Fetched {} lookup rows for agency {}", rows.len(), agency_id);
        Ok(rows)
    }
}
