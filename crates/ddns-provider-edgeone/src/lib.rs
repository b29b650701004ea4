// # EdgeOne DNS Provider
//
// This crate provides the Tencent Cloud EdgeOne (TEO) DNS provider for the
// DDNS system.
//
// ## Behavior
//
// - One signed HTTPS call per trait method (paging may add more for lookups)
// - No retries, no caching; errors propagate to the reconciler, which fails
//   only the domain involved
// - Credentials never appear in logs or `Debug` output
//
// ## API Reference
//
// - Endpoint: `POST https://teo.tencentcloudapi.com/`, version `2022-09-01`
// - Authentication: TC3-HMAC-SHA256 (see [`signing`])
// - `DescribeDnsRecords`: exact `name`/`type` filters, paged by `Limit`/`Offset`
// - `CreateDnsRecord`: returns the new `RecordId`
// - `ModifyDnsRecords`: full record state, keyed by `RecordId`

mod signing;

use async_trait::async_trait;
use chrono::Utc;
use ddns_core::config::ProviderConfig;
use ddns_core::traits::{DnsProvider, DnsProviderFactory, RecordSpec, RemoteRecord};
use ddns_core::{Error, ProviderRegistry, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Production API endpoint
const DEFAULT_ENDPOINT: &str = "https://teo.tencentcloudapi.com";

/// TEO API version every action is called with
const API_VERSION: &str = "2022-09-01";

const SERVICE: &str = "teo";

/// Maximum page size accepted by `DescribeDnsRecords`
const PAGE_SIZE: usize = 1000;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

const PROVIDER: &str = "edgeone";

/// EdgeOne DNS provider
pub struct EdgeOneProvider {
    /// ⚠️ NEVER log this value
    secret_id: String,
    /// ⚠️ NEVER log this value
    secret_key: String,
    region: Option<String>,
    endpoint: String,
    /// Host the signature is computed over, derived from `endpoint`
    host: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for EdgeOneProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeOneProvider")
            .field("secret_id", &"<REDACTED>")
            .field("secret_key", &"<REDACTED>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl EdgeOneProvider {
    /// Create a provider talking to the production endpoint
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: A credential is empty
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let secret_id = secret_id.into();
        let secret_key = secret_key.into();

        if secret_id.trim().is_empty() || secret_key.trim().is_empty() {
            return Err(Error::config("EdgeOne secret_id and secret_key are required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            secret_id,
            secret_key,
            region: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            host: host_of(DEFAULT_ENDPOINT)?,
            client,
        })
    }

    /// Send `X-TC-Region` with every request
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        self.region = (!region.trim().is_empty()).then_some(region);
        self
    }

    /// Use another endpoint (tests, private gateways)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        self.host = host_of(&endpoint)?;
        self.endpoint = endpoint;
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call one API action and decode its `Response` object
    ///
    /// # Errors
    ///
    /// - Transport failures and non-2xx statuses: `Error::Http`
    /// - `AuthFailure.*`: `Error::Authentication`
    /// - `RequestLimitExceeded*`: `Error::RateLimited`
    /// - Any other API error: `Error::Provider`
    async fn call<T: DeserializeOwned>(&self, action: &str, params: &Value) -> Result<T> {
        let payload = serde_json::to_string(params)?;
        let now = Utc::now();
        let authorization = signing::authorization(&signing::SigningRequest {
            secret_id: &self.secret_id,
            secret_key: &self.secret_key,
            service: SERVICE,
            host: &self.host,
            action,
            payload: &payload,
            time: now,
        })?;

        debug!(action, endpoint = %self.endpoint, "Calling EdgeOne API");

        let mut request = self
            .client
            .post(format!("{}/", self.endpoint))
            .header("Authorization", authorization)
            .header("Content-Type", signing::CONTENT_TYPE)
            .header("Host", &self.host)
            .header("X-TC-Action", action)
            .header("X-TC-Timestamp", now.timestamp().to_string())
            .header("X-TC-Version", API_VERSION)
            .body(payload);
        if let Some(region) = &self.region {
            request = request.header("X-TC-Region", region);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read {} response: {}", action, e)))?;

        if !status.is_success() {
            return Err(Error::http(format!("{} returned {}: {}", action, status, text)));
        }

        let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
            Error::provider(PROVIDER, format!("Malformed {} response: {}", action, e))
        })?;

        if let Some(error) = envelope.response.get("Error") {
            let error: ApiError = serde_json::from_value(error.clone())?;
            return Err(map_api_error(action, error));
        }

        serde_json::from_value(envelope.response).map_err(|e| {
            Error::provider(PROVIDER, format!("Unexpected {} response: {}", action, e))
        })
    }

    async fn describe_page(
        &self,
        zone_id: &str,
        filters: &Value,
        limit: usize,
        offset: usize,
    ) -> Result<DescribeDnsRecords> {
        let mut params = json!({
            "ZoneId": zone_id,
            "Limit": limit,
            "Offset": offset,
        });
        if !filters.is_null() {
            params["Filters"] = filters.clone();
        }
        self.call("DescribeDnsRecords", &params).await
    }
}

#[async_trait]
impl DnsProvider for EdgeOneProvider {
    async fn find_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<RemoteRecord>> {
        let filters = json!([
            { "Name": "name", "Values": [name], "Fuzzy": false },
            { "Name": "type", "Values": [record_type], "Fuzzy": false },
        ]);

        let mut found = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.describe_page(zone_id, &filters, PAGE_SIZE, offset).await?;
            let fetched = page.dns_records.len();
            offset += fetched;

            found.extend(
                page.dns_records
                    .into_iter()
                    .filter(|r| r.name == name && r.record_type == record_type)
                    .map(RemoteRecord::from),
            );

            if fetched == 0 || offset >= page.total_count {
                break;
            }
        }

        debug!(name, record_type, count = found.len(), "EdgeOne records found");
        Ok(found)
    }

    async fn create_record(&self, zone_id: &str, spec: &RecordSpec) -> Result<Option<String>> {
        let params = json!({
            "ZoneId": zone_id,
            "Name": spec.name,
            "Type": spec.record_type,
            "Content": spec.content,
            "TTL": spec.ttl,
            "Location": spec.location,
        });

        let created: CreateDnsRecord = self.call("CreateDnsRecord", &params).await?;
        Ok(created.record_id.filter(|id| !id.is_empty()))
    }

    async fn modify_record(&self, zone_id: &str, record: &RemoteRecord) -> Result<()> {
        let params = json!({
            "ZoneId": zone_id,
            "DnsRecords": [{
                "RecordId": record.record_id,
                "Name": record.name,
                "Type": record.record_type,
                "Content": record.content,
                "TTL": record.ttl,
                "Location": record.location,
            }],
        });

        let _: Value = self.call("ModifyDnsRecords", &params).await?;
        Ok(())
    }

    async fn count_records(&self, zone_id: &str) -> Result<usize> {
        let page = self.describe_page(zone_id, &Value::Null, 1, 0).await?;
        Ok(page.total_count)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Response")]
    response: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDnsRecords {
    #[serde(default)]
    total_count: usize,
    #[serde(default)]
    dns_records: Vec<ApiRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiRecord {
    record_id: String,
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(default)]
    content: String,
    #[serde(rename = "TTL", default = "default_ttl")]
    ttl: u32,
    #[serde(default = "default_location")]
    location: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateDnsRecord {
    #[serde(default)]
    record_id: Option<String>,
}

impl From<ApiRecord> for RemoteRecord {
    fn from(r: ApiRecord) -> Self {
        RemoteRecord {
            record_id: r.record_id,
            name: r.name,
            record_type: r.record_type,
            content: r.content,
            ttl: r.ttl,
            location: r.location,
        }
    }
}

fn default_ttl() -> u32 {
    ddns_core::config::DEFAULT_RECORD_TTL
}

fn default_location() -> String {
    ddns_core::config::DEFAULT_RECORD_LOCATION.to_string()
}

fn map_api_error(action: &str, error: ApiError) -> Error {
    let detail = format!("{} failed: {} ({})", action, error.message, error.code);
    if error.code.starts_with("AuthFailure") {
        Error::auth(detail)
    } else if error.code.starts_with("RequestLimitExceeded") {
        Error::rate_limited(detail)
    } else {
        Error::provider(PROVIDER, detail)
    }
}

/// `host[:port]` of an endpoint URL
fn host_of(endpoint: &str) -> Result<String> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| Error::config(format!("Invalid EdgeOne endpoint '{}': {}", endpoint, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::config(format!("EdgeOne endpoint '{}' has no host", endpoint)))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Factory for creating EdgeOne providers
pub struct EdgeOneFactory;

impl DnsProviderFactory for EdgeOneFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::EdgeOne {
                secret_id,
                secret_key,
                region,
                endpoint,
            } => {
                let mut provider = EdgeOneProvider::new(secret_id.trim(), secret_key.trim())?;
                if let Some(region) = region {
                    provider = provider.with_region(region.clone());
                }
                if let Some(endpoint) = endpoint {
                    provider = provider.with_endpoint(endpoint.clone())?;
                }
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for EdgeOne provider")),
        }
    }
}

/// Register the EdgeOne provider with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(EdgeOneFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_credentials() {
        let provider = EdgeOneProvider::new("AKIDsecret", "supersecret").unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("AKIDsecret"));
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert!(EdgeOneProvider::new("", "key").unwrap_err().is_config());
        assert!(EdgeOneProvider::new("id", "  ").unwrap_err().is_config());
    }

    #[test]
    fn endpoint_host_includes_port() {
        assert_eq!(host_of("https://teo.tencentcloudapi.com").unwrap(), "teo.tencentcloudapi.com");
        assert_eq!(host_of("http://127.0.0.1:8080").unwrap(), "127.0.0.1:8080");
        assert!(host_of("not a url").is_err());
    }

    #[test]
    fn api_error_codes_map_to_error_kinds() {
        let err = |code: &str| ApiError {
            code: code.to_string(),
            message: "nope".to_string(),
        };
        assert!(matches!(
            map_api_error("X", err("AuthFailure.SignatureFailure")),
            Error::Authentication(_)
        ));
        assert!(matches!(
            map_api_error("X", err("RequestLimitExceeded")),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            map_api_error("X", err("ResourceNotFound")),
            Error::Provider { .. }
        ));
    }

    #[test]
    fn missing_ttl_and_location_use_defaults() {
        let record: ApiRecord = serde_json::from_value(json!({
            "RecordId": "r-1",
            "Name": "home.example.com",
            "Type": "A",
            "Content": "203.0.113.7"
        }))
        .unwrap();
        let record = RemoteRecord::from(record);
        assert_eq!(record.ttl, 300);
        assert_eq!(record.location, "Default");
    }

    #[test]
    fn factory_rejects_other_configs() {
        let config = ProviderConfig::Custom {
            factory: "edgeone".to_string(),
            config: json!({}),
        };
        assert!(EdgeOneFactory.create(&config).is_err());
    }
}
