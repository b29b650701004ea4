// # HTTP IP Source
//
// This crate provides the HTTP echo-service IP source for the DDNS system.
//
// ## Purpose
//
// Each [`HttpIpSource`] asks one public "what is my IP" service and hands
// the raw candidate to the core cascade, which validates it and decides
// whether to move on to the next service.
//
// ## Response Handling
//
// The body is parsed as JSON when possible and as trimmed text otherwise:
// - `ResponseShape::Text`: the whole text, or a bare JSON string
// - `ResponseShape::Json { pointer }`: a string or number at the JSON pointer

use ddns_core::ProviderRegistry;
use ddns_core::config::{IpSourceDescriptor, ResponseShape};
use ddns_core::traits::{IpSource, IpSourceFactory, IpVersion};
use ddns_core::{Error, Result};

use reqwest::header::USER_AGENT;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Some echo services refuse requests without a browser-like agent
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// One HTTP echo service
pub struct HttpIpSource {
    name: String,
    url: String,
    version: IpVersion,
    shape: ResponseShape,
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source from its descriptor
    ///
    /// # Returns
    ///
    /// - `Ok(HttpIpSource)`: Ready to query
    /// - `Err(Error::Config)`: The URL is not http(s)
    pub fn new(descriptor: &IpSourceDescriptor) -> Result<Self> {
        let url = descriptor.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::config(format!(
                "IP source {} needs an http(s) URL, got '{}'",
                descriptor.name, descriptor.url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: descriptor.name.clone(),
            url: url.to_string(),
            version: descriptor.version,
            shape: descriptor.shape.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn unavailable(&self, message: impl Into<String>) -> Error {
        Error::source_unavailable(&self.name, message)
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> IpVersion {
        self.version
    }

    async fn fetch_candidate(&self) -> Result<String> {
        debug!(source = %self.name, url = %self.url, "Querying IP echo service");

        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| self.unavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("HTTP status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.unavailable(format!("failed to read response: {}", e)))?;

        extract_candidate(&body, &self.shape).map_err(|msg| self.unavailable(msg))
    }
}

/// Pull the address candidate out of a response body
///
/// Validation is left to the caller; this only locates the text.
pub fn extract_candidate(
    body: &str,
    shape: &ResponseShape,
) -> std::result::Result<String, String> {
    let parsed = serde_json::from_str::<Value>(body).ok();

    match shape {
        ResponseShape::Text => match parsed {
            None => Ok(body.trim().to_string()),
            Some(Value::String(s)) => Ok(s.trim().to_string()),
            Some(other) => Err(format!("expected a plain address, got JSON {}", kind(&other))),
        },
        ResponseShape::Json { pointer } => {
            let value = parsed.ok_or_else(|| "response is not JSON".to_string())?;
            match value.pointer(pointer) {
                Some(Value::String(s)) => Ok(s.trim().to_string()),
                Some(Value::Number(n)) => Ok(n.to_string()),
                Some(other) => Err(format!("{} holds {}, not an address", pointer, kind(other))),
                None => Err(format!("{} not found in response", pointer)),
            }
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Factory for creating HTTP IP sources
pub struct HttpFactory;

impl IpSourceFactory for HttpFactory {
    fn create(&self, descriptor: &IpSourceDescriptor) -> Result<Box<dyn IpSource>> {
        Ok(Box::new(HttpIpSource::new(descriptor)?))
    }
}

/// Register the HTTP IP source with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_ip_source("http", Box::new(HttpFactory));
}
