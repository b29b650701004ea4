//! Configuration types for the DDNS system
//!
//! This module defines all configuration structures used throughout the crate.
//! The engine reads a [`DdnsConfig`] snapshot on every start; a pass never
//! mutates it.

use crate::traits::IpVersion;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lower bound for the scheduling interval, in seconds
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 60;

/// Upper bound for the scheduling interval, in seconds
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 86_400;

/// TTL used when creating a record and nothing else is configured
pub const DEFAULT_RECORD_TTL: u32 = 300;

/// Location used when creating a record and nothing else is configured
pub const DEFAULT_RECORD_LOCATION: &str = "Default";

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS provider configuration (credentials live here)
    pub provider: ProviderConfig,

    /// Identifier of the remote zone holding the records
    #[serde(default)]
    pub zone_id: String,

    /// IPv4 (A record) synchronization
    #[serde(default)]
    pub ipv4: FamilyConfig,

    /// IPv6 (AAAA record) synchronization
    #[serde(default)]
    pub ipv6: FamilyConfig,

    /// Legacy single domain list, used for IPv4 when `ipv4.domains` is empty
    #[serde(default)]
    pub domains: Vec<String>,

    /// Seconds between scheduled passes (clamped, see [`DdnsConfig::update_interval`])
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Overrides applied when creating or modifying records
    #[serde(default)]
    pub record: RecordDefaults,

    /// Ordered IP echo services per family
    #[serde(default)]
    pub ip_sources: IpSourcesConfig,

    /// Outbound webhook notifications
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            provider: ProviderConfig::default(),
            zone_id: String::new(),
            ipv4: FamilyConfig::default(),
            ipv6: FamilyConfig::default(),
            domains: Vec::new(),
            update_interval_secs: default_update_interval_secs(),
            record: RecordDefaults::default(),
            ip_sources: IpSourcesConfig::default(),
            webhook: WebhookConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    ///
    /// Only problems that make a pass impossible are rejected: missing
    /// credentials and a missing zone id. An empty domain list is valid.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;

        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("zone_id is required"));
        }

        if self.engine.history_capacity == 0 {
            return Err(crate::Error::config("history_capacity must be > 0"));
        }

        Ok(())
    }

    /// Whether the family is switched on
    pub fn is_enabled(&self, version: IpVersion) -> bool {
        match version {
            IpVersion::V4 => self.ipv4.enabled,
            IpVersion::V6 => self.ipv6.enabled,
        }
    }

    /// Normalized domain list for a family, regardless of its enabled flag
    pub fn domains_for(&self, version: IpVersion) -> Vec<String> {
        match version {
            IpVersion::V4 => {
                let domains = normalize_domains(&self.ipv4.domains);
                if domains.is_empty() {
                    normalize_domains(&self.domains)
                } else {
                    domains
                }
            }
            IpVersion::V6 => normalize_domains(&self.ipv6.domains),
        }
    }

    /// Targets to reconcile for a family; empty when the family is disabled
    pub fn targets(&self, version: IpVersion) -> Vec<DomainTarget> {
        if !self.is_enabled(version) {
            return Vec::new();
        }

        self.domains_for(version)
            .into_iter()
            .map(|name| DomainTarget { name, version })
            .collect()
    }

    /// Every enabled target, IPv4 first
    pub fn all_targets(&self) -> Vec<DomainTarget> {
        IpVersion::all()
            .into_iter()
            .flat_map(|version| self.targets(version))
            .collect()
    }

    /// Scheduling interval clamped to [`MIN_UPDATE_INTERVAL_SECS`]..=[`MAX_UPDATE_INTERVAL_SECS`]
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(clamp_interval_secs(self.update_interval_secs))
    }
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a raw interval to the supported range
pub fn clamp_interval_secs(secs: u64) -> u64 {
    secs.clamp(MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS)
}

/// Trim every entry, drop empty ones and remove duplicates keeping the first
/// occurrence.
pub fn normalize_domains(domains: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(domains.len());
    for domain in domains {
        let domain = domain.trim();
        if domain.is_empty() || out.iter().any(|d| d == domain) {
            continue;
        }
        out.push(domain.to_string());
    }
    out
}

/// A domain name paired with the family whose record it carries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainTarget {
    pub name: String,
    pub version: IpVersion,
}

/// Per-family switch and domain list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub domains: Vec<String>,
}

impl FamilyConfig {
    /// Enabled family with the given domains
    pub fn enabled(domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            enabled: true,
            domains: domains.into_iter().map(Into::into).collect(),
        }
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Tencent Cloud EdgeOne
    #[serde(rename = "edgeone")]
    EdgeOne {
        /// API secret id
        secret_id: String,
        /// API secret key
        secret_key: String,
        /// Optional region sent with every request
        #[serde(default)]
        region: Option<String>,
        /// Override of the API endpoint (tests, private gateways)
        #[serde(default)]
        endpoint: Option<String>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::EdgeOne {
                secret_id,
                region,
                endpoint,
                ..
            } => f
                .debug_struct("EdgeOne")
                .field("secret_id", secret_id)
                .field("secret_key", &"<REDACTED>")
                .field("region", region)
                .field("endpoint", endpoint)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

impl ProviderConfig {
    /// EdgeOne provider with the default endpoint
    pub fn edgeone(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        ProviderConfig::EdgeOne {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            region: None,
            endpoint: None,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::EdgeOne {
                secret_id,
                secret_key,
                ..
            } => {
                if secret_id.trim().is_empty() {
                    return Err(crate::Error::config("EdgeOne secret_id is required"));
                }
                if secret_key.trim().is_empty() {
                    return Err(crate::Error::config("EdgeOne secret_key is required"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::EdgeOne { .. } => "edgeone",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::edgeone("", "")
    }
}

/// Record attribute overrides
///
/// `None` means "300 / Default" on create and "keep what the record has" on
/// modify.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordDefaults {
    #[serde(default)]
    pub ttl: Option<u32>,

    #[serde(default)]
    pub location: Option<String>,
}

/// How to pull the address out of an echo service response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseShape {
    /// The whole body (or a bare JSON string) is the address
    #[default]
    Text,
    /// The address sits at a JSON pointer, e.g. `/ip`
    Json { pointer: String },
}

/// One IP echo service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSourceDescriptor {
    /// Short unique name used in logs
    pub name: String,

    /// Endpoint to GET
    pub url: String,

    /// Family the service reports
    pub version: IpVersion,

    /// Response extraction rule
    #[serde(default)]
    pub shape: ResponseShape,

    /// Registry key of the factory that builds this source
    #[serde(default = "default_source_kind")]
    pub kind: String,
}

impl IpSourceDescriptor {
    /// Plain-text HTTP source
    pub fn http(name: impl Into<String>, url: impl Into<String>, version: IpVersion) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            version,
            shape: ResponseShape::Text,
            kind: default_source_kind(),
        }
    }

    /// Set the response shape
    pub fn with_shape(mut self, shape: ResponseShape) -> Self {
        self.shape = shape;
        self
    }
}

/// Ordered echo services per family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourcesConfig {
    #[serde(default = "default_ipv4_sources")]
    pub ipv4: Vec<IpSourceDescriptor>,

    #[serde(default = "default_ipv6_sources")]
    pub ipv6: Vec<IpSourceDescriptor>,
}

impl IpSourcesConfig {
    /// Descriptors for one family, in cascade order
    pub fn for_version(&self, version: IpVersion) -> &[IpSourceDescriptor] {
        match version {
            IpVersion::V4 => &self.ipv4,
            IpVersion::V6 => &self.ipv6,
        }
    }
}

impl Default for IpSourcesConfig {
    fn default() -> Self {
        Self {
            ipv4: default_ipv4_sources(),
            ipv6: default_ipv6_sources(),
        }
    }
}

/// Outbound webhook configuration
///
/// `headers` and `body` are template trees; see [`crate::notify::template`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub url: String,

    /// Name of a built-in template set (`dingtalk`, `slack`, ...)
    #[serde(default)]
    pub preset: Option<String>,

    /// Header templates (JSON object of strings)
    #[serde(default)]
    pub headers: serde_json::Value,

    /// Body template
    #[serde(default)]
    pub body: serde_json::Value,
}

impl WebhookConfig {
    /// Enabled and pointing somewhere
    pub fn is_active(&self) -> bool {
        self.enabled && !self.url.trim().is_empty()
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of history entries kept before the oldest is evicted
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_update_interval_secs() -> u64 {
    300
}

fn default_history_capacity() -> usize {
    100
}

fn default_source_kind() -> String {
    "http".to_string()
}

fn default_ipv4_sources() -> Vec<IpSourceDescriptor> {
    [
        ("nxsg-ipv4", "https://ipv4.nxsg.dpdns.org/"),
        ("ipip-net", "https://myip.ipip.net"),
        ("oray-checkip", "https://ddns.oray.com/checkip"),
        ("3322-net", "https://ip.3322.net"),
        ("ipw-cn-v4", "https://4.ipw.cn"),
        ("yinghualuo-v4", "https://v4.yinghualuo.cn/bejson"),
    ]
    .into_iter()
    .map(|(name, url)| IpSourceDescriptor::http(name, url, IpVersion::V4))
    .collect()
}

fn default_ipv6_sources() -> Vec<IpSourceDescriptor> {
    [
        ("nxsg-ipv6", "https://ipv6.nxsg.dpdns.org/"),
        ("neu6-edu", "https://speed.neu6.edu.cn/getIP.php"),
        ("ident-me-v6", "https://v6.ident.me"),
        ("ipw-cn-v6", "https://6.ipw.cn"),
        ("yinghualuo-v6", "https://v6.yinghualuo.cn/bejson"),
    ]
    .into_iter()
    .map(|(name, url)| IpSourceDescriptor::http(name, url, IpVersion::V6))
    .collect()
}
