// # IP Source Trait
//
// Defines the interface for asking one external echo service which public
// address this host is seen from.
//
// ## Implementations
//
// - HTTP echo services: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
//
// let source = /* IpSource implementation */;
// let candidate = source.fetch_candidate().await?;
// ```
//
// Sources only report a raw candidate string. Validation and ordering belong
// to [`crate::cascade::IpCascade`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address family of an IP address or a DNS record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// DNS record type that carries addresses of this family
    pub fn record_type(self) -> &'static str {
        match self {
            IpVersion::V4 => "A",
            IpVersion::V6 => "AAAA",
        }
    }

    /// Both families, IPv4 first
    pub fn all() -> [IpVersion; 2] {
        [IpVersion::V4, IpVersion::V6]
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

/// One external service that echoes the caller's public address
///
/// Implementations perform exactly one request per call with a bounded
/// timeout, and never retry. A failed request is reported as
/// [`crate::Error::SourceUnavailable`] so the cascade can move on.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Descriptor name, used in logs and error messages
    fn name(&self) -> &str;

    /// Address family this source is configured for
    fn version(&self) -> IpVersion;

    /// Query the service and extract a candidate address string
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The raw candidate, not yet validated
    /// - `Err(Error)`: Transport failure, bad status, or nothing to extract
    async fn fetch_candidate(&self) -> Result<String, crate::Error>;
}

/// Helper trait for constructing IP sources from configuration
pub trait IpSourceFactory: Send + Sync {
    /// Create an IpSource instance from its descriptor
    ///
    /// # Parameters
    ///
    /// - `descriptor`: Name, URL, family and response shape of the service
    ///
    /// # Returns
    ///
    /// A boxed IpSource trait object
    fn create(
        &self,
        descriptor: &crate::config::IpSourceDescriptor,
    ) -> Result<Box<dyn IpSource>, crate::Error>;
}
