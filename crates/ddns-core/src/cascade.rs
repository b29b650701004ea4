//! Cascading public address detection
//!
//! An [`IpCascade`] holds an ordered list of [`IpSource`]s for one family and
//! asks them one at a time. The first candidate that validates wins and the
//! remaining sources are never contacted.

use crate::address::PublicIp;
use crate::error::{Error, Result};
use crate::traits::{IpSource, IpVersion};
use tracing::{debug, info, warn};

/// Ordered, fault-isolated list of IP sources for a single family
pub struct IpCascade {
    version: IpVersion,
    sources: Vec<Box<dyn IpSource>>,
}

impl IpCascade {
    /// Create a cascade
    ///
    /// # Parameters
    ///
    /// - `version`: Family every candidate is validated against
    /// - `sources`: Sources in the order they should be tried
    pub fn new(version: IpVersion, sources: Vec<Box<dyn IpSource>>) -> Self {
        Self { version, sources }
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Detect the public address
    ///
    /// # Returns
    ///
    /// - `Ok(PublicIp)`: The first validated candidate
    /// - `Err(Error::NoAddressFound)`: Every source failed or returned an
    ///   unusable candidate
    pub async fn detect(&self) -> Result<PublicIp> {
        for source in &self.sources {
            match self.try_source(source.as_ref()).await {
                Ok(ip) => {
                    info!(source = source.name(), %ip, "Detected public {}", self.version);
                    return Ok(ip);
                }
                Err(e) => warn!("{}", e),
            }
        }

        Err(Error::NoAddressFound(self.version))
    }

    async fn try_source(&self, source: &dyn IpSource) -> Result<PublicIp> {
        debug!(source = source.name(), "Querying IP source");

        let candidate = match source.fetch_candidate().await {
            Ok(candidate) => candidate,
            Err(e @ Error::SourceUnavailable { .. }) => return Err(e),
            Err(e) => return Err(Error::source_unavailable(source.name(), e.to_string())),
        };

        PublicIp::parse(&candidate, self.version).ok_or_else(|| {
            Error::source_unavailable(
                source.name(),
                format!("'{}' is not a public {} address", candidate.trim(), self.version),
            )
        })
    }
}
