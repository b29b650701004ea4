//! Read-only views of the engine for dashboards and CLIs

use crate::traits::IpVersion;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Consistent point-in-time copy of the service state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSnapshot {
    pub running: bool,
    pub last_check_time: Option<DateTime<Utc>>,
    pub last_ipv4: Option<String>,
    pub last_ipv6: Option<String>,
    pub config_valid: bool,
    pub ipv4_enabled: bool,
    pub ipv6_enabled: bool,
    pub ipv4_domains: usize,
    pub ipv6_domains: usize,
    pub total_domains: usize,
    /// Effective (clamped) interval between scheduled passes
    pub update_interval_secs: u64,
}

/// Result of probing one address family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressProbe {
    pub version: IpVersion,
    pub address: Option<String>,
    pub error: Option<String>,
}

/// Result of probing the remote zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneProbe {
    pub reachable: bool,
    pub record_count: Option<usize>,
    pub error: Option<String>,
}

/// Current remote state of one configured domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordProbe {
    pub domain: String,
    pub record_type: String,
    pub exists: bool,
    pub current_value: Option<String>,
    pub error: Option<String>,
}

/// Outcome of [`super::DdnsEngine::test_connectivity`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityReport {
    pub addresses: Vec<AddressProbe>,
    pub zone: ZoneProbe,
    /// `None` when no webhook is configured
    pub webhook_delivered: Option<bool>,
    pub records: Vec<RecordProbe>,
}

impl ConnectivityReport {
    /// Every probe that ran succeeded
    pub fn all_ok(&self) -> bool {
        self.addresses.iter().all(|a| a.address.is_some())
            && self.zone.reachable
            && self.webhook_delivered.unwrap_or(true)
            && self.records.iter().all(|r| r.error.is_none())
    }
}
