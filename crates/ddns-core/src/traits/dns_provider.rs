// # DNS Provider Trait
//
// Defines the interface to a remote authoritative zone.
//
// ## Implementations
//
// - Tencent Cloud EdgeOne: `ddns-provider-edgeone` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// let provider = /* DnsProvider implementation */;
// let records = provider.find_records("zone-123", "home.example.com", "A").await?;
// ```
//
// Providers are single-shot: one API call per method, no retries, no caching.
// Deciding whether to create, modify or leave a record is the job of
// [`crate::reconcile::Reconciler`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A record as it currently exists in the remote zone
///
/// Always fetched fresh; never cached across passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Provider-assigned record id
    pub record_id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type (`A` or `AAAA`)
    pub record_type: String,
    /// Current record value
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Provider routing location (e.g. `Default`)
    pub location: String,
}

/// Parameters for creating a new record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    pub name: String,
    pub record_type: String,
    pub content: String,
    pub ttl: u32,
    pub location: String,
}

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Failure
///
/// Every method returns an error instead of retrying. The reconciler turns
/// the error into a failed outcome for the one domain involved.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List records in the zone matching exactly `name` and `record_type`
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Zone identifier
    /// - `name`: Fully qualified record name
    /// - `record_type`: `A` or `AAAA`
    ///
    /// # Returns
    ///
    /// All exact matches, in the order the provider returned them
    async fn find_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<RemoteRecord>, crate::Error>;

    /// Create a record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(id))`: The new record id
    /// - `Ok(None)`: The provider accepted the call but reported no id
    /// - `Err(Error)`: If the call failed
    async fn create_record(
        &self,
        zone_id: &str,
        spec: &RecordSpec,
    ) -> Result<Option<String>, crate::Error>;

    /// Modify an existing record in place
    ///
    /// `record` carries the record id and the full desired state.
    async fn modify_record(&self, zone_id: &str, record: &RemoteRecord)
    -> Result<(), crate::Error>;

    /// Count the records in a zone
    ///
    /// Used as a cheap reachability and credential probe.
    async fn count_records(&self, zone_id: &str) -> Result<usize, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed DnsProvider trait object
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
