//! Record reconciliation
//!
//! For each (domain, record type) the [`Reconciler`] reads the remote state and
//! performs the single mutation needed to make it match the detected address:
//!
//! | Remote state             | Action                 |
//! |--------------------------|------------------------|
//! | no matching record       | create, `Created`      |
//! | same content             | nothing, `NoChange`    |
//! | different content        | modify, `Updated`      |
//! | any step errors          | nothing more, `Failed` |
//!
//! Domains are processed sequentially and independently; one failure never
//! stops its siblings.

use crate::address::PublicIp;
use crate::config::{DEFAULT_RECORD_LOCATION, DEFAULT_RECORD_TTL, DomainTarget, RecordDefaults};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, IpVersion, RecordSpec, RemoteRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordAction {
    Created,
    Updated,
    NoChange,
    Failed,
}

impl RecordAction {
    pub fn is_success(self) -> bool {
        !matches!(self, RecordAction::Failed)
    }

    /// Wire name, as used in notification variables
    pub fn as_str(self) -> &'static str {
        match self {
            RecordAction::Created => "created",
            RecordAction::Updated => "updated",
            RecordAction::NoChange => "no_change",
            RecordAction::Failed => "failed",
        }
    }
}

impl fmt::Display for RecordAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of reconciling one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub domain: String,
    pub version: IpVersion,
    pub record_type: String,
    pub action: RecordAction,
    /// Content before the change (updates only)
    pub old_value: Option<String>,
    /// Desired content
    pub new_value: String,
    pub record_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Failure message (failed outcomes only)
    pub error: Option<String>,
    /// Extra matching records left untouched
    #[serde(default)]
    pub duplicates: usize,
}

impl ReconciliationOutcome {
    pub fn success(&self) -> bool {
        self.action.is_success()
    }

    /// Warning for a name that matched more than one record
    pub fn duplicate_warning(&self) -> Option<String> {
        (self.duplicates > 0).then(|| {
            format!(
                "{} {} records match {}, only the first was reconciled",
                self.duplicates + 1,
                self.record_type,
                self.domain
            )
        })
    }

    /// One-line human readable description
    pub fn message(&self) -> String {
        match self.action {
            RecordAction::Created => format!(
                "created {} record {} -> {}",
                self.record_type, self.domain, self.new_value
            ),
            RecordAction::Updated => format!(
                "updated {} record {}: {} -> {}",
                self.record_type,
                self.domain,
                self.old_value.as_deref().unwrap_or("?"),
                self.new_value
            ),
            RecordAction::NoChange => format!(
                "{} record {} already points to {}",
                self.record_type, self.domain, self.new_value
            ),
            RecordAction::Failed => format!(
                "failed to reconcile {} record {}: {}",
                self.record_type,
                self.domain,
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

/// Reconciles records of one zone against detected addresses
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    zone_id: String,
    defaults: RecordDefaults,
}

impl Reconciler {
    /// Create a reconciler
    ///
    /// # Parameters
    ///
    /// - `provider`: Remote zone API
    /// - `zone_id`: Zone holding every managed record
    /// - `defaults`: TTL/location overrides for created and modified records
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        zone_id: impl Into<String>,
        defaults: RecordDefaults,
    ) -> Self {
        Self {
            provider,
            zone_id: zone_id.into(),
            defaults,
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Reconcile every target, in order
    ///
    /// Targets of a different family than `desired` are skipped.
    pub async fn reconcile_all(
        &self,
        targets: &[DomainTarget],
        desired: &PublicIp,
    ) -> Vec<ReconciliationOutcome> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            if target.version != desired.version() {
                warn!(
                    domain = %target.name,
                    "Skipping {} target for {} address", target.version, desired.version()
                );
                continue;
            }
            outcomes.push(self.reconcile(&target.name, desired).await);
        }
        outcomes
    }

    /// Reconcile one domain
    ///
    /// Never fails: errors become a [`RecordAction::Failed`] outcome.
    pub async fn reconcile(&self, domain: &str, desired: &PublicIp) -> ReconciliationOutcome {
        let version = desired.version();
        let new_value = desired.to_string();

        let mut outcome = ReconciliationOutcome {
            domain: domain.to_string(),
            version,
            record_type: version.record_type().to_string(),
            action: RecordAction::Failed,
            old_value: None,
            new_value,
            record_id: None,
            timestamp: Utc::now(),
            error: None,
            duplicates: 0,
        };

        match self.apply(domain, version, &outcome.new_value).await {
            Ok(applied) => {
                outcome.action = applied.action;
                outcome.old_value = applied.old_value;
                outcome.record_id = applied.record_id;
                outcome.duplicates = applied.duplicates;
                info!("{}", outcome.message());
            }
            Err(e) => {
                outcome.error = Some(e.to_string());
                error!("{}", outcome.message());
            }
        }

        outcome.timestamp = Utc::now();
        outcome
    }

    async fn apply(&self, domain: &str, version: IpVersion, content: &str) -> Result<Applied> {
        let record_type = version.record_type();
        let mut matches = self
            .provider
            .find_records(&self.zone_id, domain, record_type)
            .await?;

        let duplicates = matches.len().saturating_sub(1);
        if duplicates > 0 {
            warn!(
                domain,
                count = matches.len(),
                "Multiple {} records match, reconciling the first one", record_type
            );
        }

        if matches.is_empty() {
            let spec = RecordSpec {
                name: domain.to_string(),
                record_type: record_type.to_string(),
                content: content.to_string(),
                ttl: self.defaults.ttl.unwrap_or(DEFAULT_RECORD_TTL),
                location: self
                    .defaults
                    .location
                    .clone()
                    .unwrap_or_else(|| DEFAULT_RECORD_LOCATION.to_string()),
            };
            let record_id = self
                .provider
                .create_record(&self.zone_id, &spec)
                .await?
                .ok_or_else(|| Error::record(domain, "create response carried no record id"))?;

            return Ok(Applied {
                action: RecordAction::Created,
                old_value: None,
                record_id: Some(record_id),
                duplicates,
            });
        }

        let existing = matches.swap_remove(0);
        if existing.content == content {
            return Ok(Applied {
                action: RecordAction::NoChange,
                old_value: None,
                record_id: Some(existing.record_id),
                duplicates,
            });
        }

        let old_value = existing.content.clone();
        let modified = RemoteRecord {
            content: content.to_string(),
            ttl: self.defaults.ttl.unwrap_or(existing.ttl),
            location: self
                .defaults
                .location
                .clone()
                .unwrap_or(existing.location),
            ..existing
        };
        self.provider.modify_record(&self.zone_id, &modified).await?;

        Ok(Applied {
            action: RecordAction::Updated,
            old_value: Some(old_value),
            record_id: Some(modified.record_id),
            duplicates,
        })
    }
}

struct Applied {
    action: RecordAction,
    old_value: Option<String>,
    record_id: Option<String>,
    duplicates: usize,
}
