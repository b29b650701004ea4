// # ddns-core
//
// Core library for the polling DDNS synchronizer.
//
// ## Architecture Overview
//
// A pass detects the public address of each enabled family and makes the
// remote zone agree with it:
// - **IpSource / IpCascade**: Ordered echo services, first valid answer wins
// - **DnsProvider / Reconciler**: Idempotent create-or-modify of A/AAAA records
// - **Notifier / WebhookNotifier**: Templated webhook, at most one per pass
// - **DdnsEngine**: Stopped/Running state machine with bounded history
// - **Scheduler**: Runs passes at the configured interval
// - **ProviderRegistry**: Plugin-based registry for providers and IP sources
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from remote APIs
// 2. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 3. **Library-First**: The daemon is a thin shell over this crate
// 4. **Stateless Reconciliation**: The remote zone is the only source of truth

pub mod traits;
pub mod address;
pub mod cascade;
pub mod reconcile;
pub mod notify;
pub mod history;
pub mod engine;
pub mod scheduler;
pub mod registry;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsProvider, IpSource, IpVersion, Notifier};
pub use address::PublicIp;
pub use cascade::IpCascade;
pub use reconcile::{RecordAction, Reconciler, ReconciliationOutcome};
pub use notify::{Notification, WebhookNotifier};
pub use history::{HistoryEntry, HistoryLevel};
pub use engine::{DdnsEngine, PassReport, ServiceSnapshot};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use registry::ProviderRegistry;
pub use config::{DdnsConfig, IpSourceDescriptor, ProviderConfig};
pub use error::{Error, Result};
