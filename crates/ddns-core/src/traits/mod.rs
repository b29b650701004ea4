//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Ask one echo service for the public address
//! - [`DnsProvider`]: Query and mutate records in a remote zone
//! - [`Notifier`]: Deliver a notification to the outside world

pub mod ip_source;
pub mod dns_provider;
pub mod notifier;

pub use ip_source::{IpSource, IpVersion, IpSourceFactory};
pub use dns_provider::{DnsProvider, RemoteRecord, RecordSpec, DnsProviderFactory};
pub use notifier::Notifier;
