//! Error types for the DDNS system
//!
//! Every fallible operation in the workspace returns [`Result`]. Failures are
//! recovered at the narrowest scope that can handle them: a single IP source,
//! a single domain, a single pass. None of them stop the engine.

use crate::traits::IpVersion;
use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// One IP echo service failed; the cascade moves on to the next one
    #[error("IP source {name} unavailable: {message}")]
    SourceUnavailable {
        /// Descriptor name of the failing service
        name: String,
        /// What went wrong
        message: String,
    },

    /// Every configured source for a family was exhausted
    #[error("no public {0} address found")]
    NoAddressFound(IpVersion),

    /// A remote record query, create or modify failed for one domain
    #[error("record operation failed for {domain}: {message}")]
    RecordOperation {
        /// Domain being reconciled
        domain: String,
        /// Error message
        message: String,
    },

    /// A pass aborted with an unexpected failure
    #[error("synchronization pass failed: {0}")]
    PassFailed(String),

    /// Configuration errors (missing credentials, missing zone, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a source-unavailable error
    pub fn source_unavailable(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a record operation error
    pub fn record(domain: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordOperation {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a pass failure
    pub fn pass_failed(msg: impl Into<String>) -> Self {
        Self::PassFailed(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a configuration problem
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
