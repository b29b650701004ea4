// # ddnsd - DDNS Daemon
//
// Thin integration layer over ddns-core. All synchronization logic lives in
// the library; this binary only:
// 1. Reads configuration from environment variables
// 2. Initializes tracing and the runtime
// 3. Registers the EdgeOne provider and HTTP IP sources
// 4. Starts the engine and the scheduler, then waits for a signal
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Credentials
// - `DDNS_SECRET_ID`: EdgeOne API secret id
// - `DDNS_SECRET_KEY`: EdgeOne API secret key
// - `DDNS_ZONE_ID`: Zone holding the records
// - `DDNS_REGION`: Optional API region
//
// ### Records
// - `DDNS_IPV4_ENABLED` / `DDNS_IPV4_DOMAINS`: A records (comma-separated)
// - `DDNS_IPV6_ENABLED` / `DDNS_IPV6_DOMAINS`: AAAA records (comma-separated)
// - `DDNS_DOMAINS`: Legacy list, used for IPv4 when `DDNS_IPV4_DOMAINS` is empty
// - `DDNS_RECORD_TTL`, `DDNS_RECORD_LOCATION`: Overrides for written records
//
// ### Schedule
// - `DDNS_UPDATE_INTERVAL`: Seconds between passes (clamped to 60..=86400)
//
// ### Notifications
// - `DDNS_WEBHOOK_ENABLED`, `DDNS_WEBHOOK_URL`, `DDNS_WEBHOOK_PRESET`
// - `DDNS_WEBHOOK_HEADERS`, `DDNS_WEBHOOK_BODY`: JSON templates
//
// ### Misc
// - `DDNS_HISTORY_CAPACITY`: Entries kept in the operation history
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export DDNS_SECRET_ID=AKID...
// export DDNS_SECRET_KEY=...
// export DDNS_ZONE_ID=zone-2o8b...
// export DDNS_IPV4_ENABLED=true
// export DDNS_IPV4_DOMAINS=home.example.com,nas.example.com
// export DDNS_WEBHOOK_ENABLED=true
// export DDNS_WEBHOOK_PRESET=slack
// export DDNS_WEBHOOK_URL=https://hooks.slack.com/services/...
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::config::{DdnsConfig, FamilyConfig, ProviderConfig, RecordDefaults, WebhookConfig};
use ddns_core::{DdnsEngine, ProviderRegistry, Scheduler};
use serde_json::Value;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration, as read from the environment
struct Config {
    secret_id: String,
    secret_key: String,
    zone_id: String,
    region: Option<String>,
    ipv4_enabled: bool,
    ipv4_domains: Vec<String>,
    ipv6_enabled: bool,
    ipv6_domains: Vec<String>,
    legacy_domains: Vec<String>,
    update_interval: Option<u64>,
    record_ttl: Option<u32>,
    record_location: Option<String>,
    webhook_enabled: bool,
    webhook_url: String,
    webhook_preset: Option<String>,
    webhook_headers: Value,
    webhook_body: Value,
    history_capacity: Option<usize>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            secret_id: env::var("DDNS_SECRET_ID").unwrap_or_default(),
            secret_key: env::var("DDNS_SECRET_KEY").unwrap_or_default(),
            zone_id: env::var("DDNS_ZONE_ID").unwrap_or_default(),
            region: non_empty_var("DDNS_REGION"),
            ipv4_enabled: flag_var("DDNS_IPV4_ENABLED")?,
            ipv4_domains: list_var("DDNS_IPV4_DOMAINS"),
            ipv6_enabled: flag_var("DDNS_IPV6_ENABLED")?,
            ipv6_domains: list_var("DDNS_IPV6_DOMAINS"),
            legacy_domains: list_var("DDNS_DOMAINS"),
            update_interval: number_var("DDNS_UPDATE_INTERVAL")?,
            record_ttl: number_var("DDNS_RECORD_TTL")?,
            record_location: non_empty_var("DDNS_RECORD_LOCATION"),
            webhook_enabled: flag_var("DDNS_WEBHOOK_ENABLED")?,
            webhook_url: env::var("DDNS_WEBHOOK_URL").unwrap_or_default(),
            webhook_preset: non_empty_var("DDNS_WEBHOOK_PRESET"),
            webhook_headers: json_var("DDNS_WEBHOOK_HEADERS")?,
            webhook_body: json_var("DDNS_WEBHOOK_BODY")?,
            history_capacity: number_var("DDNS_HISTORY_CAPACITY")?,
            log_level: env::var("DDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Catches what the engine cannot: malformed domains, placeholder
    /// credentials, an enabled webhook without a usable URL.
    fn validate(&self) -> Result<()> {
        if self.secret_id.trim().is_empty() || self.secret_key.trim().is_empty() {
            anyhow::bail!(
                "DDNS_SECRET_ID and DDNS_SECRET_KEY are required. \
                Create an API key in the Tencent Cloud console"
            );
        }

        // Check for obvious placeholder credentials (common mistake)
        for value in [&self.secret_id, &self.secret_key] {
            let lower = value.to_lowercase();
            if lower.contains("your_secret") || lower.contains("replace_me") || lower == "xxx" {
                anyhow::bail!(
                    "DDNS_SECRET_ID/DDNS_SECRET_KEY appear to be placeholders. \
                    Use real credentials"
                );
            }
        }

        if self.zone_id.trim().is_empty() {
            anyhow::bail!("DDNS_ZONE_ID is required. Set it via: export DDNS_ZONE_ID=zone-...");
        }

        for domain in self
            .ipv4_domains
            .iter()
            .chain(&self.ipv6_domains)
            .chain(&self.legacy_domains)
        {
            validate_domain_name(domain)?;
        }

        if self.webhook_enabled {
            let url = self.webhook_url.trim();
            if url.is_empty() {
                anyhow::bail!("DDNS_WEBHOOK_URL is required when DDNS_WEBHOOK_ENABLED=true");
            }
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("DDNS_WEBHOOK_URL must use HTTP or HTTPS scheme. Got: {}", url);
            }
        }

        if let Some(capacity) = self.history_capacity
            && capacity == 0
        {
            anyhow::bail!("DDNS_HISTORY_CAPACITY must be at least 1");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the library configuration
    fn into_ddns_config(self) -> DdnsConfig {
        let mut config = DdnsConfig::new();

        config.provider = ProviderConfig::EdgeOne {
            secret_id: self.secret_id,
            secret_key: self.secret_key,
            region: self.region,
            endpoint: None,
        };
        config.zone_id = self.zone_id;
        config.ipv4 = FamilyConfig {
            enabled: self.ipv4_enabled,
            domains: self.ipv4_domains,
        };
        config.ipv6 = FamilyConfig {
            enabled: self.ipv6_enabled,
            domains: self.ipv6_domains,
        };
        config.domains = self.legacy_domains;
        if let Some(interval) = self.update_interval {
            config.update_interval_secs = interval;
        }
        config.record = RecordDefaults {
            ttl: self.record_ttl,
            location: self.record_location,
        };
        config.webhook = WebhookConfig {
            enabled: self.webhook_enabled,
            url: self.webhook_url,
            preset: self.webhook_preset,
            headers: self.webhook_headers,
            body: self.webhook_body,
        };
        if let Some(capacity) = self.history_capacity {
            config.engine.history_capacity = capacity;
        }

        config
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn list_var(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn flag_var(name: &str) -> Result<bool> {
    match non_empty_var(name) {
        None => Ok(false),
        Some(v) => parse_flag(&v).with_context(|| format!("{} is not a boolean", name)),
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized flag value '{}'", other),
    }
}

fn number_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    non_empty_var(name)
        .map(|v| v.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("{} is not a valid number", name))
}

fn json_var(name: &str) -> Result<Value> {
    match non_empty_var(name) {
        None => Ok(Value::Null),
        Some(v) => serde_json::from_str(&v).with_context(|| format!("{} is not valid JSON", name)),
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; not comprehensive but catches common errors.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        // `*` allows wildcard records, `@` the zone apex
        if label != "*"
            && label != "@"
            && !label.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config.into_ddns_config()).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                let config_problem = e
                    .downcast_ref::<ddns_core::Error>()
                    .is_some_and(ddns_core::Error::is_config);
                if config_problem {
                    DdnsExitCode::ConfigError
                } else {
                    DdnsExitCode::RuntimeError
                }
            }
        }
    });

    result.into()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: DdnsConfig) -> Result<()> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "edgeone")]
    {
        info!("Registering EdgeOne provider");
        ddns_provider_edgeone::register(&registry);
    }

    #[cfg(feature = "http")]
    {
        info!("Registering HTTP IP sources");
        ddns_ip_http::register(&registry);
    }

    let targets = config.all_targets();
    if targets.is_empty() {
        warn!("No address family enabled with domains; passes will do nothing");
    }
    for target in &targets {
        info!("Managing {} record: {}", target.version.record_type(), target.name);
    }

    let engine = Arc::new(DdnsEngine::new(config, Arc::new(registry)));
    engine.start().await?;

    let scheduler = Scheduler::new(Arc::clone(&engine)).spawn();
    info!("Daemon initialized successfully");

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);

    scheduler.shutdown().await;
    engine.stop().await;
    info!("Daemon stopped");

    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// The name of the signal received
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            secret_id: "AKIDabcdef".to_string(),
            secret_key: "s3cr3t".to_string(),
            zone_id: "zone-1".to_string(),
            region: None,
            ipv4_enabled: true,
            ipv4_domains: vec!["home.example.com".to_string()],
            ipv6_enabled: false,
            ipv6_domains: Vec::new(),
            legacy_domains: Vec::new(),
            update_interval: None,
            record_ttl: None,
            record_location: None,
            webhook_enabled: false,
            webhook_url: String::new(),
            webhook_preset: None,
            webhook_headers: Value::Null,
            webhook_body: Value::Null,
            history_capacity: None,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn valid_config_builds_edgeone_provider() {
        let config = base();
        assert!(config.validate().is_ok());

        let ddns = config.into_ddns_config();
        assert!(ddns.validate().is_ok());
        assert_eq!(ddns.provider.type_name(), "edgeone");
        assert_eq!(ddns.update_interval_secs, 300);
        assert_eq!(ddns.all_targets().len(), 1);
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let mut config = base();
        config.secret_key.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn enabled_webhook_needs_url() {
        let mut config = base();
        config.webhook_enabled = true;
        assert!(config.validate().is_err());

        config.webhook_url = "https://hooks.example.com/x".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn domain_names_are_checked() {
        assert!(validate_domain_name("home.example.com").is_ok());
        assert!(validate_domain_name("*.example.com").is_ok());
        assert!(validate_domain_name("bad..example.com").is_err());
        assert!(validate_domain_name("-bad.example.com").is_err());
        assert!(validate_domain_name("sp ace.example.com").is_err());
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag("on").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
