//! Synchronization engine
//!
//! The DdnsEngine is responsible for:
//! - Owning the Stopped/Running state machine
//! - Building providers, cascades and the notifier from configuration
//! - Running passes (detect → reconcile → bookkeeping → notify)
//! - Exposing consistent snapshots of its state and history
//!
//! ## Architecture
//!
//! ```text
//!  Scheduler ──┐
//!              ├──► DdnsEngine ──► IpCascade (per family)
//!  trigger() ──┘        │                │ PublicIp
//!                       │                ▼
//!                       │           Reconciler ──► DnsProvider
//!                       │                │ outcomes
//!                       ▼                ▼
//!                 History/State     Notifier (one per pass)
//! ```
//!
//! ## Locking
//!
//! A single async run lock serializes start, stop, restart, reconfigure and
//! passes, so a restart can never interleave with an in-flight pass. Service
//! state and history sit behind their own read/write locks and are only
//! written while the run lock is held; readers never wait for a pass.

mod pass;
mod status;

pub use pass::PassReport;
pub use status::{AddressProbe, ConnectivityReport, RecordProbe, ServiceSnapshot, ZoneProbe};

use crate::address::PublicIp;
use crate::cascade::IpCascade;
use crate::config::DdnsConfig;
use crate::error::{Error, Result};
use crate::history::{History, HistoryEntry};
use crate::notify::{Notification, WebhookNotifier};
use crate::reconcile::Reconciler;
use crate::registry::ProviderRegistry;
use crate::traits::{DnsProvider, IpVersion, Notifier};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, warn};

/// Everything a pass needs, built once per start
pub(crate) struct Components {
    pub(crate) config: DdnsConfig,
    pub(crate) provider: Arc<dyn DnsProvider>,
    pub(crate) reconciler: Reconciler,
    /// Cascades of the enabled families, IPv4 first
    pub(crate) cascades: Vec<IpCascade>,
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
}

#[derive(Debug, Default)]
struct ServiceState {
    running: bool,
    last_check_time: Option<DateTime<Utc>>,
    last_ipv4: Option<PublicIp>,
    last_ipv6: Option<PublicIp>,
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. [`DdnsEngine::start()`] validates configuration and runs a first pass
/// 3. Passes run via [`DdnsEngine::trigger()`] or the [`crate::scheduler::Scheduler`]
/// 4. [`DdnsEngine::stop()`] ends the Running state; it is idempotent
///
/// ## Threading
///
/// All methods take `&self`; share the engine as `Arc<DdnsEngine>`.
pub struct DdnsEngine {
    registry: Arc<ProviderRegistry>,
    config: RwLock<DdnsConfig>,
    /// Run lock; `Some` while Running
    run: Mutex<Option<Arc<Components>>>,
    state: RwLock<ServiceState>,
    history: RwLock<History>,
    notifier_override: Option<Arc<dyn Notifier>>,
    interval_tx: watch::Sender<Duration>,
}

impl DdnsEngine {
    /// Create a stopped engine
    ///
    /// # Parameters
    ///
    /// - `config`: Initial configuration (validated on start, not here)
    /// - `registry`: Registry holding the provider and IP source plugins
    pub fn new(config: DdnsConfig, registry: Arc<ProviderRegistry>) -> Self {
        let (interval_tx, _) = watch::channel(config.update_interval());
        let history = History::new(config.engine.history_capacity);

        Self {
            registry,
            config: RwLock::new(config),
            run: Mutex::new(None),
            state: RwLock::new(ServiceState::default()),
            history: RwLock::new(history),
            notifier_override: None,
            interval_tx,
        }
    }

    /// Deliver notifications through `notifier` instead of the configured webhook
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier_override = Some(notifier);
        self
    }

    /// Start the engine
    ///
    /// Validates the configuration, builds all components, resets the service
    /// state, sends a startup notification and runs one pass. Calling it while
    /// already running succeeds without doing anything.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The engine is Running
    /// - `Err(Error::Config)`: Configuration invalid; the engine stays Stopped
    pub async fn start(&self) -> Result<()> {
        let mut run = self.run.lock().await;
        self.start_locked(&mut run).await
    }

    /// Stop the engine; a no-op when already stopped
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        self.stop_locked(&mut run).await;
    }

    /// Stop then start under one acquisition of the run lock
    pub async fn restart(&self) -> Result<()> {
        let mut run = self.run.lock().await;
        self.stop_locked(&mut run).await;
        self.start_locked(&mut run).await
    }

    /// Replace the configuration, restarting if running
    ///
    /// The new interval is published to the scheduler either way.
    pub async fn reconfigure(&self, config: DdnsConfig) -> Result<()> {
        let mut run = self.run.lock().await;
        self.interval_tx.send_replace(config.update_interval());
        *self.config.write().await = config;
        self.history.write().await.info("Configuration updated");

        if run.is_some() {
            self.stop_locked(&mut run).await;
            self.start_locked(&mut run).await?;
        }
        Ok(())
    }

    /// Run a pass now (manual trigger)
    ///
    /// Reports failure without doing anything when the engine is stopped.
    pub async fn trigger(&self) -> PassReport {
        let run = self.run.lock().await;
        match run.as_ref() {
            Some(components) => self.run_pass_locked(Arc::clone(components)).await,
            None => PassReport::not_running(),
        }
    }

    /// Run a pass if running; `None` when stopped
    pub async fn scheduled_pass(&self) -> Option<PassReport> {
        let run = self.run.lock().await;
        match run.as_ref() {
            Some(components) => Some(self.run_pass_locked(Arc::clone(components)).await),
            None => {
                debug!("Engine stopped, skipping scheduled pass");
                None
            }
        }
    }

    /// Whether the engine is Running
    pub async fn is_running(&self) -> bool {
        self.state.read().await.running
    }

    /// Consistent copy of the service state
    pub async fn snapshot(&self) -> ServiceSnapshot {
        let config = self.config.read().await;
        let state = self.state.read().await;

        let ipv4_domains = config.domains_for(IpVersion::V4).len();
        let ipv6_domains = config.domains_for(IpVersion::V6).len();

        ServiceSnapshot {
            running: state.running,
            last_check_time: state.last_check_time,
            last_ipv4: state.last_ipv4.map(|ip| ip.to_string()),
            last_ipv6: state.last_ipv6.map(|ip| ip.to_string()),
            config_valid: config.validate().is_ok(),
            ipv4_enabled: config.ipv4.enabled,
            ipv6_enabled: config.ipv6.enabled,
            ipv4_domains,
            ipv6_domains,
            total_domains: ipv4_domains + ipv6_domains,
            update_interval_secs: config.update_interval().as_secs(),
        }
    }

    /// Newest history entries first, at most `limit`
    pub async fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.history.read().await.recent(limit)
    }

    /// Forget all history entries; the service state is left alone
    pub async fn clear_history(&self) {
        self.history.write().await.clear();
        info!("History cleared");
    }

    /// Copy of the current configuration
    pub async fn config(&self) -> DdnsConfig {
        self.config.read().await.clone()
    }

    /// Effective scheduling interval, updated on every reconfigure
    pub fn interval_updates(&self) -> watch::Receiver<Duration> {
        self.interval_tx.subscribe()
    }

    /// Probe every external dependency without touching service state
    ///
    /// Detects each enabled family, counts the zone's records, sends a test
    /// notification when a webhook is configured and looks up the first
    /// three configured domains. Works whether or not the engine is running.
    ///
    /// # Returns
    ///
    /// - `Ok(ConnectivityReport)`: Probes ran (individual probes may have failed)
    /// - `Err(Error)`: Configuration invalid or components could not be built
    pub async fn test_connectivity(&self) -> Result<ConnectivityReport> {
        let config = self.config.read().await.clone();
        config.validate()?;
        let components = self.build_components(config)?;
        let config = &components.config;

        let mut addresses = Vec::new();
        for cascade in &components.cascades {
            let probe = match cascade.detect().await {
                Ok(ip) => AddressProbe {
                    version: cascade.version(),
                    address: Some(ip.to_string()),
                    error: None,
                },
                Err(e) => AddressProbe {
                    version: cascade.version(),
                    address: None,
                    error: Some(e.to_string()),
                },
            };
            addresses.push(probe);
        }

        let zone = match components.provider.count_records(&config.zone_id).await {
            Ok(count) => ZoneProbe {
                reachable: true,
                record_count: Some(count),
                error: None,
            },
            Err(e) => ZoneProbe {
                reachable: false,
                record_count: None,
                error: Some(e.to_string()),
            },
        };

        let webhook_delivered = match &components.notifier {
            Some(notifier) => Some(notifier.send(&Notification::Test).await),
            None => None,
        };

        let mut records = Vec::new();
        let domains = IpVersion::all()
            .into_iter()
            .flat_map(|v| config.domains_for(v).into_iter().map(move |d| (d, v)))
            .take(3);
        for (domain, version) in domains {
            let record_type = version.record_type();
            let probe = match components
                .provider
                .find_records(&config.zone_id, &domain, record_type)
                .await
            {
                Ok(found) => RecordProbe {
                    exists: !found.is_empty(),
                    current_value: found.into_iter().next().map(|r| r.content),
                    domain,
                    record_type: record_type.to_string(),
                    error: None,
                },
                Err(e) => RecordProbe {
                    domain,
                    record_type: record_type.to_string(),
                    exists: false,
                    current_value: None,
                    error: Some(e.to_string()),
                },
            };
            records.push(probe);
        }

        Ok(ConnectivityReport {
            addresses,
            zone,
            webhook_delivered,
            records,
        })
    }

    async fn start_locked(&self, run: &mut Option<Arc<Components>>) -> Result<()> {
        if run.is_some() {
            debug!("Engine already running");
            return Ok(());
        }

        let config = self.config.read().await.clone();
        let components = match config.validate().and_then(|_| self.build_components(config)) {
            Ok(components) => Arc::new(components),
            Err(e) => {
                self.history
                    .write()
                    .await
                    .error(format!("Failed to start service: {}", e));
                return Err(e);
            }
        };

        *self.state.write().await = ServiceState {
            running: true,
            ..ServiceState::default()
        };
        {
            let mut history = self.history.write().await;
            history.set_capacity(components.config.engine.history_capacity);
            history.info("Service started");
        }
        *run = Some(Arc::clone(&components));

        let domains: Vec<String> = components
            .config
            .all_targets()
            .into_iter()
            .map(|t| t.name)
            .collect();
        if let Some(notifier) = &components.notifier
            && !domains.is_empty()
        {
            notifier.send(&Notification::Startup { domains }).await;
        }

        self.run_pass_locked(components).await;
        Ok(())
    }

    async fn stop_locked(&self, run: &mut Option<Arc<Components>>) {
        if run.take().is_none() {
            debug!("Engine already stopped");
            return;
        }

        self.state.write().await.running = false;
        self.history.write().await.info("Service stopped");
    }

    fn build_components(&self, config: DdnsConfig) -> Result<Components> {
        let provider: Arc<dyn DnsProvider> =
            Arc::from(self.registry.create_provider(&config.provider)?);

        let cascades = IpVersion::all()
            .into_iter()
            .filter(|v| config.is_enabled(*v))
            .map(|v| {
                self.registry
                    .create_cascade(v, config.ip_sources.for_version(v))
            })
            .collect::<Result<Vec<_>>>()?;

        for cascade in cascades.iter().filter(|c| c.is_empty()) {
            warn!("No IP sources configured for {}", cascade.version());
        }

        let notifier = match &self.notifier_override {
            Some(notifier) => Some(Arc::clone(notifier)),
            None => WebhookNotifier::from_config(&config.webhook)?
                .map(|n| Arc::new(n) as Arc<dyn Notifier>),
        };

        let reconciler = Reconciler::new(
            Arc::clone(&provider),
            config.zone_id.trim(),
            config.record.clone(),
        );

        Ok(Components {
            config,
            provider,
            reconciler,
            cascades,
            notifier,
        })
    }

    /// Run one pass on its own task and apply the result
    ///
    /// Must be called with the run lock held.
    async fn run_pass_locked(&self, components: Arc<Components>) -> PassReport {
        let task = tokio::spawn(pass::execute(Arc::clone(&components)));

        let output = match task.await {
            Ok(output) => output,
            Err(e) => {
                let reason = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    "pass task was cancelled".to_string()
                };
                return self
                    .fail_pass(&components, Error::pass_failed(reason))
                    .await;
            }
        };

        if output.disabled {
            self.history
                .write()
                .await
                .info("No address family enabled, skipping pass");
            return PassReport::disabled();
        }

        let mut report = PassReport {
            success: false,
            disabled: false,
            message: String::new(),
            ipv4: None,
            ipv6: None,
            outcomes: output.outcomes,
        };
        for ip in output.addresses {
            match ip.version() {
                IpVersion::V4 => report.ipv4 = Some(ip),
                IpVersion::V6 => report.ipv6 = Some(ip),
            }
        }

        let total = report.outcomes.len();
        let succeeded = report.succeeded();
        report.success = output.detection_failures.is_empty() && succeeded == total;
        report.message = format!("Pass finished, succeeded: {}/{}", succeeded, total);

        {
            let mut state = self.state.write().await;
            state.last_ipv4 = report.ipv4.or(state.last_ipv4);
            state.last_ipv6 = report.ipv6.or(state.last_ipv6);
            state.last_check_time = Some(Utc::now());
        }
        {
            let mut history = self.history.write().await;
            for (version, error) in &output.detection_failures {
                history.error(format!("Failed to detect public {}: {}", version, error));
            }
            for outcome in &report.outcomes {
                if let Some(warning) = outcome.duplicate_warning() {
                    history.warning(warning);
                }
                if outcome.success() {
                    history.info(outcome.message());
                } else {
                    history.error(outcome.message());
                }
            }
            if report.success {
                history.info(report.message.clone());
            } else {
                history.error(report.message.clone());
            }
        }

        if let Some(notification) = Notification::for_outcomes(&report.outcomes)
            && let Some(notifier) = &components.notifier
        {
            notifier.send(&notification).await;
        }

        info!(
            success = report.success,
            ipv4 = ?report.ipv4.map(|ip| ip.to_string()),
            ipv6 = ?report.ipv6.map(|ip| ip.to_string()),
            "{}", report.message
        );
        report
    }

    async fn fail_pass(&self, components: &Components, error: Error) -> PassReport {
        let message = error.to_string();
        self.history.write().await.error(message.clone());

        if let Some(notifier) = &components.notifier {
            notifier
                .send(&Notification::Error {
                    message: message.clone(),
                })
                .await;
        }

        PassReport::failed(message)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "pass panicked".to_string()
    }
}
