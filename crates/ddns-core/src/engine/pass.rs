//! One synchronization pass
//!
//! [`execute`] does the network work (detect, then reconcile per family) and
//! returns a [`PassOutput`]. It touches no engine state, which lets the engine
//! run it on its own task and apply the result afterwards.

use super::Components;
use crate::address::PublicIp;
use crate::reconcile::ReconciliationOutcome;
use crate::traits::IpVersion;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Raw result of a pass before bookkeeping
#[derive(Debug, Default)]
pub(crate) struct PassOutput {
    pub disabled: bool,
    pub addresses: Vec<PublicIp>,
    pub detection_failures: Vec<(IpVersion, String)>,
    pub outcomes: Vec<ReconciliationOutcome>,
}

/// Detect and reconcile every enabled family
pub(crate) async fn execute(components: Arc<Components>) -> PassOutput {
    let config = &components.config;
    if !IpVersion::all().into_iter().any(|v| config.is_enabled(v)) {
        return PassOutput {
            disabled: true,
            ..PassOutput::default()
        };
    }

    let mut output = PassOutput::default();
    for cascade in &components.cascades {
        let version = cascade.version();
        debug!("Detecting public {}", version);

        match cascade.detect().await {
            Ok(ip) => {
                let targets = config.targets(version);
                let outcomes = components.reconciler.reconcile_all(&targets, &ip).await;
                output.outcomes.extend(outcomes);
                output.addresses.push(ip);
            }
            Err(e) => output.detection_failures.push((version, e.to_string())),
        }
    }

    output
}

/// What a pass did, as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    /// Every enabled family was detected and every domain reconciled
    pub success: bool,
    /// Neither family is enabled; nothing was attempted
    pub disabled: bool,
    pub message: String,
    pub ipv4: Option<PublicIp>,
    pub ipv6: Option<PublicIp>,
    pub outcomes: Vec<ReconciliationOutcome>,
}

impl PassReport {
    pub(crate) fn not_running() -> Self {
        Self::failed("service is not running")
    }

    pub(crate) fn disabled() -> Self {
        Self {
            success: true,
            disabled: true,
            message: "no address family enabled, nothing to do".to_string(),
            ipv4: None,
            ipv6: None,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            disabled: false,
            message: message.into(),
            ipv4: None,
            ipv6: None,
            outcomes: Vec::new(),
        }
    }

    /// Number of successful outcomes
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }

    /// Detected address for a family, if any
    pub fn address(&self, version: IpVersion) -> Option<&PublicIp> {
        match version {
            IpVersion::V4 => self.ipv4.as_ref(),
            IpVersion::V6 => self.ipv6.as_ref(),
        }
    }
}
