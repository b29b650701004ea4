//! Notifications
//!
//! A [`Notification`] describes something worth telling the outside world
//! about: a record change, a batch of changes, a lifecycle event or an error.
//! Each one flattens into a [`NotificationContext`] which the
//! [`WebhookNotifier`] renders through the configured templates.

pub mod presets;
pub mod template;
pub mod webhook;

pub use presets::WebhookTemplate;
pub use webhook::WebhookNotifier;

use crate::reconcile::ReconciliationOutcome;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Flat name → value mapping a notification exposes to templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationContext(Map<String, Value>);

impl NotificationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert only if the key is not present yet
    pub fn insert_default(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for NotificationContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Severity of a system alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
            AlertLevel::Success => "success",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            AlertLevel::Info => "ℹ️",
            AlertLevel::Warning => "⚠️",
            AlertLevel::Error => "❌",
            AlertLevel::Success => "✅",
        }
    }
}

/// Everything the engine can notify about
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Exactly one domain was processed in a pass
    IpUpdate(ReconciliationOutcome),
    /// Two or more domains were processed in a pass
    Batch(Vec<ReconciliationOutcome>),
    /// The engine started
    Startup { domains: Vec<String> },
    /// A pass failed unexpectedly
    Error { message: String },
    /// Connectivity test
    Test,
    /// Free-form alert
    SystemAlert {
        level: AlertLevel,
        title: String,
        content: String,
    },
    /// Caller-built context, sent as-is (with `type`/`title` defaults)
    Custom(NotificationContext),
}

impl Notification {
    /// Pick the notification for a pass's outcomes
    ///
    /// `None` when nothing was processed.
    pub fn for_outcomes(outcomes: &[ReconciliationOutcome]) -> Option<Self> {
        match outcomes {
            [] => None,
            [single] => Some(Notification::IpUpdate(single.clone())),
            many => Some(Notification::Batch(many.to_vec())),
        }
    }

    /// Value of the `type` variable
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::IpUpdate(_) => "ip_update",
            Notification::Batch(_) => "batch_update",
            Notification::Startup { .. } => "startup",
            Notification::Error { .. } => "error",
            Notification::Test => "test",
            Notification::SystemAlert { .. } => "system_alert",
            Notification::Custom(_) => "custom",
        }
    }

    /// Flatten into template variables
    pub fn context(&self) -> NotificationContext {
        let mut ctx = NotificationContext::new();
        ctx.insert("type", self.kind());

        match self {
            Notification::IpUpdate(outcome) => {
                let title = match outcome.action {
                    crate::reconcile::RecordAction::Created => "DNS record created".to_string(),
                    action => format!("DNS record {}", action),
                };
                ctx.insert("domain", outcome.domain.clone());
                ctx.insert("old_ip", outcome.old_value.clone());
                ctx.insert("new_ip", outcome.new_value.clone());
                ctx.insert("action", outcome.action.as_str());
                ctx.insert("record_type", outcome.record_type.clone());
                ctx.insert("success", outcome.success());
                ctx.insert("error", outcome.error.clone());
                ctx.insert("title", title);
                ctx.insert("message", outcome.message());
            }
            Notification::Batch(outcomes) => {
                let total = outcomes.len();
                let succeeded = outcomes.iter().filter(|o| o.success()).count();
                let results: Vec<Value> = outcomes.iter().map(outcome_json).collect();

                ctx.insert("results", results);
                ctx.insert("success_count", succeeded);
                ctx.insert("total_count", total);
                ctx.insert("success_rate", format!("{succeeded}/{total}"));
                ctx.insert("is_partial_success", succeeded > 0 && succeeded < total);
                ctx.insert("is_all_success", succeeded == total);
                ctx.insert("is_all_failed", succeeded == 0);
                ctx.insert("title", "DNS batch update result");
                ctx.insert(
                    "message",
                    format!("Batch update finished: {succeeded}/{total} succeeded"),
                );
            }
            Notification::Startup { domains } => {
                ctx.insert("title", "DDNS service started");
                ctx.insert("domains", domains.clone());
                ctx.insert("domain_count", domains.len());
                ctx.insert(
                    "message",
                    format!("Service started, watching {} domain(s)", domains.len()),
                );
                ctx.insert("status", "running");
            }
            Notification::Error { message } => {
                ctx.insert("title", "DDNS error");
                ctx.insert("error_message", message.clone());
                ctx.insert("message", format!("Error: {message}"));
                ctx.insert("level", "error");
                ctx.insert("status", "error");
            }
            Notification::Test => {
                ctx.insert("title", "Test notification");
                ctx.insert(
                    "message",
                    "This is a test message to verify webhook delivery",
                );
                ctx.insert("status", "success");
                ctx.insert("description", "DDNS webhook connection is working");
            }
            Notification::SystemAlert {
                level,
                title,
                content,
            } => {
                ctx.insert("title", title.clone());
                ctx.insert("content", content.clone());
                ctx.insert("level", level.as_str());
                ctx.insert(
                    "message",
                    format!("[{}] {}: {}", level.as_str().to_uppercase(), title, content),
                );
                ctx.insert("icon", level.icon());
            }
            Notification::Custom(custom) => {
                for (key, value) in custom.iter() {
                    ctx.insert(key.clone(), value.clone());
                }
                ctx.insert_default("title", "Custom notification");
            }
        }

        ctx
    }
}

fn outcome_json(outcome: &ReconciliationOutcome) -> Value {
    json!({
        "domain": outcome.domain,
        "record_type": outcome.record_type,
        "action": outcome.action.as_str(),
        "success": outcome.success(),
        "old_ip": outcome.old_value,
        "new_ip": outcome.new_value,
        "record_id": outcome.record_id,
        "message": outcome.message(),
        "error": outcome.error,
        "timestamp": outcome.timestamp.to_rfc3339(),
    })
}
