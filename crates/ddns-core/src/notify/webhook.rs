//! Webhook delivery
//!
//! One JSON POST per notification. Failures are logged and reported as
//! `false`; they never reach the synchronization pass.

use super::template::{build_variables, scalar_text, substitute};
use super::{Notification, NotificationContext, WebhookTemplate};
use crate::config::WebhookConfig;
use crate::error::{Error, Result};
use crate::traits::Notifier;
use async_trait::async_trait;
use chrono::Local;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timeout for one webhook POST
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

/// User agent sent unless the configured headers override it
const DEFAULT_USER_AGENT: &str = concat!("ddnsd-notifier/", env!("CARGO_PKG_VERSION"));

/// Sends notifications to a single HTTP endpoint
pub struct WebhookNotifier {
    url: String,
    template: WebhookTemplate,
    client: reqwest::Client,
}

// Header values often carry tokens
impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&String> = match &self.template.headers {
            Value::Object(map) => map.keys().collect(),
            _ => Vec::new(),
        };
        f.debug_struct("WebhookNotifier")
            .field("url", &self.url)
            .field("headers", &header_names)
            .finish()
    }
}

impl WebhookNotifier {
    /// Create a notifier
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint receiving the POST
    /// - `template`: Header and body templates
    pub fn new(url: impl Into<String>, template: WebhookTemplate) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build webhook client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            template,
            client,
        })
    }

    /// Create a notifier from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Some(notifier))`: The webhook is enabled and has a URL
    /// - `Ok(None)`: Notifications are switched off
    pub fn from_config(config: &WebhookConfig) -> Result<Option<Self>> {
        if !config.is_active() {
            return Ok(None);
        }
        Self::new(config.url.trim(), WebhookTemplate::resolve(config)).map(Some)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Render headers and body for a context
    pub fn render(&self, context: &NotificationContext) -> (HeaderMap, Value) {
        let vars = build_variables(context, Local::now());

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Value::Object(user) = substitute(&self.template.headers, &vars) {
            for (name, value) in user {
                let text = scalar_text(&value);
                match (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(&text),
                ) {
                    (Ok(name), Ok(value)) => {
                        headers.insert(name, value);
                    }
                    _ => warn!(header = %name, "Skipping invalid webhook header"),
                }
            }
        }

        let body = substitute(&self.template.body, &vars);
        (headers, body)
    }

    /// Render and POST one notification context
    ///
    /// # Returns
    ///
    /// `true` on a 2xx response, `false` on any other status or transport error
    pub async fn dispatch(&self, context: &NotificationContext) -> bool {
        let (headers, body) = self.render(context);
        debug!(url = %self.url, "Sending webhook notification");

        let response = match self
            .client
            .post(&self.url)
            .headers(headers)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Webhook request failed: {}", e);
                return false;
            }
        };

        let status = response.status();
        if status.is_success() {
            info!(%status, "Webhook notification delivered");
            true
        } else {
            let text = response.text().await.unwrap_or_default();
            error!(%status, body = %text, "Webhook endpoint rejected notification");
            false
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> bool {
        self.dispatch(&notification.context()).await
    }
}
