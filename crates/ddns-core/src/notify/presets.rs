//! Built-in webhook templates for common chat services

use crate::config::WebhookConfig;
use serde_json::{Value, json};
use tracing::warn;

/// Header and body templates for a webhook
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookTemplate {
    pub headers: Value,
    pub body: Value,
}

/// Names accepted by [`preset`]
pub const PRESET_NAMES: &[&str] = &[
    "dingtalk",
    "slack",
    "discord",
    "wechat",
    "wechat_markdown",
    "generic",
];

/// Look up a built-in template set by name
pub fn preset(name: &str) -> Option<WebhookTemplate> {
    let json_headers = json!({ "Content-Type": "application/json" });

    let body = match name {
        "dingtalk" | "wechat" => json!({
            "msgtype": "text",
            "text": {
                "content": "DDNS\n${title}\n${message}\nTime: ${timestamp}"
            }
        }),
        "wechat_markdown" => json!({
            "msgtype": "markdown",
            "markdown": {
                "content": "## ${title}\n\n${message}\n\nTime: ${timestamp}"
            }
        }),
        "slack" => json!({
            "text": "${title}",
            "blocks": [
                {
                    "type": "header",
                    "text": { "type": "plain_text", "text": "${title}" }
                },
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": "${message}" }
                },
                {
                    "type": "context",
                    "elements": [
                        { "type": "mrkdwn", "text": "Time: ${timestamp}" }
                    ]
                }
            ]
        }),
        "discord" => json!({
            "username": "DDNS",
            "embeds": [
                {
                    "title": "${title}",
                    "description": "${message}",
                    "color": 5814783,
                    "timestamp": "${timestamp_iso}"
                }
            ]
        }),
        "generic" => return Some(generic()),
        _ => return None,
    };

    Some(WebhookTemplate {
        headers: json_headers,
        body,
    })
}

impl WebhookTemplate {
    /// Effective templates for a webhook configuration
    ///
    /// The named preset (or `generic` when none is named) provides the base.
    /// Configured headers are layered on top of the preset's headers, and a
    /// configured body replaces the preset body entirely.
    pub fn resolve(config: &WebhookConfig) -> Self {
        let name = config.preset.as_deref().unwrap_or("generic");
        let mut template = preset(name).unwrap_or_else(|| {
            warn!(preset = name, "Unknown webhook preset, using generic");
            generic()
        });

        if let (Value::Object(base), Value::Object(user)) = (&mut template.headers, &config.headers)
        {
            for (key, value) in user {
                base.insert(key.clone(), value.clone());
            }
        }

        if !config.body.is_null() {
            template.body = config.body.clone();
        }

        template
    }
}

fn generic() -> WebhookTemplate {
    WebhookTemplate {
        headers: json!({ "Content-Type": "application/json" }),
        body: json!({
            "service": "ddnsd",
            "type": "${type}",
            "title": "${title}",
            "message": "${message}",
            "timestamp": "${timestamp}",
            "data": {
                "domain": "${domain}",
                "old_ip": "${old_ip}",
                "new_ip": "${new_ip}",
                "action": "${action}"
            }
        }),
    }
}
