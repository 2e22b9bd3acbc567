//! Email notification channel backed by the Mailgun HTTP API.

use std::fmt::Write as _;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ChannelError;
use crate::message::AlertMessage;
use crate::render::{escape_html, RenderContext};

use super::{http_client, ChannelAdapter};

const ENV_API_KEY: &str = "MAILGUN_API_KEY";
const ENV_DOMAIN: &str = "MAILGUN_DOMAIN";
const ENV_RECIPIENT: &str = "ALERT_RECIPIENT_EMAIL";

const DEFAULT_API_BASE: &str = "https://api.mailgun.net";

struct EmailConfig {
    api_key: String,
    domain: String,
    recipient: String,
}

/// Mailgun email alert channel.
pub struct EmailChannel {
    config: Option<EmailConfig>,
    api_base: String,
    client: reqwest::Client,
}

impl EmailChannel {
    /// Create from environment variables. All three are required; anything
    /// missing leaves the channel disabled.
    #[must_use]
    pub fn from_env() -> Self {
        let config = match (
            std::env::var(ENV_API_KEY),
            std::env::var(ENV_DOMAIN),
            std::env::var(ENV_RECIPIENT),
        ) {
            (Ok(api_key), Ok(domain), Ok(recipient)) => Some(EmailConfig {
                api_key,
                domain,
                recipient,
            }),
            _ => {
                debug!("email alerts disabled (MAILGUN_API_KEY / MAILGUN_DOMAIN / ALERT_RECIPIENT_EMAIL not set)");
                None
            }
        };

        Self::with_config(config)
    }

    /// Create with explicit credentials.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        domain: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self::with_config(Some(EmailConfig {
            api_key: api_key.into(),
            domain: domain.into(),
            recipient: recipient.into(),
        }))
    }

    /// Point the adapter at a different API host (tests).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn with_config(config: Option<EmailConfig>) -> Self {
        Self {
            config,
            api_base: DEFAULT_API_BASE.to_string(),
            client: http_client(),
        }
    }

    /// Build the HTML body. All dynamic values go through HTML escaping.
    fn html_body(message: &AlertMessage, ctx: &RenderContext) -> String {
        let mut rows = String::new();
        for (name, value) in &message.metadata {
            let _ = write!(
                rows,
                "<tr><td style=\"padding:4px 12px 4px 0\"><strong>{}</strong></td><td>{}</td></tr>",
                escape_html(name),
                escape_html(value)
            );
        }

        let mut html = format!(
            "<h2>{}</h2><p>{} alert at {}</p>",
            escape_html(&message.title),
            escape_html(message.severity.as_str()),
            message.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        if !ctx.failures.is_empty() {
            let mut items = String::new();
            for line in &ctx.failures {
                let _ = write!(items, "<li>{}</li>", escape_html(line));
            }
            let _ = write!(html, "<ul>{items}</ul>");
        }
        let _ = write!(html, "<table>{rows}</table>");
        if let Some(url) = &ctx.signed_url {
            let _ = write!(
                html,
                "<p><a href=\"{}\">View full report</a></p>",
                escape_html(url)
            );
        }
        html
    }
}

#[async_trait]
impl ChannelAdapter for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn send(
        &self,
        message: &AlertMessage,
        ctx: &RenderContext,
    ) -> Result<(), ChannelError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured(ENV_API_KEY.to_string()))?;

        let url = format!("{}/v3/{}/messages", self.api_base, config.domain);
        let from = format!("Watchtower Alerts <alerts@{}>", config.domain);
        let subject = format!("[{}] {}", message.severity.as_str(), message.title);
        let html = Self::html_body(message, ctx);

        let form = [
            ("from", from.as_str()),
            ("to", config.recipient.as_str()),
            ("subject", subject.as_str()),
            ("html", html.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&config.api_key))
            .form(&form)
            .send()
            .await?;

        if response.status().is_success() {
            debug!(channel = "email", to = %config.recipient, "alert sent");
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(ChannelError::Status {
                service: "mailgun",
                status,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Severity;
    use chrono::Utc;

    fn message() -> AlertMessage {
        AlertMessage {
            title: "Threshold breach in run <run-1>".to_string(),
            severity: Severity::High,
            timestamp: Utc::now(),
            metadata: vec![("Failed".to_string(), "20".to_string())],
            report_id: "run-1".to_string(),
        }
    }

    #[test]
    fn test_html_body_escapes_values() {
        let html = EmailChannel::html_body(&message(), &RenderContext::default());

        assert!(html.contains("Threshold breach in run &lt;run-1&gt;"));
        assert!(html.contains("<strong>Failed</strong>"));
        assert!(!html.contains("<run-1>"));
    }

    #[test]
    fn test_html_body_includes_report_link() {
        let ctx = RenderContext::new(
            Some("https://reports.example/r/run-1?token=abc".to_string()),
            vec!["Average response time 15800 ms over the 500 ms limit".to_string()],
        );
        let html = EmailChannel::html_body(&message(), &ctx);

        assert!(html.contains("href=\"https://reports.example/r/run-1?token=abc\""));
        assert!(html.contains("<li>Average response time 15800 ms over the 500 ms limit</li>"));
    }

    #[test]
    fn test_unconfigured_channel_is_disabled() {
        let channel = EmailChannel::with_config(None);
        assert!(!channel.enabled());
    }
}
