//! Generic webhook channel: POSTs the full alert document as JSON.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::ChannelError;
use crate::message::AlertMessage;
use crate::render::RenderContext;

use super::{http_client, ChannelAdapter};

const ENV_WEBHOOK_URL: &str = "ALERT_WEBHOOK_URL";

/// Generic JSON webhook channel for in-house consumers.
pub struct WebhookChannel {
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookChannel {
    /// Create from the `ALERT_WEBHOOK_URL` environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        let url = std::env::var(ENV_WEBHOOK_URL).ok();
        if url.is_none() {
            debug!("webhook alerts disabled (ALERT_WEBHOOK_URL not set)");
        }
        Self {
            url,
            client: http_client(),
        }
    }

    /// Create with a specific target URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            client: http_client(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn enabled(&self) -> bool {
        self.url.is_some()
    }

    async fn send(
        &self,
        message: &AlertMessage,
        ctx: &RenderContext,
    ) -> Result<(), ChannelError> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured(ENV_WEBHOOK_URL.to_string()))?;

        let payload = WebhookPayload {
            title: &message.title,
            severity: message.severity.as_str(),
            timestamp: message.timestamp,
            report_id: &message.report_id,
            metadata: &message.metadata,
            failures: &ctx.failures,
            signed_url: ctx.signed_url.as_deref(),
        };

        let response = self.client.post(url).json(&payload).send().await?;

        if response.status().is_success() {
            debug!(channel = "webhook", "alert sent");
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(ChannelError::Status {
                service: "webhook",
                status,
                body,
            })
        }
    }
}

/// Alert document shape for webhook consumers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    title: &'a str,
    severity: &'a str,
    timestamp: DateTime<Utc>,
    report_id: &'a str,
    metadata: &'a [(String, String)],
    failures: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    signed_url: Option<&'a str>,
}
