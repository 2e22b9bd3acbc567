//! Slack notification channel (incoming webhook or bot token).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChannelError;
use crate::message::AlertMessage;
use crate::render::{escape_slack, substitute, RenderContext};

use super::{http_client, ChannelAdapter};

/// Environment variable for the incoming-webhook URL.
const ENV_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
/// Environment variables for the bot-token fallback.
const ENV_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
const ENV_CHANNEL_ID: &str = "SLACK_CHANNEL_ID";

const BOT_API_URL: &str = "https://slack.com/api/chat.postMessage";

/// Free-text attachment body; structure lives in the typed payload below.
const DEFAULT_BODY: &str = "{{failures}}";

/// How this adapter talks to Slack.
enum Mode {
    /// Incoming webhook URL; success is HTTP 200.
    Webhook(String),
    /// Bot token + channel id via `chat.postMessage`. The API answers 200
    /// even on rejection, so the body's `ok` flag decides.
    Bot { token: String, channel: String },
}

/// Slack alert channel.
pub struct SlackChannel {
    mode: Option<Mode>,
    body_template: String,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Create from environment; the webhook URL wins over bot credentials.
    #[must_use]
    pub fn from_env() -> Self {
        let mode = if let Ok(url) = std::env::var(ENV_WEBHOOK_URL) {
            Some(Mode::Webhook(url))
        } else {
            match (std::env::var(ENV_BOT_TOKEN), std::env::var(ENV_CHANNEL_ID)) {
                (Ok(token), Ok(channel)) => Some(Mode::Bot { token, channel }),
                _ => None,
            }
        };

        if mode.is_none() {
            debug!("Slack alerts disabled (SLACK_WEBHOOK_URL / SLACK_BOT_TOKEN not set)");
        }

        Self::with_mode(mode)
    }

    /// Create a webhook-mode channel with a specific URL.
    #[must_use]
    pub fn with_webhook_url(url: impl Into<String>) -> Self {
        Self::with_mode(Some(Mode::Webhook(url.into())))
    }

    /// Create a bot-mode channel with explicit credentials.
    #[must_use]
    pub fn with_bot(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self::with_mode(Some(Mode::Bot {
            token: token.into(),
            channel: channel.into(),
        }))
    }

    fn with_mode(mode: Option<Mode>) -> Self {
        Self {
            mode,
            body_template: DEFAULT_BODY.to_string(),
            client: http_client(),
        }
    }

    fn payload(
        &self,
        message: &AlertMessage,
        ctx: &RenderContext,
        channel: Option<&str>,
    ) -> SlackPayload {
        let fields = message
            .metadata
            .iter()
            .map(|(title, value)| SlackField {
                title: title.clone(),
                value: escape_slack(value),
                short: true,
            })
            .collect();

        let mut text = substitute(&self.body_template, &ctx.vars(message));
        if let Some(url) = &ctx.signed_url {
            text.push_str(&format!("\n<{url}|View full report>"));
        }

        let attachment = SlackAttachment {
            fallback: escape_slack(&message.title),
            color: message.severity.color().to_string(),
            title: escape_slack(&message.title),
            text,
            fields,
            footer: Some(format!(
                "{} | {}",
                message.severity.as_str(),
                message.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            ts: Some(message.timestamp.timestamp()),
        };

        SlackPayload {
            username: "Watchtower".to_string(),
            icon_emoji: ":rotating_light:".to_string(),
            channel: channel.map(str::to_string),
            attachments: vec![attachment],
        }
    }
}

#[async_trait]
impl ChannelAdapter for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn enabled(&self) -> bool {
        self.mode.is_some()
    }

    async fn send(
        &self,
        message: &AlertMessage,
        ctx: &RenderContext,
    ) -> Result<(), ChannelError> {
        let mode = self
            .mode
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured(ENV_WEBHOOK_URL.to_string()))?;

        match mode {
            Mode::Webhook(url) => {
                let payload = self.payload(message, ctx, None);
                let response = self.client.post(url).json(&payload).send().await?;

                if response.status().is_success() {
                    debug!(channel = "slack", "alert sent");
                    Ok(())
                } else {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    Err(ChannelError::Status {
                        service: "slack",
                        status,
                        body,
                    })
                }
            }
            Mode::Bot { token, channel } => {
                let payload = self.payload(message, ctx, Some(channel));
                let response = self
                    .client
                    .post(BOT_API_URL)
                    .bearer_auth(token)
                    .json(&payload)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(ChannelError::Status {
                        service: "slack",
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    });
                }

                let body: BotResponse = response.json().await?;
                if body.ok {
                    debug!(channel = "slack", "alert sent");
                    Ok(())
                } else {
                    Err(ChannelError::Rejected {
                        service: "slack",
                        detail: body.error.unwrap_or_else(|| "unknown error".to_string()),
                    })
                }
            }
        }
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SlackPayload {
    username: String,
    icon_emoji: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    fallback: String,
    color: String,
    title: String,
    text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<SlackField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SlackField {
    title: String,
    value: String,
    short: bool,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}
