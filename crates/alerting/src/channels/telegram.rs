//! Telegram bot notification channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChannelError;
use crate::message::AlertMessage;
use crate::render::{escape_markdown, RenderContext};

use super::{http_client, ChannelAdapter};

const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

struct TelegramConfig {
    token: String,
    chat_id: String,
}

/// Telegram alert channel.
///
/// `sendMessage` answers HTTP 200 with `ok == false` on API-level errors,
/// so success requires both a 2xx status and the body flag.
pub struct TelegramChannel {
    config: Option<TelegramConfig>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// Create from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let config = match (std::env::var(ENV_BOT_TOKEN), std::env::var(ENV_CHAT_ID)) {
            (Ok(token), Ok(chat_id)) => Some(TelegramConfig { token, chat_id }),
            _ => {
                debug!("Telegram alerts disabled (TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set)");
                None
            }
        };

        Self::with_config(config)
    }

    /// Create with explicit credentials.
    #[must_use]
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_config(Some(TelegramConfig {
            token: token.into(),
            chat_id: chat_id.into(),
        }))
    }

    /// Point the adapter at a different API host (tests).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn with_config(config: Option<TelegramConfig>) -> Self {
        Self {
            config,
            api_base: DEFAULT_API_BASE.to_string(),
            client: http_client(),
        }
    }

    /// Build the Markdown message text. User-supplied values are escaped;
    /// the emphasis markers around title and severity are ours.
    fn text(message: &AlertMessage, ctx: &RenderContext) -> String {
        let mut text = format!(
            "*{}*\n_{}_ | {}\n",
            escape_markdown(&message.title),
            message.severity.as_str(),
            message.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        for line in &ctx.failures {
            text.push_str(&format!("- {}\n", escape_markdown(line)));
        }
        for (name, value) in &message.metadata {
            text.push_str(&format!(
                "{}: {}\n",
                escape_markdown(name),
                escape_markdown(value)
            ));
        }
        if let Some(url) = &ctx.signed_url {
            text.push_str(&format!("[View full report]({url})"));
        }
        text
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
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
            .ok_or_else(|| ChannelError::NotConfigured(ENV_BOT_TOKEN.to_string()))?;

        let url = format!("{}/bot{}/sendMessage", self.api_base, config.token);
        let payload = SendMessage {
            chat_id: config.chat_id.clone(),
            text: Self::text(message, ctx),
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Status {
                service: "telegram",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: ApiResponse = response.json().await?;
        if body.ok {
            debug!(channel = "telegram", "alert sent");
            Ok(())
        } else {
            Err(ChannelError::Rejected {
                service: "telegram",
                detail: body
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }
}

// =============================================================================
// Telegram API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendMessage {
    chat_id: String,
    text: String,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Severity;
    use chrono::Utc;

    fn message() -> AlertMessage {
        AlertMessage {
            title: "Run run_1 *failed*".to_string(),
            severity: Severity::Medium,
            timestamp: Utc::now(),
            metadata: vec![("Success Rate".to_string(), "94.12%".to_string())],
            report_id: "run_1".to_string(),
        }
    }

    #[test]
    fn test_text_escapes_markdown_in_values() {
        let text = TelegramChannel::text(&message(), &RenderContext::default());

        // The title's own markers are escaped, ours are not.
        assert!(text.starts_with("*Run run\\_1 \\*failed\\*"));
        assert!(text.contains("Success Rate: 94.12%"));
    }

    #[test]
    fn test_text_includes_failures_and_link() {
        let ctx = RenderContext::new(
            Some("https://reports.example/r/run_1?token=abc".to_string()),
            vec!["2 critical alert(s), threshold 1".to_string()],
        );
        let text = TelegramChannel::text(&message(), &ctx);

        assert!(text.contains("- 2 critical alert(s), threshold 1"));
        assert!(text.ends_with("[View full report](https://reports.example/r/run_1?token=abc)"));
    }

    #[test]
    fn test_unconfigured_channel_is_disabled() {
        let channel = TelegramChannel::with_config(None);
        assert!(!channel.enabled());
    }
}
