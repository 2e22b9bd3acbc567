//! Notification channel adapters.

pub mod email;
pub mod slack;
pub mod telegram;
pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::AlertMessage;
use crate::render::RenderContext;

/// Trait for alert delivery channels (Slack, email, Telegram, webhook).
///
/// An adapter whose configuration is missing reports `enabled() == false`
/// and is skipped by the dispatcher instead of failing the dispatch.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Stable channel name used in outcomes and logs.
    fn name(&self) -> &'static str;

    /// Whether the adapter has the configuration it needs to deliver.
    fn enabled(&self) -> bool;

    /// Deliver one alert. Errors are transient and eligible for retry.
    async fn send(&self, message: &AlertMessage, ctx: &RenderContext)
        -> Result<(), ChannelError>;
}

/// Per-request timeout for channel HTTP calls. A hung third-party API counts
/// as a failed attempt instead of stalling the whole dispatch.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_default()
}
