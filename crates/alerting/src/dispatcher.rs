//! Alert dispatch: evaluate, render, fan out, aggregate.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use report_access::AccessTokenService;

use crate::channels::email::EmailChannel;
use crate::channels::slack::SlackChannel;
use crate::channels::telegram::TelegramChannel;
use crate::channels::webhook::WebhookChannel;
use crate::channels::ChannelAdapter;
use crate::config::AlertingConfig;
use crate::message::{default_message, MessageFactory};
use crate::metrics::MetricsSummary;
use crate::render::RenderContext;
use crate::retry::{run_with_retry, DeliveryOutcome, RetryPolicy, Sleeper, TokioSleeper};
use crate::threshold::{evaluate, AlertDecision, Rule, ThresholdPolicy};

/// Subject recorded in report-access tokens minted for alert links.
const LINK_SUBJECT: &str = "alert-dispatcher";

/// Signed-URL wiring for rendered messages.
pub struct ReportLink {
    pub tokens: Arc<AccessTokenService>,
    /// Public base URL of the gateway, e.g. `https://qa.example.com`.
    pub base_url: String,
}

/// Aggregate result of one dispatch call. Created fresh per call.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub triggered: bool,
    pub slack: bool,
    pub email: bool,
    pub telegram: bool,
    pub webhook: bool,
    /// One entry per configured channel.
    pub outcomes: Vec<DeliveryOutcome>,
    /// Terminal failures, formatted `"<channel>: <last error>"`.
    pub errors: Vec<String>,
}

impl DispatchResult {
    /// The quiet path: nothing breached, nothing sent.
    fn quiet() -> Self {
        Self::default()
    }
}

/// Central dispatcher owning the channel set.
///
/// Constructed once at process startup and shared read-only by every
/// dispatch call; nothing here mutates after construction.
pub struct AlertDispatcher {
    policy: ThresholdPolicy,
    retry: RetryPolicy,
    channels: Vec<Arc<dyn ChannelAdapter>>,
    sleeper: Arc<dyn Sleeper>,
    message_factory: Box<MessageFactory>,
    link: Option<ReportLink>,
}

impl AlertDispatcher {
    /// Build from config and environment: one adapter per enabled channel,
    /// each detecting its own credentials.
    #[must_use]
    pub fn from_config(config: &AlertingConfig) -> Self {
        let mut channels: Vec<Arc<dyn ChannelAdapter>> = Vec::new();
        if config.slack_enabled {
            channels.push(Arc::new(SlackChannel::from_env()));
        }
        if config.email_enabled {
            channels.push(Arc::new(EmailChannel::from_env()));
        }
        if config.telegram_enabled {
            channels.push(Arc::new(TelegramChannel::from_env()));
        }
        if config.webhook_enabled {
            channels.push(Arc::new(WebhookChannel::from_env()));
        }

        let configured = channels.iter().filter(|c| c.enabled()).count();
        if configured == 0 {
            warn!("no alert channels configured");
        } else {
            info!(channel_count = configured, "alert dispatcher initialized");
        }

        Self::with_channels(config.thresholds.clone(), config.retry_config, channels)
    }

    /// Build with an explicit channel set (tests, embedding).
    #[must_use]
    pub fn with_channels(
        policy: ThresholdPolicy,
        retry: RetryPolicy,
        channels: Vec<Arc<dyn ChannelAdapter>>,
    ) -> Self {
        Self {
            policy,
            retry,
            channels,
            sleeper: Arc::new(TokioSleeper),
            message_factory: Box::new(default_message),
            link: None,
        }
    }

    /// Replace the scheduler seam (tests simulate delay without waiting).
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the message factory.
    #[must_use]
    pub fn with_message_factory(mut self, factory: Box<MessageFactory>) -> Self {
        self.message_factory = factory;
        self
    }

    /// Attach signed report links to outgoing messages.
    #[must_use]
    pub fn with_report_link(mut self, link: ReportLink) -> Self {
        self.link = Some(link);
        self
    }

    /// Number of channels that are actually configured.
    #[must_use]
    pub fn configured_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.enabled()).count()
    }

    /// Evaluate a summary and, when triggered, deliver to all configured
    /// channels concurrently.
    ///
    /// Channels never block each other: each one runs its own sequential
    /// retry loop and all are joined with an all-settled await. The quiet
    /// path returns without touching the network.
    pub async fn dispatch(&self, summary: &MetricsSummary) -> DispatchResult {
        let decision = evaluate(summary, &self.policy);
        for note in &decision.data_quality {
            warn!(report_id = %summary.report_id, note = %note, "metrics data-quality issue");
        }
        if !decision.triggered {
            debug!(report_id = %summary.report_id, "thresholds not breached, nothing to send");
            return DispatchResult::quiet();
        }

        info!(
            report_id = %summary.report_id,
            breached = ?decision.breached,
            "thresholds breached, dispatching alert"
        );

        let message = (self.message_factory)(summary, &decision);
        let ctx = self.render_context(summary, &decision);

        let mut sends = Vec::new();
        for channel in &self.channels {
            if !channel.enabled() {
                debug!(channel = channel.name(), "channel not configured, skipping");
                continue;
            }
            let channel = Arc::clone(channel);
            let message = &message;
            let ctx = &ctx;
            sends.push(async move {
                run_with_retry(channel.name(), &self.retry, self.sleeper.as_ref(), || {
                    channel.send(message, ctx)
                })
                .await
            });
        }

        let outcomes = join_all(sends).await;

        let mut result = DispatchResult {
            triggered: true,
            ..DispatchResult::default()
        };
        for outcome in outcomes {
            match outcome.channel.as_str() {
                "slack" => result.slack = outcome.success,
                "email" => result.email = outcome.success,
                "telegram" => result.telegram = outcome.success,
                "webhook" => result.webhook = outcome.success,
                _ => {}
            }
            if !outcome.success {
                if let Some(error) = &outcome.last_error {
                    result.errors.push(format!("{}: {error}", outcome.channel));
                }
            }
            result.outcomes.push(outcome);
        }

        info!(
            report_id = %summary.report_id,
            delivered = result.outcomes.iter().filter(|o| o.success).count(),
            failed = result.errors.len(),
            "alert dispatch settled"
        );

        result
    }

    fn render_context(&self, summary: &MetricsSummary, decision: &AlertDecision) -> RenderContext {
        let signed_url = self.link.as_ref().and_then(|link| {
            match link
                .tokens
                .signed_report_url(&link.base_url, &summary.report_id, LINK_SUBJECT)
            {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, "failed to mint report link, sending alert without it");
                    None
                }
            }
        });

        let failures = decision
            .breached
            .iter()
            .map(|rule| match rule {
                Rule::SuccessRate => format!(
                    "Success rate {} below required {:.2}%",
                    summary
                        .success_rate_percent
                        .map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}%")),
                    self.policy.min_success_rate_percent()
                ),
                Rule::CriticalAlerts => format!(
                    "{} critical alert(s), threshold {}",
                    summary.critical_alerts.unwrap_or(0),
                    self.policy.critical_alerts
                ),
                Rule::ResponseTime => format!(
                    "Average response time {} ms over the {} ms limit",
                    summary
                        .avg_response_time_ms
                        .map_or_else(|| "n/a".to_string(), |a| format!("{a:.0}")),
                    self.policy.response_time
                ),
            })
            .collect();

        RenderContext::new(signed_url, failures)
    }
}
