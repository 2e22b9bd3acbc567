//! Threshold alerting for test-run and fraud-signal metrics.
//!
//! This crate turns a [`MetricsSummary`] into an alert/no-alert decision and,
//! on breach, fans the alert out to every configured notification channel
//! (Slack, Mailgun email, Telegram, generic webhook) with bounded per-channel
//! retry. Messages carry a signed, time-boxed report link minted by the
//! `report-access` crate.
//!
//! # Usage
//!
//! ```no_run
//! use alerting::{AlertDispatcher, AlertingConfig, MetricsSummary};
//!
//! # async fn run() {
//! // Channels are detected from environment variables at startup.
//! let config = AlertingConfig::default();
//! let dispatcher = AlertDispatcher::from_config(&config);
//!
//! let summary: MetricsSummary = serde_json::from_str(
//!     r#"{
//!         "successRatePercent": 94.12,
//!         "criticalAlerts": 1,
//!         "avgResponseTimeMs": 15800,
//!         "reportId": "run-42"
//!     }"#,
//! )
//! .unwrap();
//!
//! let result = dispatcher.dispatch(&summary).await;
//! assert!(result.triggered);
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`threshold::evaluate`] is the pure alert/no-alert decision
//! - [`ChannelAdapter`] is the seam between dispatch and delivery
//! - [`retry::run_with_retry`] bounds every channel's attempts
//! - [`AlertDispatcher`] joins all configured channels with an all-settled
//!   await, so one failing channel never blocks the others

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod metrics;
pub mod render;
pub mod retry;
pub mod threshold;

pub use channels::ChannelAdapter;
pub use config::AlertingConfig;
pub use dispatcher::{AlertDispatcher, DispatchResult, ReportLink};
pub use error::{ChannelError, ConfigError};
pub use message::{default_message, AlertMessage, MessageFactory, Severity};
pub use metrics::MetricsSummary;
pub use render::RenderContext;
pub use retry::{DeliveryOutcome, RetryPolicy, Sleeper, TokioSleeper};
pub use threshold::{evaluate, AlertDecision, Rule, ThresholdPolicy};
