//! Integration tests for alert dispatch against mock channel endpoints.
//!
//! These tests stand up real HTTP endpoints that play the role of the
//! third-party channel APIs, then verify the end-to-end dispatch behavior:
//! quiet runs stay off the network, channels fail independently, and retry
//! bounds hold.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::Utc;
use serial_test::serial;
use tokio::net::TcpListener;

use alerting::channels::slack::SlackChannel;
use alerting::channels::telegram::TelegramChannel;
use alerting::channels::webhook::WebhookChannel;
use alerting::{
    AlertDispatcher, ChannelAdapter, MetricsSummary, RetryPolicy, Sleeper, ThresholdPolicy,
};

// =============================================================================
// Mock channel endpoint
// =============================================================================

/// Scripted stand-in for a third-party channel API.
struct MockChannelState {
    /// Requests received so far.
    requests: AtomicU32,
    /// Respond 500 to this many requests before succeeding.
    fail_first: u32,
    /// Answer with a Telegram-style `{"ok": true}` body.
    telegram_style: bool,
}

async fn mock_channel_handler(State(state): State<Arc<MockChannelState>>) -> Response {
    let n = state.requests.fetch_add(1, Ordering::SeqCst) + 1;
    if n <= state.fail_first {
        return (StatusCode::INTERNAL_SERVER_ERROR, "simulated outage").into_response();
    }
    if state.telegram_style {
        Json(serde_json::json!({ "ok": true, "result": {} })).into_response()
    } else {
        (StatusCode::OK, "ok").into_response()
    }
}

/// Start a mock channel endpoint on a random port.
async fn start_mock(fail_first: u32, telegram_style: bool) -> (SocketAddr, Arc<MockChannelState>) {
    let state = Arc::new(MockChannelState {
        requests: AtomicU32::new(0),
        fail_first,
        telegram_style,
    });

    let app = Router::new()
        .fallback(mock_channel_handler)
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

// =============================================================================
// Test fixtures
// =============================================================================

/// Sleeper that returns immediately so retry tests run at full speed.
struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _delay: Duration) {}
}

fn breaching_summary() -> MetricsSummary {
    MetricsSummary {
        total_requests: 340,
        fail_count: 20,
        success_rate_percent: Some(94.12),
        avg_response_time_ms: Some(15800.0),
        critical_alerts: Some(1),
        generated_at: Utc::now(),
        report_id: "run-1".to_string(),
    }
}

fn safe_summary() -> MetricsSummary {
    MetricsSummary {
        total_requests: 340,
        fail_count: 0,
        success_rate_percent: Some(99.9),
        avg_response_time_ms: Some(120.0),
        critical_alerts: Some(0),
        generated_at: Utc::now(),
        report_id: "run-2".to_string(),
    }
}

fn dispatcher(channels: Vec<Arc<dyn ChannelAdapter>>, max_retries: u32) -> AlertDispatcher {
    AlertDispatcher::with_channels(
        ThresholdPolicy::default(),
        RetryPolicy {
            max_retries,
            retry_delay: 2000,
        },
        channels,
    )
    .with_sleeper(Arc::new(NoSleep))
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_no_alert_is_network_silent() {
    let (addr, state) = start_mock(0, false).await;
    let channels: Vec<Arc<dyn ChannelAdapter>> =
        vec![Arc::new(WebhookChannel::new(format!("http://{addr}/alert")))];

    let result = dispatcher(channels, 3).dispatch(&safe_summary()).await;

    assert!(!result.triggered);
    assert!(result.outcomes.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(state.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_partial_failure_isolation() {
    let (ok_addr, _) = start_mock(0, false).await;
    let (fail_addr, _) = start_mock(u32::MAX, false).await;
    let (tg_addr, _) = start_mock(0, true).await;

    let channels: Vec<Arc<dyn ChannelAdapter>> = vec![
        Arc::new(SlackChannel::with_webhook_url(format!(
            "http://{ok_addr}/hook"
        ))),
        Arc::new(WebhookChannel::new(format!("http://{fail_addr}/alert"))),
        Arc::new(
            TelegramChannel::new("test-token", "42").with_api_base(format!("http://{tg_addr}")),
        ),
    ];

    let result = dispatcher(channels, 2).dispatch(&breaching_summary()).await;

    assert!(result.triggered);
    assert!(result.slack);
    assert!(result.telegram);
    assert!(!result.webhook);
    // One entry per configured channel, exactly once.
    assert_eq!(result.outcomes.len(), 3);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("webhook:"));
}

#[tokio::test]
async fn test_retry_succeeds_within_bound() {
    let (addr, state) = start_mock(2, false).await;
    let channels: Vec<Arc<dyn ChannelAdapter>> =
        vec![Arc::new(WebhookChannel::new(format!("http://{addr}/alert")))];

    let result = dispatcher(channels, 3).dispatch(&breaching_summary()).await;

    assert!(result.webhook);
    let outcome = &result.outcomes[0];
    assert!(outcome.success);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(state.requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_exhaustion_is_reported() {
    let (addr, state) = start_mock(u32::MAX, false).await;
    let channels: Vec<Arc<dyn ChannelAdapter>> =
        vec![Arc::new(WebhookChannel::new(format!("http://{addr}/alert")))];

    let result = dispatcher(channels, 3).dispatch(&breaching_summary()).await;

    assert!(!result.webhook);
    let outcome = &result.outcomes[0];
    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 3);
    assert!(outcome.last_error.is_some());
    assert_eq!(state.requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_telegram_malformed_body_counts_as_failure() {
    // A 2xx answer whose body is not the expected JSON must be treated like
    // any other failed attempt.
    let (addr, state) = start_mock(0, false).await; // plain "ok" body, not JSON

    let channels: Vec<Arc<dyn ChannelAdapter>> = vec![Arc::new(
        TelegramChannel::new("test-token", "42").with_api_base(format!("http://{addr}")),
    )];

    let result = dispatcher(channels, 2).dispatch(&breaching_summary()).await;

    assert!(!result.telegram);
    assert_eq!(state.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
#[serial]
async fn test_unconfigured_channel_is_skipped_not_failed() {
    std::env::remove_var("TELEGRAM_BOT_TOKEN");
    std::env::remove_var("TELEGRAM_CHAT_ID");

    let (addr, _) = start_mock(0, false).await;
    let channels: Vec<Arc<dyn ChannelAdapter>> = vec![
        Arc::new(WebhookChannel::new(format!("http://{addr}/alert"))),
        Arc::new(TelegramChannel::from_env()),
    ];

    let result = dispatcher(channels, 3).dispatch(&breaching_summary()).await;

    assert!(result.triggered);
    assert!(result.webhook);
    // The unconfigured channel contributes no outcome and no error.
    assert_eq!(result.outcomes.len(), 1);
    assert!(result.errors.is_empty());
    assert!(!result.telegram);
}
