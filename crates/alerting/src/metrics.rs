//! Metrics summary produced by an external test or fraud-signal run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated outcome of one test/analysis run.
///
/// Produced externally (Newman-style runner, smoke tests, fraud scoring) and
/// posted to the gateway as one immutable snapshot per run. The three
/// evaluated metrics are optional on the wire: a field the producer did not
/// report must never trigger an alert by itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    /// Total requests issued during the run.
    #[serde(default)]
    pub total_requests: u64,

    /// Requests that failed.
    #[serde(default)]
    pub fail_count: u64,

    /// Success rate as a percentage (0..=100).
    #[serde(default)]
    pub success_rate_percent: Option<f64>,

    /// Average response time in milliseconds.
    #[serde(default)]
    pub avg_response_time_ms: Option<f64>,

    /// Critical alerts counted during the run.
    #[serde(default)]
    pub critical_alerts: Option<u32>,

    /// When the producing run finished.
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,

    /// Identifier of the underlying report.
    pub report_id: String,
}
