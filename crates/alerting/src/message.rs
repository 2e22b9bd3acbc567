//! Alert message model and the default message factory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSummary;
use crate::threshold::{AlertDecision, Rule};

/// Severity levels for alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Attachment color used by the chat channels.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Low => "#3498db",      // Blue
            Self::Medium => "#f39c12",   // Orange
            Self::High => "#e67e22",     // Dark orange
            Self::Critical => "#e74c3c", // Red
        }
    }

    /// Get display name for this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// A render-ready alert: title, severity and ordered metadata fields.
///
/// Built once per dispatch by the message factory and read-only afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMessage {
    pub title: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// Field name/value pairs in display order.
    pub metadata: Vec<(String, String)>,
    pub report_id: String,
}

/// Builds the alert message for a triggered decision.
///
/// Injected into the dispatcher so production and test templates can differ.
pub type MessageFactory = dyn Fn(&MetricsSummary, &AlertDecision) -> AlertMessage + Send + Sync;

/// Default production message.
///
/// Severity: `Critical` when the critical-alerts rule fired, `High` when two
/// or more rules fired, otherwise `Medium`. `Low` is reserved for manually
/// built messages.
#[must_use]
pub fn default_message(summary: &MetricsSummary, decision: &AlertDecision) -> AlertMessage {
    let severity = if decision.breached.contains(&Rule::CriticalAlerts) {
        Severity::Critical
    } else if decision.breached.len() >= 2 {
        Severity::High
    } else {
        Severity::Medium
    };

    let mut metadata = vec![
        (
            "Total Requests".to_string(),
            summary.total_requests.to_string(),
        ),
        ("Failed".to_string(), summary.fail_count.to_string()),
    ];
    if let Some(rate) = summary.success_rate_percent {
        metadata.push(("Success Rate".to_string(), format!("{rate:.2}%")));
    }
    if let Some(avg) = summary.avg_response_time_ms {
        metadata.push(("Avg Response Time".to_string(), format!("{avg:.0} ms")));
    }
    if let Some(count) = summary.critical_alerts {
        metadata.push(("Critical Alerts".to_string(), count.to_string()));
    }
    metadata.push((
        "Breached Rules".to_string(),
        decision
            .breached
            .iter()
            .map(Rule::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    ));

    AlertMessage {
        title: format!("Threshold breach in run {}", summary.report_id),
        severity,
        timestamp: summary.generated_at,
        metadata,
        report_id: summary.report_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::{evaluate, ThresholdPolicy};
    use chrono::Utc;

    fn breaching_summary(critical: Option<u32>, avg_ms: Option<f64>) -> MetricsSummary {
        MetricsSummary {
            total_requests: 340,
            fail_count: 20,
            success_rate_percent: Some(94.12),
            avg_response_time_ms: avg_ms,
            critical_alerts: critical,
            generated_at: Utc::now(),
            report_id: "run-7".to_string(),
        }
    }

    #[test]
    fn test_severity_colors() {
        assert_eq!(Severity::Low.color(), "#3498db");
        assert_eq!(Severity::Medium.color(), "#f39c12");
        assert_eq!(Severity::Critical.color(), "#e74c3c");
    }

    #[test]
    fn test_critical_alert_breach_makes_message_critical() {
        let policy = ThresholdPolicy::default();
        let summary = breaching_summary(Some(2), Some(100.0));
        let decision = evaluate(&summary, &policy);

        let message = default_message(&summary, &decision);
        assert_eq!(message.severity, Severity::Critical);
        assert_eq!(message.report_id, "run-7");
    }

    #[test]
    fn test_two_breaches_without_criticals_are_high() {
        let policy = ThresholdPolicy::default();
        let summary = breaching_summary(Some(0), Some(900.0));
        let decision = evaluate(&summary, &policy);

        let message = default_message(&summary, &decision);
        assert_eq!(message.severity, Severity::High);
    }

    #[test]
    fn test_single_breach_is_medium() {
        let policy = ThresholdPolicy::default();
        let summary = breaching_summary(Some(0), Some(100.0));
        let decision = evaluate(&summary, &policy);

        let message = default_message(&summary, &decision);
        assert_eq!(message.severity, Severity::Medium);
    }

    #[test]
    fn test_metadata_lists_breached_rules() {
        let policy = ThresholdPolicy::default();
        let summary = breaching_summary(Some(1), Some(900.0));
        let decision = evaluate(&summary, &policy);

        let message = default_message(&summary, &decision);
        let rules = message
            .metadata
            .iter()
            .find(|(name, _)| name == "Breached Rules")
            .map(|(_, value)| value.clone())
            .unwrap();
        assert_eq!(rules, "successRate, criticalAlerts, responseTime");
    }
}
