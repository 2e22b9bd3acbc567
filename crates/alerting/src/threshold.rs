//! Threshold policy and the alert/no-alert decision.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metrics::MetricsSummary;

/// Configured limits that define when a summary counts as alert-worthy.
///
/// Loaded once at process start and shared read-only by every dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdPolicy {
    /// Tolerated failure fraction; 0.05 means at least 95% success required.
    pub failure_rate: f64,
    /// Alert when the run reports at least this many critical alerts.
    pub critical_alerts: u32,
    /// Alert when the average response time exceeds this many milliseconds.
    pub response_time: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            failure_rate: 0.05,
            critical_alerts: 1,
            response_time: 500.0,
        }
    }
}

impl ThresholdPolicy {
    /// Minimum success rate (percent) implied by the failure-rate fraction.
    #[must_use]
    pub fn min_success_rate_percent(&self) -> f64 {
        100.0 - self.failure_rate * 100.0
    }

    /// Check that every limit is non-negative and finite.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThreshold`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.failure_rate.is_finite() || self.failure_rate < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                field: "failureRate",
                value: self.failure_rate,
            });
        }
        if !self.response_time.is_finite() || self.response_time < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                field: "responseTime",
                value: self.response_time,
            });
        }
        Ok(())
    }
}

/// One of the three breach rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    SuccessRate,
    CriticalAlerts,
    ResponseTime,
}

impl Rule {
    /// Wire/display name of the rule.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuccessRate => "successRate",
            Self::CriticalAlerts => "criticalAlerts",
            Self::ResponseTime => "responseTime",
        }
    }
}

/// Outcome of evaluating one summary against the policy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDecision {
    pub triggered: bool,
    /// Exactly the rules that fired, in evaluation order.
    pub breached: Vec<Rule>,
    /// Notes about malformed metric input (NaN values).
    pub data_quality: Vec<String>,
}

/// Decide whether a summary breaches the policy.
///
/// Pure and total: absent or NaN metrics never trigger on their own. NaN is
/// additionally recorded as a data-quality note so the caller can log it.
#[must_use]
pub fn evaluate(summary: &MetricsSummary, policy: &ThresholdPolicy) -> AlertDecision {
    let mut breached = Vec::new();
    let mut data_quality = Vec::new();

    match summary.success_rate_percent {
        Some(rate) if rate.is_nan() => {
            data_quality.push("successRatePercent is not a number".to_string());
        }
        Some(rate) if rate < policy.min_success_rate_percent() => {
            breached.push(Rule::SuccessRate);
        }
        _ => {}
    }

    if let Some(count) = summary.critical_alerts {
        if count >= policy.critical_alerts {
            breached.push(Rule::CriticalAlerts);
        }
    }

    match summary.avg_response_time_ms {
        Some(avg) if avg.is_nan() => {
            data_quality.push("avgResponseTimeMs is not a number".to_string());
        }
        Some(avg) if avg > policy.response_time => {
            breached.push(Rule::ResponseTime);
        }
        _ => {}
    }

    AlertDecision {
        triggered: !breached.is_empty(),
        breached,
        data_quality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summary(rate: Option<f64>, critical: Option<u32>, avg_ms: Option<f64>) -> MetricsSummary {
        MetricsSummary {
            total_requests: 100,
            fail_count: 0,
            success_rate_percent: rate,
            avg_response_time_ms: avg_ms,
            critical_alerts: critical,
            generated_at: Utc::now(),
            report_id: "run-1".to_string(),
        }
    }

    #[test]
    fn test_all_metrics_safe_does_not_trigger() {
        let policy = ThresholdPolicy::default();
        let decision = evaluate(&summary(Some(99.5), Some(0), Some(120.0)), &policy);

        assert!(!decision.triggered);
        assert!(decision.breached.is_empty());
        assert!(decision.data_quality.is_empty());
    }

    #[test]
    fn test_boundary_values_do_not_trigger() {
        let policy = ThresholdPolicy::default();
        // Exactly at the limits: 95% success, response time equal to the cap.
        let decision = evaluate(&summary(Some(95.0), None, Some(500.0)), &policy);

        assert!(!decision.triggered);
    }

    #[test]
    fn test_low_success_rate_alone_triggers() {
        let policy = ThresholdPolicy::default();
        let decision = evaluate(&summary(Some(94.9), Some(0), Some(120.0)), &policy);

        assert!(decision.triggered);
        assert_eq!(decision.breached, vec![Rule::SuccessRate]);
    }

    #[test]
    fn test_critical_alerts_alone_trigger() {
        let policy = ThresholdPolicy::default();
        let decision = evaluate(&summary(Some(99.5), Some(1), Some(120.0)), &policy);

        assert!(decision.triggered);
        assert_eq!(decision.breached, vec![Rule::CriticalAlerts]);
    }

    #[test]
    fn test_slow_responses_alone_trigger() {
        let policy = ThresholdPolicy::default();
        let decision = evaluate(&summary(Some(99.5), Some(0), Some(500.1)), &policy);

        assert!(decision.triggered);
        assert_eq!(decision.breached, vec![Rule::ResponseTime]);
    }

    #[test]
    fn test_absent_metrics_are_breach_safe() {
        let policy = ThresholdPolicy::default();
        let decision = evaluate(&summary(None, None, None), &policy);

        assert!(!decision.triggered);
        assert!(decision.data_quality.is_empty());
    }

    #[test]
    fn test_nan_is_safe_but_noted() {
        let policy = ThresholdPolicy::default();
        let decision = evaluate(&summary(Some(f64::NAN), Some(0), Some(f64::NAN)), &policy);

        assert!(!decision.triggered);
        assert_eq!(decision.data_quality.len(), 2);
    }

    #[test]
    fn test_observed_regression_scenario() {
        let policy = ThresholdPolicy {
            failure_rate: 0.05,
            critical_alerts: 1,
            response_time: 500.0,
        };
        let decision = evaluate(&summary(Some(94.12), Some(1), Some(15800.0)), &policy);

        assert!(decision.triggered);
        assert_eq!(
            decision.breached,
            vec![Rule::SuccessRate, Rule::CriticalAlerts, Rule::ResponseTime]
        );
    }

    #[test]
    fn test_validate_rejects_negative_thresholds() {
        let policy = ThresholdPolicy {
            failure_rate: -0.1,
            ..ThresholdPolicy::default()
        };

        assert!(policy.validate().is_err());
        assert!(ThresholdPolicy::default().validate().is_ok());
    }
}
