//! External alerting configuration.
//!
//! The threshold file is JSON, loaded once at process start; per-channel
//! credentials come from the environment (see the adapter modules).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::threshold::ThresholdPolicy;

/// Top-level alerting configuration.
///
/// ```json
/// {
///   "thresholds": { "failureRate": 0.05, "criticalAlerts": 1, "responseTime": 500 },
///   "retryConfig": { "maxRetries": 3, "retryDelay": 2000 },
///   "slackEnabled": true,
///   "emailEnabled": true,
///   "telegramEnabled": true,
///   "webhookEnabled": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertingConfig {
    pub thresholds: ThresholdPolicy,
    pub retry_config: RetryPolicy,
    pub slack_enabled: bool,
    pub email_enabled: bool,
    pub telegram_enabled: bool,
    pub webhook_enabled: bool,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdPolicy::default(),
            retry_config: RetryPolicy::default(),
            slack_enabled: true,
            email_enabled: true,
            telegram_enabled: true,
            webhook_enabled: true,
        }
    }
}

impl AlertingConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, is not valid
    /// JSON, or carries a negative threshold.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.thresholds.validate()?;
        Ok(config)
    }
}
