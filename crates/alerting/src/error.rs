//! Error types for the alerting pipeline.

use thiserror::Error;

/// Errors that can occur when delivering an alert to a channel.
///
/// Every variant except [`ChannelError::NotConfigured`] is transient and
/// eligible for retry; the retry executor turns exhaustion into a failed
/// [`DeliveryOutcome`](crate::retry::DeliveryOutcome) rather than propagating.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed (connect error, TLS failure, per-call timeout)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel is missing required configuration
    #[error("channel not configured: {0}")]
    NotConfigured(String),

    /// The remote API answered with a non-success status
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The remote API answered 2xx but rejected the request in its body
    #[error("{service} rejected the request: {detail}")]
    Rejected {
        service: &'static str,
        detail: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised while loading the alerting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the expected shape
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A threshold value is negative or non-finite
    #[error("invalid threshold value for {field}: {value}")]
    InvalidThreshold { field: &'static str, value: f64 },
}
