//! Error types for Slack requests.

use thiserror::Error;

/// Errors that can occur when talking to Slack.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Client is missing a token or target channel
    #[error("Slack not configured: {0}")]
    NotConfigured(String),

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rate limited by the service
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Slack answered `ok: false`
    #[error("Slack API error: {0}")]
    Api(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}
