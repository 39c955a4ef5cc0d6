//! Error types for Stack Exchange requests.

use thiserror::Error;

/// Errors that can occur while querying the Stack Exchange API.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure (connect, timeout, TLS...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built from the configured host/version
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// Response body was not a valid envelope
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The API answered with an error envelope
    #[error("Stack Exchange API error {id} ({name}): {message}")]
    Api {
        id: i64,
        name: String,
        message: String,
    },

    /// Non-success status without a decodable error envelope
    #[error("Stack Exchange returned {status}: {body}")]
    Status { status: u16, body: String },
}
