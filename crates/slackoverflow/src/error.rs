use std::time::Duration;

use thiserror::Error;

/// Errors that end a sync pass before it starts its work.
///
/// Request failures inside a pass are collected in its report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    /// Missing or unusable configuration, e.g. posting without a channel.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sync cycle exceeded {0:?}")]
    Timeout(Duration),
}
