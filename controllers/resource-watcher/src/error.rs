//! Watcher error types.

use k8s_client::ClientError;
use thiserror::Error;

/// Errors that can occur in the resource watcher.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Client(#[from] ClientError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// WATCH_KIND names a kind this watcher does not support
    #[error("Unsupported resource kind: {0}")]
    UnsupportedKind(String),
}
