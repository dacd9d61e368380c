//! Error types for the terrain pipeline

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration, rejected before any generation starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invariant violation inside the pipeline. Cannot occur once
    /// configuration validation has passed.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
