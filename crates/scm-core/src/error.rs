//! Error types for scm-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid market: {0}")]
    InvalidMarket(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
