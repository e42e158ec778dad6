//! Position error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Symbol mismatch: expected {expected}, got {actual}")]
    SymbolMismatch { expected: String, actual: String },

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),
}

pub type PositionResult<T> = Result<T, PositionError>;
