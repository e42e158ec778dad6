//! Indicator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("Invalid window: {0}")]
    InvalidWindow(usize),

    #[error("Invalid multiplier: {0}")]
    InvalidMultiplier(f64),

    #[error("Indicator not ready: {0}")]
    NotReady(&'static str),
}

pub type IndicatorResult<T> = Result<T, IndicatorError>;
