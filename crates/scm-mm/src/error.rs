//! Market making error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MmError {
    #[error("Scale function cannot be solved: {0}")]
    UnsolvableScale(String),

    #[error("Scale weights over {layers} layers sum to {sum}")]
    ZeroWeightSum { layers: u32, sum: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type MmResult<T> = Result<T, MmError>;
