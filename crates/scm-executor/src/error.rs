//! Executor error types.

use rust_decimal::Decimal;
use thiserror::Error;

use scm_core::{OrderSide, Price};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Maker-only {side} at {price} would cross the book")]
    WouldCross { side: OrderSide, price: Price },

    #[error("Insufficient {currency} balance: required {required}, available {available}")]
    InsufficientBalance {
        currency: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Cancel failed: {0}")]
    CancelFailed(String),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
