//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market error: {0}")]
    Market(#[from] scm_core::CoreError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] scm_mm::MmError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] scm_indicator::IndicatorError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] scm_executor::ExecutorError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] scm_persistence::PersistenceError),

    #[error("Candle parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
