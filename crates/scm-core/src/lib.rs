//! Core domain types for the stablecoin market maker.
//!
//! This crate provides fundamental types used throughout the strategy:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `Market`: Market metadata (tick size, step size, dust thresholds)
//! - `OrderSide`, `OrderType`, `TimeInForce`, `SubmitOrder`: Order intents
//! - `Ticker`, `AccountBalances`, `KLine`: Per-tick market and account snapshots

pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod types;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market::Market;
pub use order::{
    ClientOrderId, CreatedOrder, OrderSide, OrderStatus, OrderType, OrderUpdate, Partition,
    SubmitOrder, TimeInForce, Trade,
};
pub use types::{AccountBalances, Balance, Interval, KLine, Ticker, UserEvent};
