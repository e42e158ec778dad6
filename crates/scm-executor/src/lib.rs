//! Order lifecycle for the stablecoin market maker.
//!
//! # Key Components
//!
//! - [`ExchangeClient`]: venue seam (ticker, balances, submit, cancel, open orders)
//! - [`SymbolCancel`]: optional bulk cancel-by-symbol capability
//! - [`ActiveOrderBook`]: one cancel scope per [`Partition`](scm_core::Partition)
//! - [`OrderExecutor`]: per-intent submission, failures logged, batch continues
//! - [`MockExchange`]: scripted client for tests
//! - [`PaperExchange`]: in-memory venue driven by closed candles

pub mod active_book;
pub mod client;
pub mod error;
pub mod executor;
pub mod mock;
pub mod paper;

pub use active_book::ActiveOrderBook;
pub use client::{BoxFuture, DynExchange, ExchangeClient, SymbolCancel};
pub use error::{ExecutorError, ExecutorResult};
pub use executor::{OrderExecutor, SubmitFailure, SubmitReport};
pub use mock::MockExchange;
pub use paper::{PaperConfig, PaperExchange};
