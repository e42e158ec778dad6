//! Exchange client seam.
//!
//! The strategy only talks to the venue through this trait, so tests and the
//! paper venue plug in the same way a live connector would. Methods return
//! boxed futures to keep the trait usable as `dyn ExchangeClient`.

use std::pin::Pin;
use std::sync::Arc;

use scm_core::{AccountBalances, CreatedOrder, SubmitOrder, Ticker};

use crate::ExecutorResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub trait ExchangeClient: Send + Sync {
    fn name(&self) -> &str;

    /// Best bid and ask.
    fn query_ticker(&self, symbol: &str) -> BoxFuture<'_, ExecutorResult<Ticker>>;

    fn query_balances(&self) -> BoxFuture<'_, ExecutorResult<AccountBalances>>;

    fn submit_order(&self, order: SubmitOrder) -> BoxFuture<'_, ExecutorResult<CreatedOrder>>;

    /// Cancel the given orders. Cancelling an order the venue no longer has
    /// open is not an error.
    fn cancel_orders(&self, orders: Vec<CreatedOrder>) -> BoxFuture<'_, ExecutorResult<()>>;

    fn query_open_orders(&self, symbol: &str) -> BoxFuture<'_, ExecutorResult<Vec<CreatedOrder>>>;

    /// Bulk cancel-by-symbol, when the venue supports it.
    fn symbol_cancel(&self) -> Option<&dyn SymbolCancel> {
        None
    }
}

/// Optional venue capability: cancel every open order of a symbol in one call.
pub trait SymbolCancel: Send + Sync {
    /// Returns the number of orders cancelled.
    fn cancel_orders_by_symbol(&self, symbol: &str) -> BoxFuture<'_, ExecutorResult<usize>>;
}

/// Arc wrapper for exchange client trait objects.
pub type DynExchange = Arc<dyn ExchangeClient>;
