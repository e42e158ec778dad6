//! Scripted exchange client for tests.
//!
//! Records every submission and cancel, keeps accepted orders open until
//! cancelled, and can be told to fail queries, submissions or cancels.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use scm_core::{AccountBalances, CreatedOrder, SubmitOrder, Ticker};

use crate::{BoxFuture, ExchangeClient, ExecutorError, ExecutorResult, SymbolCancel};

#[derive(Debug)]
pub struct MockExchange {
    ticker: Mutex<Ticker>,
    balances: Mutex<AccountBalances>,
    fail_ticker: AtomicBool,
    fail_balances: AtomicBool,
    fail_cancel: AtomicBool,
    /// Number of upcoming submissions to reject.
    submit_failures: AtomicUsize,
    /// Number of upcoming cancel calls that leave the orders open.
    sticky_cancels: AtomicUsize,
    supports_symbol_cancel: bool,
    next_order_id: AtomicU64,
    ticker_queries: AtomicUsize,
    submitted: Mutex<Vec<SubmitOrder>>,
    cancelled: Mutex<Vec<u64>>,
    symbol_cancels: Mutex<Vec<String>>,
    open: Mutex<BTreeMap<u64, CreatedOrder>>,
}

impl MockExchange {
    pub fn new(ticker: Ticker, balances: AccountBalances) -> Self {
        Self {
            ticker: Mutex::new(ticker),
            balances: Mutex::new(balances),
            fail_ticker: AtomicBool::new(false),
            fail_balances: AtomicBool::new(false),
            fail_cancel: AtomicBool::new(false),
            submit_failures: AtomicUsize::new(0),
            sticky_cancels: AtomicUsize::new(0),
            supports_symbol_cancel: false,
            next_order_id: AtomicU64::new(1),
            ticker_queries: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            symbol_cancels: Mutex::new(Vec::new()),
            open: Mutex::new(BTreeMap::new()),
        }
    }

    /// Advertise the bulk cancel capability.
    pub fn with_symbol_cancel(mut self) -> Self {
        self.supports_symbol_cancel = true;
        self
    }

    pub fn set_ticker(&self, ticker: Ticker) {
        *self.ticker.lock() = ticker;
    }

    pub fn fail_ticker(&self, fail: bool) {
        self.fail_ticker.store(fail, Ordering::SeqCst);
    }

    pub fn fail_balances(&self, fail: bool) {
        self.fail_balances.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cancel(&self, fail: bool) {
        self.fail_cancel.store(fail, Ordering::SeqCst);
    }

    /// Reject the next `n` submissions.
    pub fn fail_next_submits(&self, n: usize) {
        self.submit_failures.store(n, Ordering::SeqCst);
    }

    /// Accept the next `n` cancel calls without closing the orders.
    pub fn ignore_next_cancels(&self, n: usize) {
        self.sticky_cancels.store(n, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<SubmitOrder> {
        self.submitted.lock().clone()
    }

    pub fn cancelled(&self) -> Vec<u64> {
        self.cancelled.lock().clone()
    }

    pub fn symbol_cancels(&self) -> Vec<String> {
        self.symbol_cancels.lock().clone()
    }

    pub fn open_orders(&self) -> Vec<CreatedOrder> {
        self.open.lock().values().cloned().collect()
    }

    pub fn ticker_queries(&self) -> usize {
        self.ticker_queries.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.submitted.lock().clear();
        self.cancelled.lock().clear();
        self.symbol_cancels.lock().clear();
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl ExchangeClient for MockExchange {
    fn name(&self) -> &str {
        "mock"
    }

    fn query_ticker(&self, _symbol: &str) -> BoxFuture<'_, ExecutorResult<Ticker>> {
        Box::pin(async move {
            self.ticker_queries.fetch_add(1, Ordering::SeqCst);
            if self.fail_ticker.load(Ordering::SeqCst) {
                return Err(ExecutorError::QueryFailed("ticker unavailable".to_string()));
            }
            Ok(*self.ticker.lock())
        })
    }

    fn query_balances(&self) -> BoxFuture<'_, ExecutorResult<AccountBalances>> {
        Box::pin(async move {
            if self.fail_balances.load(Ordering::SeqCst) {
                return Err(ExecutorError::QueryFailed("balances unavailable".to_string()));
            }
            Ok(self.balances.lock().clone())
        })
    }

    fn submit_order(&self, order: SubmitOrder) -> BoxFuture<'_, ExecutorResult<CreatedOrder>> {
        Box::pin(async move {
            self.submitted.lock().push(order.clone());
            if Self::take_one(&self.submit_failures) {
                return Err(ExecutorError::OrderRejected(format!(
                    "scripted rejection of {}",
                    order.client_order_id
                )));
            }
            let order_id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
            let created = CreatedOrder::from_submit(order_id, &order);
            self.open.lock().insert(order_id, created.clone());
            Ok(created)
        })
    }

    fn cancel_orders(&self, orders: Vec<CreatedOrder>) -> BoxFuture<'_, ExecutorResult<()>> {
        Box::pin(async move {
            if self.fail_cancel.load(Ordering::SeqCst) {
                return Err(ExecutorError::CancelFailed("scripted cancel failure".to_string()));
            }
            let sticky = Self::take_one(&self.sticky_cancels);
            let mut open = self.open.lock();
            let mut cancelled = self.cancelled.lock();
            for order in orders {
                cancelled.push(order.order_id);
                if !sticky {
                    open.remove(&order.order_id);
                }
            }
            Ok(())
        })
    }

    fn query_open_orders(&self, symbol: &str) -> BoxFuture<'_, ExecutorResult<Vec<CreatedOrder>>> {
        let symbol = symbol.to_string();
        Box::pin(async move {
            Ok(self
                .open
                .lock()
                .values()
                .filter(|o| o.symbol == symbol)
                .cloned()
                .collect())
        })
    }

    fn symbol_cancel(&self) -> Option<&dyn SymbolCancel> {
        if self.supports_symbol_cancel {
            Some(self)
        } else {
            None
        }
    }
}

impl SymbolCancel for MockExchange {
    fn cancel_orders_by_symbol(&self, symbol: &str) -> BoxFuture<'_, ExecutorResult<usize>> {
        let symbol = symbol.to_string();
        Box::pin(async move {
            let mut open = self.open.lock();
            let before = open.len();
            open.retain(|_, o| o.symbol != symbol);
            let count = before - open.len();
            self.symbol_cancels.lock().push(symbol);
            Ok(count)
        })
    }
}
