//! Open orders of one partition.
//!
//! Liquidity and adjustment orders live in separate books so that each tick
//! cancels only its own orders.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use scm_core::{CreatedOrder, OrderUpdate, Partition};

use crate::{ExchangeClient, ExecutorResult};

/// Cancel rounds before `graceful_cancel` gives up on stragglers.
const DEFAULT_CANCEL_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct ActiveOrderBook {
    partition: Partition,
    symbol: String,
    orders: BTreeMap<u64, CreatedOrder>,
    max_cancel_attempts: usize,
}

impl ActiveOrderBook {
    pub fn new(partition: Partition, symbol: &str) -> Self {
        Self {
            partition,
            symbol: symbol.to_string(),
            orders: BTreeMap::new(),
            max_cancel_attempts: DEFAULT_CANCEL_ATTEMPTS,
        }
    }

    pub fn with_max_cancel_attempts(mut self, attempts: usize) -> Self {
        self.max_cancel_attempts = attempts.max(1);
        self
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn add(&mut self, order: CreatedOrder) {
        self.orders.insert(order.order_id, order);
    }

    pub fn remove(&mut self, order_id: u64) -> Option<CreatedOrder> {
        self.orders.remove(&order_id)
    }

    pub fn contains(&self, order_id: u64) -> bool {
        self.orders.contains_key(&order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn orders(&self) -> Vec<CreatedOrder> {
        self.orders.values().cloned().collect()
    }

    /// Drop orders that can no longer trade. Returns whether the update
    /// belonged to this book.
    pub fn on_order_update(&mut self, update: &OrderUpdate) -> bool {
        if !self.orders.contains_key(&update.order_id) {
            return false;
        }
        if update.status.is_terminal() {
            self.orders.remove(&update.order_id);
            debug!(
                partition = %self.partition,
                order_id = update.order_id,
                status = ?update.status,
                "Order closed"
            );
        }
        true
    }

    /// Cancel every tracked order, then re-cancel whatever the venue still
    /// reports open, up to the configured number of rounds.
    ///
    /// A failed cancel call is returned as is and leaves the book untouched,
    /// so the next cancel covers the same orders again.
    pub async fn graceful_cancel(&mut self, client: &dyn ExchangeClient) -> ExecutorResult<usize> {
        if self.orders.is_empty() {
            return Ok(0);
        }

        let total = self.orders.len();
        for attempt in 1..=self.max_cancel_attempts {
            client.cancel_orders(self.orders()).await?;

            let open = match client.query_open_orders(&self.symbol).await {
                Ok(open) => open,
                Err(e) => {
                    warn!(partition = %self.partition, ?e, "Failed to verify cancellation");
                    self.orders.clear();
                    return Ok(total);
                }
            };
            self.orders.retain(|id, _| open.iter().any(|o| o.order_id == *id));

            if self.orders.is_empty() {
                debug!(partition = %self.partition, attempt, cancelled = total, "Orders cancelled");
                return Ok(total);
            }
            info!(
                partition = %self.partition,
                attempt,
                remaining = self.orders.len(),
                "Orders still open after cancel, retrying"
            );
        }

        warn!(
            partition = %self.partition,
            remaining = self.orders.len(),
            "Giving up on orders that stay open"
        );
        let remaining = self.orders.len();
        self.orders.clear();
        Ok(total - remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockExchange;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use scm_core::{
        AccountBalances, OrderSide, OrderStatus, Price, Size, SubmitOrder, Ticker,
    };

    fn mock() -> MockExchange {
        MockExchange::new(
            Ticker::new(Price::new(dec!(0.9999)), Price::new(dec!(1.0001))),
            AccountBalances::new(),
        )
    }

    async fn place(exchange: &MockExchange, book: &mut ActiveOrderBook, n: usize) {
        for i in 0..n {
            let intent = SubmitOrder::maker(
                "USDCUSDT",
                OrderSide::Sell,
                Price::new(dec!(1.0001) + Decimal::from(i as u64) * dec!(0.0001)),
                Size::new(dec!(10)),
                book.partition(),
                Some(i as u32),
            );
            book.add(exchange.submit_order(intent).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_graceful_cancel_clears_book() {
        let exchange = mock();
        let mut book = ActiveOrderBook::new(Partition::Liquidity, "USDCUSDT");
        place(&exchange, &mut book, 3).await;

        assert_eq!(book.graceful_cancel(&exchange).await.unwrap(), 3);
        assert!(book.is_empty());
        assert!(exchange.open_orders().is_empty());
        assert_eq!(exchange.cancelled().len(), 3);
    }

    #[tokio::test]
    async fn test_graceful_cancel_recancels_stragglers() {
        let exchange = mock();
        let mut book = ActiveOrderBook::new(Partition::Liquidity, "USDCUSDT");
        place(&exchange, &mut book, 2).await;
        exchange.ignore_next_cancels(1);

        assert_eq!(book.graceful_cancel(&exchange).await.unwrap(), 2);
        // First round ignored, second round closes both
        assert_eq!(exchange.cancelled().len(), 4);
        assert!(exchange.open_orders().is_empty());
    }

    #[tokio::test]
    async fn test_graceful_cancel_bounded() {
        let exchange = mock();
        let mut book =
            ActiveOrderBook::new(Partition::Adjustment, "USDCUSDT").with_max_cancel_attempts(2);
        place(&exchange, &mut book, 1).await;
        exchange.ignore_next_cancels(5);

        assert_eq!(book.graceful_cancel(&exchange).await.unwrap(), 0);
        assert!(book.is_empty());
        assert_eq!(exchange.cancelled().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_failure_keeps_orders() {
        let exchange = mock();
        let mut book = ActiveOrderBook::new(Partition::Liquidity, "USDCUSDT");
        place(&exchange, &mut book, 2).await;
        exchange.fail_cancel(true);

        assert!(book.graceful_cancel(&exchange).await.is_err());
        assert_eq!(book.len(), 2);

        exchange.fail_cancel(false);
        assert_eq!(book.graceful_cancel(&exchange).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_book_skips_venue() {
        let exchange = mock();
        let mut book = ActiveOrderBook::new(Partition::Liquidity, "USDCUSDT");
        assert_eq!(book.graceful_cancel(&exchange).await.unwrap(), 0);
        assert!(exchange.cancelled().is_empty());
    }

    #[test]
    fn test_terminal_update_removes_order() {
        let mut book = ActiveOrderBook::new(Partition::Adjustment, "USDCUSDT");
        let intent = SubmitOrder::maker(
            "USDCUSDT",
            OrderSide::Buy,
            Price::new(dec!(0.9990)),
            Size::new(dec!(10)),
            Partition::Adjustment,
            None,
        );
        book.add(CreatedOrder::from_submit(7, &intent));

        let mut update = OrderUpdate {
            order_id: 7,
            symbol: "USDCUSDT".to_string(),
            status: OrderStatus::PartiallyFilled,
            executed_quantity: Size::new(dec!(4)),
        };
        assert!(book.on_order_update(&update));
        assert!(book.contains(7));

        update.status = OrderStatus::Filled;
        assert!(book.on_order_update(&update));
        assert!(book.is_empty());

        update.order_id = 8;
        assert!(!book.on_order_update(&update));
    }
}
