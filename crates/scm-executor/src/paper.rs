//! In-memory paper venue.
//!
//! The touch is derived from the last closed candle: `close ± half_spread`,
//! truncated to the tick. Maker-only orders that would cross are rejected,
//! accepted orders lock their balance, and each closed candle fills resting
//! buys with `low <= price` and sells with `high >= price` at the order
//! price. The fee is charged on the received asset at the maker rate.
//! Fills and status changes are pushed as `UserEvent`s.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use scm_core::{
    AccountBalances, CreatedOrder, KLine, Market, OrderSide, OrderStatus, OrderType,
    OrderUpdate, Price, SubmitOrder, Ticker, Trade, UserEvent,
};

use crate::{BoxFuture, ExchangeClient, ExecutorError, ExecutorResult, SymbolCancel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaperConfig {
    /// Distance from the candle close to each side of the simulated touch.
    pub half_spread: Decimal,
    pub maker_fee_rate: Decimal,
}

#[derive(Debug)]
struct PaperState {
    last_close: Option<Price>,
    balances: AccountBalances,
    open: BTreeMap<u64, CreatedOrder>,
    next_order_id: u64,
    next_trade_id: u64,
}

#[derive(Debug)]
pub struct PaperExchange {
    market: Market,
    config: PaperConfig,
    state: Mutex<PaperState>,
    events: mpsc::UnboundedSender<UserEvent>,
}

impl PaperExchange {
    pub fn new(
        market: Market,
        balances: AccountBalances,
        config: PaperConfig,
        events: mpsc::UnboundedSender<UserEvent>,
    ) -> Self {
        Self {
            market,
            config,
            state: Mutex::new(PaperState {
                last_close: None,
                balances,
                open: BTreeMap::new(),
                next_order_id: 1,
                next_trade_id: 1,
            }),
            events,
        }
    }

    pub fn balances(&self) -> AccountBalances {
        self.state.lock().balances.clone()
    }

    pub fn open_orders(&self) -> Vec<CreatedOrder> {
        self.state.lock().open.values().cloned().collect()
    }

    /// Advance the venue by one candle. Returns the fills it produced.
    pub fn on_kline(&self, kline: &KLine) -> Vec<Trade> {
        if !kline.closed || kline.symbol != self.market.symbol {
            return Vec::new();
        }

        let mut state = self.state.lock();
        let crossed: Vec<u64> = state
            .open
            .values()
            .filter(|o| match o.side {
                OrderSide::Buy => kline.low <= o.price,
                OrderSide::Sell => kline.high >= o.price,
            })
            .map(|o| o.order_id)
            .collect();

        let mut trades = Vec::with_capacity(crossed.len());
        for order_id in crossed {
            if let Some(order) = state.open.remove(&order_id) {
                let trade = self.fill(&mut state, &order);
                info!(
                    order_id,
                    side = %trade.side,
                    price = %trade.price,
                    quantity = %trade.quantity,
                    "Paper fill"
                );
                self.emit(UserEvent::Trade(trade.clone()));
                self.emit(UserEvent::OrderUpdate(OrderUpdate {
                    order_id,
                    symbol: order.symbol.clone(),
                    status: OrderStatus::Filled,
                    executed_quantity: order.quantity,
                }));
                trades.push(trade);
            }
        }

        state.last_close = Some(kline.close);
        trades
    }

    fn fill(&self, state: &mut PaperState, order: &CreatedOrder) -> Trade {
        let base_ccy = &self.market.base_currency;
        let quote_ccy = &self.market.quote_currency;
        let quantity = order.quantity.inner();
        let notional = order.quantity.notional(order.price);

        let (fee, fee_currency) = match order.side {
            OrderSide::Buy => {
                let fee = quantity * self.config.maker_fee_rate;
                state.balances.entry(quote_ccy).locked -= notional;
                state.balances.entry(base_ccy).available += quantity - fee;
                (fee, base_ccy.clone())
            }
            OrderSide::Sell => {
                let fee = notional * self.config.maker_fee_rate;
                state.balances.entry(base_ccy).locked -= quantity;
                state.balances.entry(quote_ccy).available += notional - fee;
                (fee, quote_ccy.clone())
            }
        };

        let trade_id = state.next_trade_id;
        state.next_trade_id += 1;

        Trade {
            trade_id,
            order_id: order.order_id,
            symbol: order.symbol.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            fee,
            fee_currency,
            is_maker: true,
            time: Utc::now(),
        }
    }

    fn ticker_from(&self, close: Price) -> Ticker {
        let tick = self.market.tick_size;
        let buy = self
            .market
            .truncate_price(close - Price::new(self.config.half_spread), OrderSide::Buy);
        let mut sell = self
            .market
            .truncate_price(close + Price::new(self.config.half_spread), OrderSide::Sell);
        if sell <= buy {
            sell = buy + tick;
        }
        Ticker::new(buy, sell)
    }

    fn current_ticker(&self, state: &PaperState) -> ExecutorResult<Ticker> {
        state
            .last_close
            .map(|close| self.ticker_from(close))
            .ok_or_else(|| ExecutorError::QueryFailed("no market data yet".to_string()))
    }

    fn place(&self, order: SubmitOrder) -> ExecutorResult<CreatedOrder> {
        if order.symbol != self.market.symbol {
            return Err(ExecutorError::OrderRejected(format!(
                "unknown symbol {}",
                order.symbol
            )));
        }
        if !order.price.is_positive() || !order.quantity.is_positive() {
            return Err(ExecutorError::OrderRejected(format!(
                "invalid price {} or quantity {}",
                order.price, order.quantity
            )));
        }

        let mut state = self.state.lock();
        let ticker = self.current_ticker(&state)?;
        if order.order_type == OrderType::LimitMaker {
            let crosses = match order.side {
                OrderSide::Buy => order.price >= ticker.sell,
                OrderSide::Sell => order.price <= ticker.buy,
            };
            if crosses {
                return Err(ExecutorError::WouldCross {
                    side: order.side,
                    price: order.price,
                });
            }
        }

        let (currency, required) = match order.side {
            OrderSide::Buy => (&self.market.quote_currency, order.notional()),
            OrderSide::Sell => (&self.market.base_currency, order.quantity.inner()),
        };
        let balance = state.balances.entry(currency);
        if balance.available < required {
            return Err(ExecutorError::InsufficientBalance {
                currency: currency.clone(),
                required,
                available: balance.available,
            });
        }
        balance.available -= required;
        balance.locked += required;

        let order_id = state.next_order_id;
        state.next_order_id += 1;
        let created = CreatedOrder::from_submit(order_id, &order);
        state.open.insert(order_id, created.clone());

        self.emit(UserEvent::OrderUpdate(OrderUpdate {
            order_id,
            symbol: created.symbol.clone(),
            status: OrderStatus::New,
            executed_quantity: Default::default(),
        }));
        Ok(created)
    }

    fn cancel_ids(&self, ids: impl IntoIterator<Item = u64>) -> usize {
        let mut state = self.state.lock();
        let mut cancelled = 0;
        for order_id in ids {
            let Some(order) = state.open.remove(&order_id) else {
                continue;
            };
            let (currency, amount) = match order.side {
                OrderSide::Buy => (&self.market.quote_currency, order.quantity.notional(order.price)),
                OrderSide::Sell => (&self.market.base_currency, order.quantity.inner()),
            };
            let balance = state.balances.entry(currency);
            balance.locked -= amount;
            balance.available += amount;

            self.emit(UserEvent::OrderUpdate(OrderUpdate {
                order_id,
                symbol: order.symbol.clone(),
                status: OrderStatus::Canceled,
                executed_quantity: Default::default(),
            }));
            cancelled += 1;
        }
        cancelled
    }

    fn emit(&self, event: UserEvent) {
        if self.events.send(event).is_err() {
            debug!("User event receiver dropped");
        }
    }
}

impl ExchangeClient for PaperExchange {
    fn name(&self) -> &str {
        "paper"
    }

    fn query_ticker(&self, symbol: &str) -> BoxFuture<'_, ExecutorResult<Ticker>> {
        let known = symbol == self.market.symbol;
        let symbol = symbol.to_string();
        Box::pin(async move {
            if !known {
                return Err(ExecutorError::QueryFailed(format!("unknown symbol {symbol}")));
            }
            let state = self.state.lock();
            self.current_ticker(&state)
        })
    }

    fn query_balances(&self) -> BoxFuture<'_, ExecutorResult<AccountBalances>> {
        Box::pin(async move { Ok(self.balances()) })
    }

    fn submit_order(&self, order: SubmitOrder) -> BoxFuture<'_, ExecutorResult<CreatedOrder>> {
        Box::pin(async move { self.place(order) })
    }

    fn cancel_orders(&self, orders: Vec<CreatedOrder>) -> BoxFuture<'_, ExecutorResult<()>> {
        Box::pin(async move {
            let cancelled = self.cancel_ids(orders.iter().map(|o| o.order_id));
            if cancelled < orders.len() {
                debug!(
                    requested = orders.len(),
                    cancelled,
                    "Some orders were already closed"
                );
            }
            Ok(())
        })
    }

    fn query_open_orders(&self, symbol: &str) -> BoxFuture<'_, ExecutorResult<Vec<CreatedOrder>>> {
        let symbol = symbol.to_string();
        Box::pin(async move {
            Ok(self
                .open_orders()
                .into_iter()
                .filter(|o| o.symbol == symbol)
                .collect())
        })
    }

    fn symbol_cancel(&self) -> Option<&dyn SymbolCancel> {
        Some(self)
    }
}

impl SymbolCancel for PaperExchange {
    fn cancel_orders_by_symbol(&self, symbol: &str) -> BoxFuture<'_, ExecutorResult<usize>> {
        let symbol = symbol.to_string();
        Box::pin(async move {
            let ids: Vec<u64> = self
                .open_orders()
                .into_iter()
                .filter(|o| o.symbol == symbol)
                .map(|o| o.order_id)
                .collect();
            let cancelled = self.cancel_ids(ids);
            if cancelled > 0 {
                warn!(%symbol, cancelled, "Cancelled leftover open orders");
            }
            Ok(cancelled)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use scm_core::{Balance, Interval, Partition, Size};

    fn market() -> Market {
        Market {
            symbol: "USDCUSDT".to_string(),
            base_currency: "USDC".to_string(),
            quote_currency: "USDT".to_string(),
            tick_size: Price::new(dec!(0.0001)),
            step_size: Size::new(dec!(0.01)),
            min_quantity: Size::new(dec!(1)),
            min_notional: dec!(5),
        }
    }

    fn kline(low: Decimal, high: Decimal, close: Decimal) -> KLine {
        KLine {
            symbol: "USDCUSDT".to_string(),
            interval: Interval::OneMinute,
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: Price::new(close),
            high: Price::new(high),
            low: Price::new(low),
            close: Price::new(close),
            volume: dec!(1000),
            closed: true,
        }
    }

    fn paper() -> (PaperExchange, mpsc::UnboundedReceiver<UserEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let balances: AccountBalances = [
            Balance::new("USDC", dec!(100)),
            Balance::new("USDT", dec!(100)),
        ]
        .into_iter()
        .collect();
        let exchange = PaperExchange::new(
            market(),
            balances,
            PaperConfig {
                half_spread: dec!(0.0001),
                maker_fee_rate: dec!(0.001),
            },
            tx,
        );
        exchange.on_kline(&kline(dec!(0.9999), dec!(1.0001), dec!(1.0000)));
        (exchange, rx)
    }

    fn order(side: OrderSide, price: Decimal, qty: Decimal) -> SubmitOrder {
        SubmitOrder::maker(
            "USDCUSDT",
            side,
            Price::new(price),
            Size::new(qty),
            Partition::Liquidity,
            Some(0),
        )
    }

    #[tokio::test]
    async fn test_ticker_from_last_close() {
        let (exchange, _rx) = paper();
        let ticker = exchange.query_ticker("USDCUSDT").await.unwrap();
        assert_eq!(ticker.buy.inner(), dec!(0.9999));
        assert_eq!(ticker.sell.inner(), dec!(1.0001));
        assert!(exchange.query_ticker("DAIUSDT").await.is_err());
    }

    #[tokio::test]
    async fn test_no_data_fails_ticker() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let exchange = PaperExchange::new(
            market(),
            AccountBalances::new(),
            PaperConfig {
                half_spread: dec!(0.0001),
                maker_fee_rate: Decimal::ZERO,
            },
            tx,
        );
        assert!(matches!(
            exchange.query_ticker("USDCUSDT").await,
            Err(ExecutorError::QueryFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_maker_only_rejects_crossing() {
        let (exchange, _rx) = paper();
        let result = exchange
            .submit_order(order(OrderSide::Buy, dec!(1.0001), dec!(10)))
            .await;
        assert!(matches!(result, Err(ExecutorError::WouldCross { .. })));

        let result = exchange
            .submit_order(order(OrderSide::Sell, dec!(0.9999), dec!(10)))
            .await;
        assert!(matches!(result, Err(ExecutorError::WouldCross { .. })));
    }

    #[tokio::test]
    async fn test_placement_locks_and_cancel_releases() {
        let (exchange, mut rx) = paper();
        let created = exchange
            .submit_order(order(OrderSide::Buy, dec!(0.9990), dec!(50)))
            .await
            .unwrap();

        let usdt = exchange.balances().get("USDT").cloned().unwrap();
        assert_eq!(usdt.available, dec!(50.05));
        assert_eq!(usdt.locked, dec!(49.95));
        assert!(matches!(
            rx.try_recv().unwrap(),
            UserEvent::OrderUpdate(OrderUpdate { status: OrderStatus::New, .. })
        ));

        exchange.cancel_orders(vec![created.clone()]).await.unwrap();
        // Idempotent re-cancel
        exchange.cancel_orders(vec![created]).await.unwrap();

        let usdt = exchange.balances().get("USDT").cloned().unwrap();
        assert_eq!(usdt.available, dec!(100));
        assert_eq!(usdt.locked, Decimal::ZERO);
        assert!(exchange.open_orders().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_balance_rejected() {
        let (exchange, _rx) = paper();
        let result = exchange
            .submit_order(order(OrderSide::Sell, dec!(1.0005), dec!(150)))
            .await;
        assert!(matches!(
            result,
            Err(ExecutorError::InsufficientBalance { .. })
        ));
    }

    #[tokio::test]
    async fn test_candle_fills_resting_orders() {
        let (exchange, mut rx) = paper();
        exchange
            .submit_order(order(OrderSide::Sell, dec!(1.0005), dec!(20)))
            .await
            .unwrap();
        exchange
            .submit_order(order(OrderSide::Buy, dec!(0.9990), dec!(20)))
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}

        // Only the ask is reached
        let trades = exchange.on_kline(&kline(dec!(0.9995), dec!(1.0006), dec!(1.0004)));
        assert_eq!(trades.len(), 1);
        let trade = &trades[0];
        assert_eq!(trade.side, OrderSide::Sell);
        assert_eq!(trade.price.inner(), dec!(1.0005));
        assert_eq!(trade.fee, dec!(0.020010));
        assert_eq!(trade.fee_currency, "USDT");

        let balances = exchange.balances();
        assert_eq!(balances.get("USDC").unwrap().locked, Decimal::ZERO);
        assert_eq!(balances.get("USDC").unwrap().available, dec!(80));
        assert!(matches!(rx.try_recv().unwrap(), UserEvent::Trade(_)));
        assert!(matches!(
            rx.try_recv().unwrap(),
            UserEvent::OrderUpdate(OrderUpdate { status: OrderStatus::Filled, .. })
        ));
        assert_eq!(exchange.open_orders().len(), 1);

        // Touch moved with the close
        let ticker = exchange.query_ticker("USDCUSDT").await.unwrap();
        assert_eq!(ticker.buy.inner(), dec!(1.0003));
    }

    #[tokio::test]
    async fn test_symbol_cancel_clears_all() {
        let (exchange, _rx) = paper();
        exchange
            .submit_order(order(OrderSide::Buy, dec!(0.9990), dec!(10)))
            .await
            .unwrap();
        exchange
            .submit_order(order(OrderSide::Sell, dec!(1.0010), dec!(10)))
            .await
            .unwrap();

        let cancel = exchange.symbol_cancel().unwrap();
        assert_eq!(cancel.cancel_orders_by_symbol("USDCUSDT").await.unwrap(), 2);
        assert!(exchange.open_orders().is_empty());
        assert_eq!(exchange.balances().get("USDC").unwrap().available, dec!(100));
    }
}
