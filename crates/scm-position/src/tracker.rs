//! Single owner of position and profit state.
//!
//! Fills arrive asynchronously on the user data stream. Instead of sharing
//! the position behind a lock, the runtime forwards them through a channel
//! and applies them here between ticks, so a tick always reads a position
//! that nothing else mutates while the tick runs.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, warn};

use scm_core::{Market, Trade};

use crate::{FeeRates, Position, ProfitStats, TradeOutcome};

/// Number of trade ids remembered for duplicate suppression.
const SEEN_TRADE_CAPACITY: usize = 4096;

#[derive(Debug)]
pub struct PositionTracker {
    market: Market,
    position: Position,
    profit_stats: ProfitStats,
    seen: HashSet<u64>,
    seen_order: VecDeque<u64>,
}

impl PositionTracker {
    /// Start from persisted state, or flat when nothing was stored.
    pub fn new(market: Market, position: Option<Position>, stats: Option<ProfitStats>) -> Self {
        let position = match position {
            Some(p) if p.symbol == market.symbol => p,
            Some(p) => {
                warn!(
                    stored = %p.symbol,
                    expected = %market.symbol,
                    "Stored position is for another symbol, starting flat"
                );
                Position::new(&market)
            }
            None => Position::new(&market),
        };
        let profit_stats = stats
            .filter(|s| s.symbol == market.symbol)
            .unwrap_or_else(|| ProfitStats::new(&market.symbol));

        Self {
            market,
            position,
            profit_stats,
            seen: HashSet::new(),
            seen_order: VecDeque::new(),
        }
    }

    pub fn set_fee_rates(&mut self, rates: FeeRates) {
        self.position.set_fee_rates(rates);
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn profit_stats(&self) -> &ProfitStats {
        &self.profit_stats
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    /// Apply one trade. Duplicates and other symbols are ignored.
    pub fn apply_trade(&mut self, trade: &Trade) -> Option<TradeOutcome> {
        if trade.symbol != self.market.symbol {
            debug!(symbol = %trade.symbol, "Ignoring trade for another symbol");
            return None;
        }
        if !self.remember(trade.trade_id) {
            debug!(trade_id = trade.trade_id, "Ignoring duplicate trade");
            return None;
        }

        match self.position.add_trade(trade) {
            Ok(outcome) => {
                self.profit_stats.add_trade(trade, &outcome);
                info!(
                    trade_id = trade.trade_id,
                    side = %trade.side,
                    price = %trade.price,
                    quantity = %trade.quantity,
                    base = %self.position.base,
                    average_cost = %self.position.average_cost,
                    profit = %outcome.profit,
                    net_profit = %outcome.net_profit,
                    "Position updated"
                );
                Some(outcome)
            }
            Err(e) => {
                warn!(?e, trade_id = trade.trade_id, "Failed to apply trade");
                None
            }
        }
    }

    /// Apply a batch of trades, returning how many changed the position.
    pub fn apply_trades<'a, I>(&mut self, trades: I) -> usize
    where
        I: IntoIterator<Item = &'a Trade>,
    {
        trades
            .into_iter()
            .filter(|t| self.apply_trade(t).is_some())
            .count()
    }

    fn remember(&mut self, trade_id: u64) -> bool {
        if !self.seen.insert(trade_id) {
            return false;
        }
        self.seen_order.push_back(trade_id);
        if self.seen_order.len() > SEEN_TRADE_CAPACITY {
            if let Some(old) = self.seen_order.pop_front() {
                self.seen.remove(&old);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use scm_core::{OrderSide, Price, Size};

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

    fn trade(id: u64, side: OrderSide, price: Decimal, qty: Decimal) -> Trade {
        Trade {
            trade_id: id,
            order_id: 100 + id,
            symbol: "USDCUSDT".to_string(),
            side,
            price: Price::new(price),
            quantity: Size::new(qty),
            fee: Decimal::ZERO,
            fee_currency: "USDT".to_string(),
            is_maker: true,
            time: Utc::now(),
        }
    }

    #[test]
    fn test_starts_flat_without_state() {
        let tracker = PositionTracker::new(market(), None, None);
        assert!(tracker.position().is_closed());
        assert_eq!(tracker.profit_stats().trade_count, 0);
    }

    #[test]
    fn test_restores_persisted_position() {
        let mut stored = Position::new(&market());
        stored.base = dec!(25);
        stored.average_cost = Price::new(dec!(0.9997));

        let tracker = PositionTracker::new(market(), Some(stored.clone()), None);
        assert_eq!(tracker.position(), &stored);
    }

    #[test]
    fn test_foreign_position_discarded() {
        let mut other = market();
        other.symbol = "DAIUSDT".to_string();
        let mut stored = Position::new(&other);
        stored.base = dec!(25);

        let tracker = PositionTracker::new(market(), Some(stored), None);
        assert!(tracker.position().is_closed());
        assert_eq!(tracker.position().symbol, "USDCUSDT");
    }

    #[test]
    fn test_duplicate_trade_ignored() {
        let mut tracker = PositionTracker::new(market(), None, None);
        let t = trade(1, OrderSide::Buy, dec!(1.0), dec!(10));

        assert!(tracker.apply_trade(&t).is_some());
        assert!(tracker.apply_trade(&t).is_none());
        assert_eq!(tracker.position().base, dec!(10));
        assert_eq!(tracker.profit_stats().trade_count, 1);
    }

    #[test]
    fn test_apply_batch_updates_stats() {
        let mut tracker = PositionTracker::new(market(), None, None);
        let trades = vec![
            trade(1, OrderSide::Buy, dec!(0.9990), dec!(10)),
            trade(2, OrderSide::Sell, dec!(1.0010), dec!(10)),
        ];

        assert_eq!(tracker.apply_trades(&trades), 2);
        assert!(tracker.position().is_closed());
        assert_eq!(tracker.profit_stats().accumulated_profit, dec!(0.0200));
    }

    #[test]
    fn test_other_symbol_ignored() {
        let mut tracker = PositionTracker::new(market(), None, None);
        let mut t = trade(1, OrderSide::Buy, dec!(1.0), dec!(10));
        t.symbol = "BTCUSDT".to_string();

        assert!(tracker.apply_trade(&t).is_none());
        assert!(tracker.position().is_closed());
    }
}
