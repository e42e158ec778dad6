//! Accumulated profit statistics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scm_core::Trade;

use crate::TradeOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitStats {
    pub symbol: String,
    pub accumulated_profit: Decimal,
    pub accumulated_net_profit: Decimal,
    pub accumulated_fee: Decimal,
    /// Traded volume in base units.
    pub accumulated_volume: Decimal,
    pub trade_count: u64,
    pub today_net_profit: Decimal,
    pub today_since: DateTime<Utc>,
}

impl ProfitStats {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            accumulated_profit: Decimal::ZERO,
            accumulated_net_profit: Decimal::ZERO,
            accumulated_fee: Decimal::ZERO,
            accumulated_volume: Decimal::ZERO,
            trade_count: 0,
            today_net_profit: Decimal::ZERO,
            today_since: Utc::now(),
        }
    }

    pub fn add_trade(&mut self, trade: &Trade, outcome: &TradeOutcome) {
        self.reset_today_if_needed(trade.time);

        self.accumulated_volume += trade.quantity.inner();
        self.accumulated_fee += outcome.fee_in_quote;
        self.accumulated_profit += outcome.profit;
        self.accumulated_net_profit += outcome.net_profit;
        self.today_net_profit += outcome.net_profit;
        self.trade_count += 1;
    }

    fn reset_today_if_needed(&mut self, now: DateTime<Utc>) {
        if now.date_naive() != self.today_since.date_naive() {
            self.today_net_profit = Decimal::ZERO;
            self.today_since = now;
        }
    }
}
