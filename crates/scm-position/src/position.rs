//! Strategy position in a single market.
//!
//! The sign of `base` classifies the position: positive = long,
//! negative = short, zero = flat. "Dust" is a position whose size the venue
//! would not accept as an order at the average cost.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scm_core::{Market, OrderSide, Price, Size, Trade};

use crate::{PositionError, PositionResult};

/// Exchange fee rates attached to the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeRates {
    pub maker_fee_rate: Decimal,
    pub taker_fee_rate: Decimal,
}

/// Result of applying one trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TradeOutcome {
    /// Realized profit before fees (zero when the trade only adds to the position).
    pub profit: Decimal,
    /// Realized profit after the trade's fee.
    pub net_profit: Decimal,
    /// Trade fee converted to quote currency.
    pub fee_in_quote: Decimal,
    /// Whether the trade reduced an existing position.
    pub realized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    /// Net base quantity (positive = long, negative = short).
    pub base: Decimal,
    /// Net quote flow from trades (negative after buying).
    pub quote: Decimal,
    /// Average entry cost, quote per base.
    pub average_cost: Price,
    #[serde(default)]
    pub fee_rates: Option<FeeRates>,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub changed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Flat position for a market.
    pub fn new(market: &Market) -> Self {
        Self {
            symbol: market.symbol.clone(),
            base_currency: market.base_currency.clone(),
            quote_currency: market.quote_currency.clone(),
            base: Decimal::ZERO,
            quote: Decimal::ZERO,
            average_cost: Price::ZERO,
            fee_rates: None,
            opened_at: None,
            changed_at: None,
        }
    }

    pub fn set_fee_rates(&mut self, rates: FeeRates) {
        self.fee_rates = Some(rates);
    }

    pub fn is_long(&self) -> bool {
        self.base > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.base < Decimal::ZERO
    }

    pub fn is_closed(&self) -> bool {
        self.base.is_zero()
    }

    /// Absolute position size.
    pub fn size(&self) -> Size {
        Size::new(self.base.abs())
    }

    /// Whether the position is too small to trade at its average cost.
    pub fn is_dust(&self, market: &Market) -> bool {
        market.is_dust_quantity(self.size(), self.average_cost)
    }

    /// Quote-currency value of the position at `price`.
    pub fn notional(&self, price: Price) -> Decimal {
        self.size().notional(price)
    }

    /// Apply a fill and return the realized profit, if any.
    pub fn add_trade(&mut self, trade: &Trade) -> PositionResult<TradeOutcome> {
        if trade.symbol != self.symbol {
            return Err(PositionError::SymbolMismatch {
                expected: self.symbol.clone(),
                actual: trade.symbol.clone(),
            });
        }
        if !trade.quantity.is_positive() || !trade.price.is_positive() {
            return Err(PositionError::InvalidTrade(format!(
                "trade {} has non-positive price or quantity",
                trade.trade_id
            )));
        }

        let fee_in_quote = self.fee_in_quote(trade);
        let fill_size = trade.quantity.inner();
        let fill_price = trade.price.inner();

        let signed_size = match trade.side {
            OrderSide::Buy => fill_size,
            OrderSide::Sell => -fill_size,
        };

        let old_size = self.base;
        let new_size = old_size + signed_size;
        let avg = self.average_cost.inner();

        let mut outcome = TradeOutcome {
            fee_in_quote,
            net_profit: -fee_in_quote,
            ..Default::default()
        };

        // Reducing an existing position realizes profit on the overlapping part
        if (old_size > Decimal::ZERO && signed_size < Decimal::ZERO)
            || (old_size < Decimal::ZERO && signed_size > Decimal::ZERO)
        {
            let reduce_amount = fill_size.min(old_size.abs());
            let profit = if old_size > Decimal::ZERO {
                (fill_price - avg) * reduce_amount
            } else {
                (avg - fill_price) * reduce_amount
            };
            outcome.profit = profit;
            outcome.net_profit = profit - fee_in_quote;
            outcome.realized = true;
        }

        if new_size.is_zero() {
            self.average_cost = Price::ZERO;
        } else if !old_size.is_zero() && new_size.signum() != old_size.signum() {
            // Flipped: the remainder was opened at the fill price
            self.average_cost = trade.price;
        } else if old_size.is_zero() || new_size.signum() == signed_size.signum() {
            // Opening or adding: weighted average
            let old_notional = old_size.abs() * avg;
            let new_notional = fill_size * fill_price;
            self.average_cost = Price::new((old_notional + new_notional) / new_size.abs());
        }

        if old_size.is_zero() {
            self.opened_at = Some(trade.time);
        }
        self.base = new_size;
        self.quote -= signed_size * fill_price;
        self.changed_at = Some(trade.time);

        Ok(outcome)
    }

    fn fee_in_quote(&self, trade: &Trade) -> Decimal {
        if trade.fee_currency == self.quote_currency {
            trade.fee
        } else if trade.fee_currency == self.base_currency {
            trade.fee * trade.price.inner()
        } else {
            Decimal::ZERO
        }
    }
}
