//! Market metadata.
//!
//! Describes the tradable pair: currencies, price/quantity increments and the
//! venue's minimum tradable size. Every price and quantity the strategy emits
//! goes through the truncation helpers here first.

use crate::{CoreError, OrderSide, Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market specification for a single symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Exchange symbol (e.g., "USDCUSDT").
    pub symbol: String,

    /// Base currency (e.g., "USDC").
    pub base_currency: String,

    /// Quote currency (e.g., "USDT").
    pub quote_currency: String,

    /// Minimum price increment.
    pub tick_size: Price,

    /// Minimum quantity increment.
    pub step_size: Size,

    /// Minimum order quantity.
    #[serde(default)]
    pub min_quantity: Size,

    /// Minimum order notional in quote currency.
    #[serde(default)]
    pub min_notional: Decimal,
}

impl Market {
    /// Validate the increments.
    pub fn validate(&self) -> crate::Result<()> {
        if self.symbol.is_empty() {
            return Err(CoreError::InvalidMarket("symbol is empty".to_string()));
        }
        if !self.tick_size.is_positive() {
            return Err(CoreError::InvalidMarket(format!(
                "tick_size must be positive, got {}",
                self.tick_size
            )));
        }
        if !self.step_size.is_positive() {
            return Err(CoreError::InvalidMarket(format!(
                "step_size must be positive, got {}",
                self.step_size
            )));
        }
        Ok(())
    }

    /// Truncate a price toward the safe side for the given order side.
    ///
    /// Bids round down, asks round up, so truncation never moves a quote
    /// closer to (or through) the opposite side of the book.
    pub fn truncate_price(&self, price: Price, side: OrderSide) -> Price {
        match side {
            OrderSide::Buy => price.floor_to_tick(self.tick_size),
            OrderSide::Sell => price.ceil_to_tick(self.tick_size),
        }
    }

    /// Round a quantity down to the step size.
    pub fn truncate_quantity(&self, quantity: Size) -> Size {
        quantity.round_to_step(self.step_size)
    }

    /// Round a raw decimal amount down to the step size, flooring negatives at zero.
    pub fn round_down_quantity(&self, amount: Decimal) -> Decimal {
        if amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        Size::new(amount).round_to_step(self.step_size).inner()
    }

    /// Whether the quantity is below what the venue allows to trade at `price`.
    ///
    /// A quantity exactly at the minimum is treated as dust as well.
    pub fn is_dust_quantity(&self, quantity: Size, price: Price) -> bool {
        if quantity.inner() <= self.min_quantity.inner() {
            return true;
        }
        quantity.notional(price) <= self.min_notional
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usdc_usdt() -> Market {
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

    #[test]
    fn test_truncate_price_safe_side() {
        let market = usdc_usdt();
        let raw = Price::new(dec!(1.00015));

        assert_eq!(
            market.truncate_price(raw, OrderSide::Buy).inner(),
            dec!(1.0001)
        );
        assert_eq!(
            market.truncate_price(raw, OrderSide::Sell).inner(),
            dec!(1.0002)
        );
    }

    #[test]
    fn test_truncate_quantity() {
        let market = usdc_usdt();
        assert_eq!(
            market.truncate_quantity(Size::new(dec!(10.129))).inner(),
            dec!(10.12)
        );
    }

    #[test]
    fn test_round_down_quantity_negative_is_zero() {
        let market = usdc_usdt();
        assert_eq!(market.round_down_quantity(dec!(-3.5)), Decimal::ZERO);
        assert_eq!(market.round_down_quantity(dec!(3.555)), dec!(3.55));
    }

    #[test]
    fn test_dust_by_min_quantity() {
        let market = usdc_usdt();
        let price = Price::new(dec!(1));

        assert!(market.is_dust_quantity(Size::new(dec!(0.5)), price));
        assert!(market.is_dust_quantity(Size::new(dec!(1)), price));
    }

    #[test]
    fn test_dust_by_min_notional() {
        let market = usdc_usdt();
        let price = Price::new(dec!(1));

        // 4 USDC * 1.0 = 4 USDT < 5 USDT minimum
        assert!(market.is_dust_quantity(Size::new(dec!(4)), price));
        assert!(!market.is_dust_quantity(Size::new(dec!(6)), price));
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let mut market = usdc_usdt();
        market.tick_size = Price::ZERO;
        assert!(market.validate().is_err());
    }
}
