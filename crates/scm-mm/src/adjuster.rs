//! Inventory adjustment.
//!
//! Produces at most one maker order that moves a non-dust position toward
//! flat. The price never gives up the configured margin over average cost:
//!
//! - short: buy at `min(avg × (1 - fee - min_profit), best_ask - tick)`
//! - long: sell at `max(avg × (1 + fee + min_profit), best_bid + tick)`

use rust_decimal::Decimal;
use tracing::debug;

use scm_core::{Market, OrderSide, Partition, Price, Size, SubmitOrder, Ticker};
use scm_position::Position;

/// Price that realizes at least `fee_rate + min_profit` over `average_cost`
/// when closing with an order on `side`.
pub fn profit_protected_price(
    side: OrderSide,
    average_cost: Price,
    fee_rate: Decimal,
    min_profit: Decimal,
) -> Price {
    let margin = average_cost * (fee_rate + min_profit);
    match side {
        OrderSide::Buy => average_cost - margin,
        OrderSide::Sell => average_cost + margin,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdjustmentInput<'a> {
    pub position: &'a Position,
    pub ticker: Ticker,
    pub available_base: Decimal,
    pub available_quote: Decimal,
    pub market: &'a Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryAdjuster {
    fee_rate: Decimal,
    min_profit: Decimal,
}

impl InventoryAdjuster {
    pub fn new(fee_rate: Decimal, min_profit: Decimal) -> Self {
        Self {
            fee_rate,
            min_profit,
        }
    }

    pub fn adjust(&self, input: &AdjustmentInput<'_>) -> Option<SubmitOrder> {
        let AdjustmentInput {
            position,
            ticker,
            market,
            ..
        } = *input;

        if position.is_dust(market) {
            debug!(base = %position.base, "Position is dust, nothing to adjust");
            return None;
        }

        let tick = market.tick_size;
        let (side, price, quantity) = if position.is_short() {
            let floor = self.floor_price(OrderSide::Buy, position.average_cost);
            let price = market.truncate_price(floor.min(ticker.sell - tick), OrderSide::Buy);
            if !price.is_positive() {
                return None;
            }
            let affordable = input.available_quote / price.inner();
            let quantity = position.size().inner().min(affordable);
            (OrderSide::Buy, price, quantity)
        } else {
            let floor = self.floor_price(OrderSide::Sell, position.average_cost);
            let price = market.truncate_price(floor.max(ticker.buy + tick), OrderSide::Sell);
            let quantity = position.size().inner().min(input.available_base);
            (OrderSide::Sell, price, quantity)
        };

        let quantity = Size::new(market.round_down_quantity(quantity));
        if market.is_dust_quantity(quantity, price) {
            debug!(%side, %price, %quantity, "Adjustment quantity is dust, skipping");
            return None;
        }

        debug!(
            %side,
            %price,
            %quantity,
            average_cost = %position.average_cost,
            "Adjustment order"
        );
        Some(SubmitOrder::maker(
            &market.symbol,
            side,
            price,
            quantity,
            Partition::Adjustment,
            None,
        ))
    }

    fn floor_price(&self, side: OrderSide, average_cost: Price) -> Price {
        profit_protected_price(side, average_cost, self.fee_rate, self.min_profit)
    }
}
