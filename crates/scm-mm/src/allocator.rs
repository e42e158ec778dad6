//! Liquidity layer allocation.
//!
//! Turns a `PriceLadder` into per-layer order intents. Quantities follow
//! the scale weights:
//!
//! ```text
//! n        = Σ weight(i), i in [0, N]
//! ask_unit = available_base / n
//! bid_unit = available_quote / (n × Σ bid_i)
//! ask_i    = weight(i) × ask_unit
//! bid_i    = weight(i) × bid_unit
//! ```
//!
//! Both unit rates are truncated to 8 decimals and every quantity is floored
//! to the market step size, so rounding can only under-allocate. Each side of
//! each layer then passes three gates in order: loss gate (never close
//! inventory below/above average cost), dust gate, and a `QuotaLedger` lock.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use scm_core::{Market, OrderSide, Partition, Price, Size, SubmitOrder, Ticker};
use scm_position::Position;

use crate::{MmError, MmResult, PriceLadder, QuotaLedger, SolvedScale, StrategyConfig};

/// Decimal places kept on the per-unit allocation rates.
const UNIT_RATE_DP: u32 = 8;

/// Decimal places kept when a scale weight enters decimal arithmetic.
const WEIGHT_DP: u32 = 12;

/// Why one side of a layer produced no intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Would close inventory at a realized loss.
    LossGate,
    /// Below the venue's minimum quantity or notional.
    Dust,
    /// Not enough balance left in the ledger.
    Quota,
    /// Non-positive ladder price.
    InvalidPrice,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LossGate => "loss_gate",
            Self::Dust => "dust",
            Self::Quota => "quota",
            Self::InvalidPrice => "invalid_price",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSkip {
    pub layer: u32,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Size,
    pub reason: SkipReason,
}

/// Inputs read fresh at the start of a liquidity tick.
#[derive(Debug, Clone, Copy)]
pub struct AllocationInput<'a> {
    pub ladder: &'a PriceLadder,
    pub ticker: Ticker,
    pub available_base: Decimal,
    pub available_quote: Decimal,
    pub position: &'a Position,
    pub market: &'a Market,
}

/// Result of one allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationPlan {
    /// Intents in layer order, bid before ask within a layer.
    pub intents: Vec<SubmitOrder>,
    pub skipped: Vec<LayerSkip>,
    pub bid_unit: Decimal,
    pub ask_unit: Decimal,
    /// Normalization sum n as used in the unit rates.
    pub weight_sum: Decimal,
}

impl AllocationPlan {
    pub fn count(&self, side: OrderSide) -> usize {
        self.intents.iter().filter(|o| o.side == side).count()
    }
}

#[derive(Debug, Clone)]
pub struct LiquidityAllocator {
    scale: SolvedScale,
    layers: u32,
    max_exposure: Option<Decimal>,
}

impl LiquidityAllocator {
    pub fn new(scale: SolvedScale, layers: u32, max_exposure: Option<Decimal>) -> Self {
        Self {
            scale,
            layers,
            max_exposure,
        }
    }

    /// Build from configuration. Fails when the scale cannot be solved.
    pub fn from_config(config: &StrategyConfig) -> MmResult<Self> {
        let scale = config.solve_scale()?;
        Ok(Self::new(
            scale,
            config.num_of_liquidity_layers,
            config.exposure_cap(),
        ))
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    pub fn scale(&self) -> &SolvedScale {
        &self.scale
    }

    pub fn allocate(&self, input: &AllocationInput<'_>) -> MmResult<AllocationPlan> {
        let AllocationInput {
            ladder,
            ticker,
            position,
            market,
            ..
        } = *input;

        if ladder.len() != self.layers as usize + 1 {
            return Err(MmError::InvalidInput(format!(
                "ladder has {} layers, expected {}",
                ladder.len(),
                self.layers + 1
            )));
        }

        let weight_sum = self.scale.sum_over_layers(self.layers);
        let n = to_decimal(weight_sum);
        if n <= Decimal::ZERO {
            return Err(MmError::ZeroWeightSum {
                layers: self.layers,
                sum: weight_sum,
            });
        }

        let (mut base, mut quote) =
            self.cap_exposure(input.available_base, input.available_quote, ticker)?;

        let mut ledger = QuotaLedger::new(base, quote);

        // Inventory already held is not quoted again
        if !position.is_dust(market) {
            if position.is_long() {
                base = (base - position.size().inner()).max(Decimal::ZERO);
            } else if position.is_short() {
                quote = (quote - position.notional(ticker.sell)).max(Decimal::ZERO);
            }
        }

        let ask_unit = truncate_unit(base / n);
        let bid_sum = ladder.bid_sum().inner();
        let bid_unit = if bid_sum > Decimal::ZERO {
            truncate_unit(quote / (n * bid_sum))
        } else {
            Decimal::ZERO
        };

        debug!(
            base = %base,
            quote = %quote,
            weight_sum = %n,
            bid_unit = %bid_unit,
            ask_unit = %ask_unit,
            "Allocating liquidity layers"
        );

        let mut plan = AllocationPlan {
            bid_unit,
            ask_unit,
            weight_sum: n,
            ..Default::default()
        };

        for (i, (bid, ask)) in ladder.bids().iter().zip(ladder.asks()).enumerate() {
            let layer = i as u32;
            let weight = to_decimal(self.scale.layer_weight(layer));
            let bid_qty = Size::new(market.round_down_quantity(weight * bid_unit));
            let ask_qty = Size::new(market.round_down_quantity(weight * ask_unit));

            debug!(
                layer,
                bid = %bid,
                bid_quantity = %bid_qty,
                ask = %ask,
                ask_quantity = %ask_qty,
                "Liquidity layer"
            );

            let bid_gate = gate(position, OrderSide::Buy, *bid, bid_qty, market)
                .or_else(|| (!ledger.lock_quote(bid_qty.notional(*bid))).then_some(SkipReason::Quota));
            plan.push(layer, OrderSide::Buy, *bid, bid_qty, bid_gate, market);

            let ask_gate = gate(position, OrderSide::Sell, *ask, ask_qty, market)
                .or_else(|| (!ledger.lock_base(ask_qty.inner())).then_some(SkipReason::Quota));
            plan.push(layer, OrderSide::Sell, *ask, ask_qty, ask_gate, market);
        }

        ledger.commit();
        Ok(plan)
    }

    /// Cap quote directly and base by its value at the best ask.
    fn cap_exposure(
        &self,
        base: Decimal,
        quote: Decimal,
        ticker: Ticker,
    ) -> MmResult<(Decimal, Decimal)> {
        let Some(cap) = self.max_exposure else {
            return Ok((base, quote));
        };
        if !ticker.sell.is_positive() {
            return Err(MmError::InvalidInput(format!(
                "best ask must be positive to cap exposure, got {}",
                ticker.sell
            )));
        }

        let quote = quote.min(cap);
        let base = if base * ticker.sell.inner() > cap {
            cap / ticker.sell.inner()
        } else {
            base
        };
        Ok((base, quote))
    }
}

impl AllocationPlan {
    fn push(
        &mut self,
        layer: u32,
        side: OrderSide,
        price: Price,
        quantity: Size,
        skip: Option<SkipReason>,
        market: &Market,
    ) {
        match skip {
            Some(reason) => {
                debug!(layer, %side, %price, %quantity, reason = reason.as_str(), "Skipping layer side");
                self.skipped.push(LayerSkip {
                    layer,
                    side,
                    price,
                    quantity,
                    reason,
                });
            }
            None => self.intents.push(SubmitOrder::maker(
                &market.symbol,
                side,
                price,
                quantity,
                Partition::Liquidity,
                Some(layer),
            )),
        }
    }
}

/// Checks that do not touch the ledger.
fn gate(
    position: &Position,
    side: OrderSide,
    price: Price,
    quantity: Size,
    market: &Market,
) -> Option<SkipReason> {
    if !price.is_positive() {
        return Some(SkipReason::InvalidPrice);
    }
    let at_loss = !position.is_dust(market)
        && match side {
            OrderSide::Buy => position.is_short() && price > position.average_cost,
            OrderSide::Sell => position.is_long() && price < position.average_cost,
        };
    if at_loss {
        return Some(SkipReason::LossGate);
    }
    if market.is_dust_quantity(quantity, price) {
        return Some(SkipReason::Dust);
    }
    None
}

fn truncate_unit(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(UNIT_RATE_DP, RoundingStrategy::ToZero)
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(WEIGHT_DP, RoundingStrategy::ToZero))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LadderParams, ScaleBounds, ScaleConfig};
    use rust_decimal_macros::dec;

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

    fn ticker() -> Ticker {
        Ticker::new(Price::new(dec!(0.9999)), Price::new(dec!(1.0001)))
    }

    /// Two grid steps, constant weight 1: n = 3.
    fn allocator(max_exposure: Option<Decimal>) -> LiquidityAllocator {
        let scale = ScaleConfig::Linear(ScaleBounds::new([0.0, 2.0], [1.0, 1.0]))
            .solve()
            .unwrap();
        LiquidityAllocator::new(scale, 2, max_exposure)
    }

    /// bids [0.9999, 0.9999, 0.9990], asks [1.0001, 1.0001, 1.0010]
    fn ladder() -> PriceLadder {
        let params = LadderParams {
            ticker: ticker(),
            mid_price: Price::new(dec!(1.0)),
            band_width: Price::new(dec!(0.001)),
            tick_size: Price::new(dec!(0.0001)),
            layers: 2,
        };
        PriceLadder::build(&params, &market()).unwrap()
    }

    fn position(base: Decimal, avg: Decimal) -> Position {
        let mut p = Position::new(&market());
        p.base = base;
        p.average_cost = Price::new(avg);
        p
    }

    fn allocate(
        alloc: &LiquidityAllocator,
        base: Decimal,
        quote: Decimal,
        pos: &Position,
    ) -> AllocationPlan {
        let ladder = ladder();
        let market = market();
        alloc
            .allocate(&AllocationInput {
                ladder: &ladder,
                ticker: ticker(),
                available_base: base,
                available_quote: quote,
                position: pos,
                market: &market,
            })
            .unwrap()
    }

    #[test]
    fn test_flat_position_quotes_every_layer() {
        let flat = Position::new(&market());
        let plan = allocate(&allocator(None), dec!(300), dec!(300), &flat);

        assert_eq!(plan.intents.len(), 6);
        assert!(plan.skipped.is_empty());
        assert_eq!(plan.ask_unit, dec!(100));
        // 300 / (3 × 2.9988)
        assert_eq!(plan.bid_unit, dec!(33.34667200));

        let first = &plan.intents[0];
        assert_eq!(first.side, OrderSide::Buy);
        assert_eq!(first.layer, Some(0));
        assert_eq!(first.partition, Partition::Liquidity);
        assert_eq!(first.quantity.inner(), dec!(33.34));
        assert_eq!(plan.intents[1].quantity.inner(), dec!(100));
    }

    #[test]
    fn test_total_quote_within_balance() {
        let flat = Position::new(&market());
        let plan = allocate(&allocator(None), dec!(300), dec!(300), &flat);

        let quote_used: Decimal = plan
            .intents
            .iter()
            .filter(|o| o.side == OrderSide::Buy)
            .map(SubmitOrder::notional)
            .sum();
        let base_used: Decimal = plan
            .intents
            .iter()
            .filter(|o| o.side == OrderSide::Sell)
            .map(|o| o.quantity.inner())
            .sum();
        assert!(quote_used <= dec!(300));
        assert!(base_used <= dec!(300));
    }

    #[test]
    fn test_exposure_cap_limits_both_sides() {
        let flat = Position::new(&market());
        let plan = allocate(&allocator(Some(dec!(150))), dec!(300), dec!(300), &flat);

        // base capped to 150 / 1.0001
        assert_eq!(plan.ask_unit, dec!(49.99500049));
        for order in &plan.intents {
            match order.side {
                OrderSide::Sell => assert_eq!(order.quantity.inner(), dec!(49.99)),
                OrderSide::Buy => assert_eq!(order.quantity.inner(), dec!(16.67)),
            }
        }
    }

    #[test]
    fn test_long_position_not_quoted_again() {
        let long = position(dec!(100), dec!(0.9990));
        let plan = allocate(&allocator(None), dec!(300), dec!(300), &long);

        // (300 - 100) / 3
        assert_eq!(plan.ask_unit, dec!(66.66666666));
        assert_eq!(plan.count(OrderSide::Sell), 3);
    }

    #[test]
    fn test_short_position_reserves_quote() {
        let short = position(dec!(-100), dec!(1.0005));
        let plan = allocate(&allocator(None), dec!(300), dec!(300), &short);

        // (300 - 100 × 1.0001) / (3 × 2.9988)
        let expected = (dec!(199.99) / dec!(8.9964))
            .round_dp_with_strategy(8, RoundingStrategy::ToZero);
        assert_eq!(plan.bid_unit, expected);
    }

    #[test]
    fn test_long_never_sells_below_cost() {
        let long = position(dec!(100), dec!(1.0005));
        let plan = allocate(&allocator(None), dec!(300), dec!(300), &long);

        assert_eq!(plan.count(OrderSide::Sell), 1);
        assert!(plan
            .intents
            .iter()
            .filter(|o| o.side == OrderSide::Sell)
            .all(|o| o.price >= long.average_cost));
        let gated: Vec<u32> = plan
            .skipped
            .iter()
            .filter(|s| s.reason == SkipReason::LossGate)
            .map(|s| s.layer)
            .collect();
        assert_eq!(gated, vec![0, 1]);
    }

    #[test]
    fn test_dust_long_keeps_every_ask() {
        let dust = position(dec!(0.5), dec!(1.0005));
        let plan = allocate(&allocator(None), dec!(300), dec!(300), &dust);

        assert_eq!(plan.count(OrderSide::Sell), 3);
        assert!(plan
            .skipped
            .iter()
            .all(|s| s.reason != SkipReason::LossGate));
        // dust is not subtracted from the base budget
        assert_eq!(plan.ask_unit, dec!(100));
    }

    #[test]
    fn test_dust_short_keeps_every_bid() {
        let dust = position(dec!(-0.5), dec!(0.9990));
        let plan = allocate(&allocator(None), dec!(300), dec!(300), &dust);

        assert_eq!(plan.count(OrderSide::Buy), 3);
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn test_short_never_buys_above_cost() {
        let short = position(dec!(-100), dec!(0.9995));
        let plan = allocate(&allocator(None), dec!(300), dec!(300), &short);

        let buys: Vec<&SubmitOrder> = plan
            .intents
            .iter()
            .filter(|o| o.side == OrderSide::Buy)
            .collect();
        assert_eq!(buys.len(), 1);
        assert_eq!(buys[0].price.inner(), dec!(0.9990));
    }

    #[test]
    fn test_dust_sides_skipped() {
        let flat = Position::new(&market());
        let plan = allocate(&allocator(None), dec!(6), dec!(6), &flat);

        assert!(plan.intents.is_empty());
        assert_eq!(plan.skipped.len(), 6);
        assert!(plan.skipped.iter().all(|s| s.reason == SkipReason::Dust));
    }

    #[test]
    fn test_ladder_size_mismatch_rejected() {
        let flat = Position::new(&market());
        let ladder = ladder();
        let market = market();
        let alloc = LiquidityAllocator::new(allocator(None).scale, 5, None);

        let result = alloc.allocate(&AllocationInput {
            ladder: &ladder,
            ticker: ticker(),
            available_base: dec!(100),
            available_quote: dec!(100),
            position: &flat,
            market: &market,
        });
        assert!(matches!(result, Err(MmError::InvalidInput(_))));
    }

    #[test]
    fn test_from_config_uses_cap() {
        let config = StrategyConfig {
            max_exposure: dec!(500),
            num_of_liquidity_layers: 3,
            ..Default::default()
        };
        let alloc = LiquidityAllocator::from_config(&config).unwrap();
        assert_eq!(alloc.layers(), 3);
        assert_eq!(alloc.max_exposure, Some(dec!(500)));
    }
}
