//! Quote ladder construction.
//!
//! Layer 0 quotes at the touch, layers 1..N-1 sit on a fixed tick grid
//! around the mid-price estimate, and layer N sits at the volatility band
//! edge (mid ± band width). Inner layers never quote through the touch:
//! a bid above the best bid is pushed to `best_bid - spread_i`, an ask below
//! the best ask to `best_ask + spread_i`.

use rust_decimal::Decimal;

use scm_core::{Market, OrderSide, Price, Ticker};

use crate::{MmError, MmResult};

/// Inputs of one ladder computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderParams {
    pub ticker: Ticker,
    pub mid_price: Price,
    pub band_width: Price,
    /// Distance between grid layers.
    pub tick_size: Price,
    /// Outermost layer index N; the ladder has N + 1 layers.
    pub layers: u32,
}

/// Bid and ask prices per layer, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLadder {
    bids: Vec<Price>,
    asks: Vec<Price>,
}

impl PriceLadder {
    pub fn build(params: &LadderParams, market: &Market) -> MmResult<Self> {
        validate(params)?;

        let LadderParams {
            ticker,
            mid_price,
            band_width,
            layers,
            ..
        } = *params;
        // Grid steps finer than the venue tick would collapse after truncation
        let step = params.tick_size.max(market.tick_size);

        let capacity = layers as usize + 1;
        let mut bids = Vec::with_capacity(capacity);
        let mut asks = Vec::with_capacity(capacity);

        for i in 0..=layers {
            let spread = step * Decimal::from(i);

            let (mut bid, mut ask) = if i == 0 {
                (ticker.buy, ticker.sell)
            } else if i == layers {
                (mid_price - band_width, mid_price + band_width)
            } else {
                (mid_price - spread, mid_price + spread)
            };

            if i > 0 {
                if bid > ticker.buy {
                    bid = ticker.buy - spread;
                }
                if ask < ticker.sell {
                    ask = ticker.sell + spread;
                }
            }

            bids.push(market.truncate_price(bid.max(Price::ZERO), OrderSide::Buy));
            asks.push(market.truncate_price(ask, OrderSide::Sell));
        }

        // A mid estimate several ticks off the touch mixes clamped and unclamped
        // grid layers; keep the grid monotonic. Layer N is anchored separately.
        for i in 1..layers as usize {
            bids[i] = bids[i].min(bids[i - 1]);
            asks[i] = asks[i].max(asks[i - 1]);
        }

        Ok(Self { bids, asks })
    }

    pub fn bids(&self) -> &[Price] {
        &self.bids
    }

    pub fn asks(&self) -> &[Price] {
        &self.asks
    }

    pub fn bid(&self, layer: usize) -> Option<Price> {
        self.bids.get(layer).copied()
    }

    pub fn ask(&self, layer: usize) -> Option<Price> {
        self.asks.get(layer).copied()
    }

    /// Number of layers (N + 1).
    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    /// Σ bid prices, the denominator coupling for the bid unit rate.
    pub fn bid_sum(&self) -> Price {
        self.bids.iter().sum()
    }
}

fn validate(params: &LadderParams) -> MmResult<()> {
    if params.layers == 0 {
        return Err(MmError::InvalidInput(
            "ladder needs at least one layer beyond the touch".to_string(),
        ));
    }
    if !params.tick_size.is_positive() {
        return Err(MmError::InvalidInput(format!(
            "layer tick size must be positive, got {}",
            params.tick_size
        )));
    }
    if !params.ticker.is_valid() {
        return Err(MmError::InvalidInput(format!(
            "ticker buy={} sell={} is not a valid touch",
            params.ticker.buy, params.ticker.sell
        )));
    }
    if !params.mid_price.is_positive() {
        return Err(MmError::InvalidInput(format!(
            "mid price must be positive, got {}",
            params.mid_price
        )));
    }
    if params.band_width < Price::ZERO {
        return Err(MmError::InvalidInput(format!(
            "band width must not be negative, got {}",
            params.band_width
        )));
    }
    Ok(())
}
