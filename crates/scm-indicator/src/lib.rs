//! Streaming indicators computed from closed candles.
//!
//! - `Ewma`: exponentially weighted moving average of close prices
//!   (mid-price estimate)
//! - `Bollinger`: k × standard deviation of close prices over a window
//!   (volatility band width)
//!
//! Both accept one close at a time and expose the latest value through
//! `last()`. Warm them with `preload` from historical candles before use.

pub mod bollinger;
pub mod error;
pub mod ewma;

pub use bollinger::Bollinger;
pub use error::{IndicatorError, IndicatorResult};
pub use ewma::Ewma;

use scm_core::{Interval, KLine};

/// Indicator fed from closed candles of a single interval.
pub trait CandleIndicator {
    /// Interval this indicator consumes.
    fn interval(&self) -> Interval;

    /// Push one close price.
    fn update(&mut self, close: f64);

    /// Latest value, `None` until warmed up.
    fn last(&self) -> Option<f64>;

    /// Feed a closed candle if it matches the indicator's interval.
    ///
    /// Returns true if the candle was consumed.
    fn on_kline_closed(&mut self, kline: &KLine) -> bool {
        if !kline.closed || kline.interval != self.interval() {
            return false;
        }
        self.update(kline.close.to_f64());
        true
    }

    /// Warm up from historical candles. Returns the number consumed.
    fn preload(&mut self, klines: &[KLine]) -> usize {
        klines.iter().filter(|k| self.on_kline_closed(k)).count()
    }
}
