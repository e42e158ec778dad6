//! Exponentially weighted moving average.
//!
//! EWMA[t] = alpha * close[t] + (1 - alpha) * EWMA[t-1], alpha = 2 / (window + 1).
//! Seeded with the first close, so the value is available after one candle.

use scm_core::Interval;

use crate::{CandleIndicator, IndicatorError, IndicatorResult};

#[derive(Debug, Clone)]
pub struct Ewma {
    interval: Interval,
    alpha: f64,
    value: Option<f64>,
    count: usize,
}

impl Ewma {
    pub fn new(interval: Interval, window: usize) -> IndicatorResult<Self> {
        if window == 0 {
            return Err(IndicatorError::InvalidWindow(window));
        }
        Ok(Self {
            interval,
            alpha: 2.0 / (window as f64 + 1.0),
            value: None,
            count: 0,
        })
    }

    /// Number of closes consumed so far.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl CandleIndicator for Ewma {
    fn interval(&self) -> Interval {
        self.interval
    }

    fn update(&mut self, close: f64) {
        if !close.is_finite() {
            return;
        }
        self.value = Some(match self.value {
            None => close,
            Some(prev) => self.alpha * close + (1.0 - self.alpha) * prev,
        });
        self.count += 1;
    }

    fn last(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_ewma_empty_is_none() {
        let ewma = Ewma::new(Interval::OneMinute, 5).unwrap();
        assert!(ewma.last().is_none());
    }

    #[test]
    fn test_ewma_seeded_with_first_close() {
        let mut ewma = Ewma::new(Interval::OneMinute, 5).unwrap();
        ewma.update(1.0002);
        assert_approx(ewma.last().unwrap(), 1.0002);
    }

    #[test]
    fn test_ewma_recursion() {
        // window 3 → alpha 0.5
        let mut ewma = Ewma::new(Interval::OneMinute, 3).unwrap();
        ewma.update(1.0);
        ewma.update(2.0);
        assert_approx(ewma.last().unwrap(), 1.5);
        ewma.update(3.0);
        assert_approx(ewma.last().unwrap(), 2.25);
        assert_eq!(ewma.count(), 3);
    }

    #[test]
    fn test_ewma_window_one_tracks_close() {
        let mut ewma = Ewma::new(Interval::OneMinute, 1).unwrap();
        for close in [1.0, 0.9, 1.1] {
            ewma.update(close);
            assert_approx(ewma.last().unwrap(), close);
        }
    }

    #[test]
    fn test_ewma_ignores_nan() {
        let mut ewma = Ewma::new(Interval::OneMinute, 3).unwrap();
        ewma.update(1.0);
        ewma.update(f64::NAN);
        assert_approx(ewma.last().unwrap(), 1.0);
    }

    #[test]
    fn test_ewma_zero_window_rejected() {
        assert!(Ewma::new(Interval::OneMinute, 0).is_err());
    }
}
