//! Bollinger band width.
//!
//! Width = k × stddev(close, window), population stddev (divide by N).
//! The band is centered on the SMA; the strategy only needs the half-width,
//! which anchors the outermost ladder layer. `last()` is `None` until
//! `window` closes have been seen.

use std::collections::VecDeque;

use scm_core::Interval;

use crate::{CandleIndicator, IndicatorError, IndicatorResult};

#[derive(Debug, Clone)]
pub struct Bollinger {
    interval: Interval,
    window: usize,
    k: f64,
    closes: VecDeque<f64>,
}

impl Bollinger {
    pub fn new(interval: Interval, window: usize, k: f64) -> IndicatorResult<Self> {
        if window == 0 {
            return Err(IndicatorError::InvalidWindow(window));
        }
        if !k.is_finite() || k < 0.0 {
            return Err(IndicatorError::InvalidMultiplier(k));
        }
        Ok(Self {
            interval,
            window,
            k,
            closes: VecDeque::with_capacity(window),
        })
    }

    fn is_ready(&self) -> bool {
        self.closes.len() == self.window
    }

    /// Simple moving average over the window.
    pub fn middle(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        Some(self.closes.iter().sum::<f64>() / self.window as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.middle()?;
        let variance = self
            .closes
            .iter()
            .map(|c| {
                let d = c - mean;
                d * d
            })
            .sum::<f64>()
            / self.window as f64;
        Some(variance.sqrt())
    }

    pub fn upper(&self) -> Option<f64> {
        Some(self.middle()? + self.last()?)
    }

    pub fn lower(&self) -> Option<f64> {
        Some(self.middle()? - self.last()?)
    }
}

impl CandleIndicator for Bollinger {
    fn interval(&self) -> Interval {
        self.interval
    }

    fn update(&mut self, close: f64) {
        if !close.is_finite() {
            return;
        }
        if self.closes.len() == self.window {
            self.closes.pop_front();
        }
        self.closes.push_back(close);
    }

    /// Band half-width: k × stddev.
    fn last(&self) -> Option<f64> {
        self.std_dev().map(|sd| sd * self.k)
    }
}
