//! Strategy configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use scm_core::{Interval, Price};

use crate::{MmError, MmResult, ScaleConfig, SolvedScale};

/// Candle interval and window length of a streaming indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalWindow {
    pub interval: Interval,
    pub window: usize,
}

/// Bollinger band used as the outer ladder anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerConfig {
    pub interval: Interval,
    pub window: usize,
    /// Band width multiplier on the standard deviation.
    #[serde(default = "default_band_k")]
    pub k: f64,
}

/// Layered liquidity strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub symbol: String,

    /// Outermost layer index N. Each side quotes N + 1 layers.
    #[serde(default = "default_num_of_liquidity_layers")]
    pub num_of_liquidity_layers: u32,

    /// Price distance between grid layers.
    #[serde(default = "default_liquidity_layer_tick_size")]
    pub liquidity_layer_tick_size: Decimal,

    /// Closed candles on this interval trigger a liquidity tick.
    #[serde(default = "default_liquidity_update_interval")]
    pub liquidity_update_interval: Interval,

    /// Closed candles on this interval trigger an adjustment tick.
    #[serde(default = "default_adjustment_update_interval")]
    pub adjustment_update_interval: Interval,

    #[serde(default = "default_mid_price_ema")]
    pub mid_price_ema: IntervalWindow,

    #[serde(default = "default_price_range_bollinger")]
    pub price_range_bollinger: BollingerConfig,

    /// Minimum margin over average cost for adjustment orders (0.0001 = 1bp).
    #[serde(default = "default_min_profit")]
    pub min_profit: Decimal,

    /// Cap on the balance committed per side, in quote currency. 0 = unlimited.
    #[serde(default)]
    pub max_exposure: Decimal,

    #[serde(default)]
    pub liquidity_scale: ScaleConfig,
}

fn default_num_of_liquidity_layers() -> u32 {
    10
}

fn default_liquidity_layer_tick_size() -> Decimal {
    dec!(0.0001)
}

fn default_liquidity_update_interval() -> Interval {
    Interval::OneHour
}

fn default_adjustment_update_interval() -> Interval {
    Interval::OneMinute
}

fn default_mid_price_ema() -> IntervalWindow {
    IntervalWindow {
        interval: Interval::OneHour,
        window: 99,
    }
}

fn default_price_range_bollinger() -> BollingerConfig {
    BollingerConfig {
        interval: Interval::OneHour,
        window: 10,
        k: default_band_k(),
    }
}

fn default_band_k() -> f64 {
    1.0
}

fn default_min_profit() -> Decimal {
    dec!(0.0001)
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbol: "USDCUSDT".to_string(),
            num_of_liquidity_layers: default_num_of_liquidity_layers(),
            liquidity_layer_tick_size: default_liquidity_layer_tick_size(),
            liquidity_update_interval: default_liquidity_update_interval(),
            adjustment_update_interval: default_adjustment_update_interval(),
            mid_price_ema: default_mid_price_ema(),
            price_range_bollinger: default_price_range_bollinger(),
            min_profit: default_min_profit(),
            max_exposure: Decimal::ZERO,
            liquidity_scale: ScaleConfig::default(),
        }
    }
}

impl StrategyConfig {
    pub fn layer_tick_size(&self) -> Price {
        Price::new(self.liquidity_layer_tick_size)
    }

    /// Exposure ceiling, `None` when unlimited.
    pub fn exposure_cap(&self) -> Option<Decimal> {
        (self.max_exposure > Decimal::ZERO).then_some(self.max_exposure)
    }

    pub fn validate(&self) -> MmResult<()> {
        if self.symbol.is_empty() {
            return Err(MmError::InvalidConfig("symbol is empty".to_string()));
        }
        if self.num_of_liquidity_layers == 0 {
            return Err(MmError::InvalidConfig(
                "num_of_liquidity_layers must be at least 1".to_string(),
            ));
        }
        if self.liquidity_layer_tick_size <= Decimal::ZERO {
            return Err(MmError::InvalidConfig(format!(
                "liquidity_layer_tick_size must be positive, got {}",
                self.liquidity_layer_tick_size
            )));
        }
        if self.mid_price_ema.window == 0 || self.price_range_bollinger.window == 0 {
            return Err(MmError::InvalidConfig(
                "indicator windows must be at least 1".to_string(),
            ));
        }
        if !self.price_range_bollinger.k.is_finite() || self.price_range_bollinger.k < 0.0 {
            return Err(MmError::InvalidConfig(format!(
                "price_range_bollinger.k must be a non-negative number, got {}",
                self.price_range_bollinger.k
            )));
        }
        if self.min_profit < Decimal::ZERO || self.max_exposure < Decimal::ZERO {
            return Err(MmError::InvalidConfig(
                "min_profit and max_exposure must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Solve the liquidity scale and check that the layer weights are usable.
    pub fn solve_scale(&self) -> MmResult<SolvedScale> {
        let scale = self.liquidity_scale.solve()?;
        let sum = scale.sum_over_layers(self.num_of_liquidity_layers);
        if !(sum.is_finite() && sum > 0.0) {
            return Err(MmError::ZeroWeightSum {
                layers: self.num_of_liquidity_layers,
                sum,
            });
        }
        Ok(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScaleBounds;

    #[test]
    fn test_default_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.num_of_liquidity_layers, 10);
        assert_eq!(config.liquidity_update_interval, Interval::OneHour);
        assert_eq!(config.adjustment_update_interval, Interval::OneMinute);
        assert_eq!(config.exposure_cap(), None);
        assert!(config.validate().is_ok());
        assert!(config.solve_scale().is_ok());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: StrategyConfig = toml::from_str(r#"symbol = "USDCUSDT""#).unwrap();
        assert_eq!(config, StrategyConfig::default());
    }

    #[test]
    fn test_full_config_parses() {
        let toml_str = r#"
symbol = "USDCUSDT"
num_of_liquidity_layers = 5
liquidity_layer_tick_size = "0.0002"
liquidity_update_interval = "1h"
adjustment_update_interval = "5m"
min_profit = "0.0005"
max_exposure = "10000"

[mid_price_ema]
interval = "1h"
window = 50

[price_range_bollinger]
interval = "4h"
window = 20
k = 2.0

[liquidity_scale.linear]
domain = [0, 5]
range = [1, 2]
"#;
        let config: StrategyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.num_of_liquidity_layers, 5);
        assert_eq!(config.liquidity_layer_tick_size, dec!(0.0002));
        assert_eq!(config.adjustment_update_interval, Interval::FiveMinutes);
        assert_eq!(config.price_range_bollinger.interval, Interval::FourHours);
        assert_eq!(config.exposure_cap(), Some(dec!(10000)));
        assert_eq!(
            config.liquidity_scale,
            ScaleConfig::Linear(ScaleBounds::new([0.0, 5.0], [1.0, 2.0]))
        );
    }

    #[test]
    fn test_validate_rejects_zero_layers() {
        let config = StrategyConfig {
            num_of_liquidity_layers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MmError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_weight_sum_rejected() {
        let config = StrategyConfig {
            liquidity_scale: ScaleConfig::Linear(ScaleBounds::new([0.0, 10.0], [0.0, 0.0])),
            ..Default::default()
        };
        assert!(matches!(
            config.solve_scale(),
            Err(MmError::ZeroWeightSum { layers: 10, .. })
        ));
    }

    #[test]
    fn test_unsolvable_scale_propagates() {
        let config = StrategyConfig {
            liquidity_scale: ScaleConfig::Exp(ScaleBounds::new([0.0, 0.0], [1.0, 2.0])),
            ..Default::default()
        };
        assert!(matches!(
            config.solve_scale(),
            Err(MmError::UnsolvableScale(_))
        ));
    }
}
