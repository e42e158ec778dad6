//! Market data and account snapshot types.
//!
//! Ticker, balances and candles are read fresh each tick and never cached
//! across ticks by the strategy.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CoreError, OrderUpdate, Price, Trade};

/// Best bid ("buy") and best ask ("sell").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    /// Best bid price.
    pub buy: Price,
    /// Best ask price.
    pub sell: Price,
}

impl Ticker {
    pub fn new(buy: Price, sell: Price) -> Self {
        Self { buy, sell }
    }

    /// Calculate spread: sell - buy.
    pub fn spread(&self) -> Price {
        self.sell - self.buy
    }

    /// Both sides positive and not crossed.
    pub fn is_valid(&self) -> bool {
        self.buy.is_positive() && self.sell.is_positive() && self.buy < self.sell
    }
}

/// Balance of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    pub currency: String,
    /// Free to use for new orders.
    pub available: Decimal,
    /// Held by open orders.
    pub locked: Decimal,
}

impl Balance {
    pub fn new(currency: &str, available: Decimal) -> Self {
        Self {
            currency: currency.to_string(),
            available,
            locked: Decimal::ZERO,
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: available={} locked={}",
            self.currency, self.available, self.locked
        )
    }
}

/// Account snapshot keyed by currency.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountBalances(HashMap<String, Balance>);

impl AccountBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, balance: Balance) {
        self.0.insert(balance.currency.clone(), balance);
    }

    pub fn get(&self, currency: &str) -> Option<&Balance> {
        self.0.get(currency)
    }

    pub fn get_mut(&mut self, currency: &str) -> Option<&mut Balance> {
        self.0.get_mut(currency)
    }

    /// Mutable balance of `currency`, created empty if missing.
    pub fn entry(&mut self, currency: &str) -> &mut Balance {
        self.0
            .entry(currency.to_string())
            .or_insert_with(|| Balance::new(currency, Decimal::ZERO))
    }

    /// Available amount, zero for unknown currencies.
    pub fn available(&self, currency: &str) -> Decimal {
        self.0
            .get(currency)
            .map(|b| b.available)
            .unwrap_or(Decimal::ZERO)
    }
}

impl FromIterator<Balance> for AccountBalances {
    fn from_iter<I: IntoIterator<Item = Balance>>(iter: I) -> Self {
        let mut balances = Self::new();
        for b in iter {
            balances.insert(b);
        }
        balances
    }
}

/// Candle interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::FourHours => "4h",
            Self::OneDay => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "30m" => Ok(Self::ThirtyMinutes),
            "1h" => Ok(Self::OneHour),
            "4h" => Ok(Self::FourHours),
            "1d" => Ok(Self::OneDay),
            other => Err(CoreError::InvalidInterval(other.to_string())),
        }
    }
}

/// A candle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KLine {
    pub symbol: String,
    pub interval: Interval,
    pub start_time: DateTime<Utc>,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    #[serde(default)]
    pub volume: Decimal,
    /// Only closed candles drive indicators and ticks.
    #[serde(default = "default_closed")]
    pub closed: bool,
}

fn default_closed() -> bool {
    true
}

/// Events from the account's user data stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    Trade(Trade),
    OrderUpdate(OrderUpdate),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ticker_spread() {
        let ticker = Ticker::new(Price::new(dec!(0.9998)), Price::new(dec!(1.0001)));
        assert_eq!(ticker.spread().inner(), dec!(0.0003));
        assert!(ticker.is_valid());
    }

    #[test]
    fn test_crossed_ticker_invalid() {
        let ticker = Ticker::new(Price::new(dec!(1.0001)), Price::new(dec!(1.0000)));
        assert!(!ticker.is_valid());
    }

    #[test]
    fn test_account_available_unknown_currency() {
        let balances: AccountBalances = [Balance::new("USDT", dec!(1000))].into_iter().collect();
        assert_eq!(balances.available("USDT"), dec!(1000));
        assert_eq!(balances.available("USDC"), Decimal::ZERO);
    }

    #[test]
    fn test_interval_roundtrip_str() {
        for s in ["1m", "5m", "15m", "30m", "1h", "4h", "1d"] {
            let interval: Interval = s.parse().unwrap();
            assert_eq!(interval.as_str(), s);
        }
        assert!("2w".parse::<Interval>().is_err());
    }

    #[test]
    fn test_kline_deserialize_defaults_closed() {
        let json = r#"{
            "symbol": "USDCUSDT",
            "interval": "1m",
            "start_time": "2024-01-01T00:00:00Z",
            "open": "1.0000",
            "high": "1.0002",
            "low": "0.9998",
            "close": "1.0001"
        }"#;
        let k: KLine = serde_json::from_str(json).unwrap();
        assert!(k.closed);
        assert_eq!(k.interval, Interval::OneMinute);
        assert_eq!(k.close.inner(), dec!(1.0001));
    }
}
