//! Application configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scm_core::{AccountBalances, Balance, Market};
use scm_mm::StrategyConfig;
use scm_position::FeeRates;

use crate::error::{AppError, AppResult};

/// Starting account and touch model of the paper venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperAccountConfig {
    #[serde(default = "default_paper_balance")]
    pub base_balance: Decimal,
    #[serde(default = "default_paper_balance")]
    pub quote_balance: Decimal,
    /// Distance from the candle close to the simulated best bid and ask.
    #[serde(default = "default_half_spread")]
    pub half_spread: Decimal,
}

fn default_paper_balance() -> Decimal {
    Decimal::from(10_000)
}

fn default_half_spread() -> Decimal {
    Decimal::new(1, 4)
}

impl Default for PaperAccountConfig {
    fn default() -> Self {
        Self {
            base_balance: default_paper_balance(),
            quote_balance: default_paper_balance(),
            half_spread: default_half_spread(),
        }
    }
}

impl PaperAccountConfig {
    pub fn initial_balances(&self, market: &Market) -> AccountBalances {
        [
            Balance::new(&market.base_currency, self.base_balance),
            Balance::new(&market.quote_currency, self.quote_balance),
        ]
        .into_iter()
        .collect()
    }

    pub fn venue_config(&self, fees: &FeeRates) -> scm_executor::PaperConfig {
        scm_executor::PaperConfig {
            half_spread: self.half_spread,
            maker_fee_rate: fees.maker_fee_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory of the position snapshot.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Directory of the daily trade journal files.
    #[serde(default = "default_journal_dir")]
    pub journal_dir: String,
    /// Trades buffered before the journal is flushed.
    #[serde(default = "default_journal_buffer_size")]
    pub journal_buffer_size: usize,
}

fn default_state_dir() -> String {
    "data/state".to_string()
}

fn default_journal_dir() -> String {
    "data/trades".to_string()
}

fn default_journal_buffer_size() -> usize {
    16
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            journal_dir: default_journal_dir(),
            journal_buffer_size: default_journal_buffer_size(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
    pub market: Market,
    #[serde(default)]
    pub fees: FeeRates,
    #[serde(default)]
    pub paper: PaperAccountConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl AppConfig {
    /// Load and validate a TOML configuration file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the strategy cannot start with, including a
    /// liquidity scale that cannot be solved.
    pub fn validate(&self) -> AppResult<()> {
        self.market.validate()?;
        self.strategy.validate()?;
        if self.market.symbol != self.strategy.symbol {
            return Err(AppError::Config(format!(
                "market symbol {} does not match strategy symbol {}",
                self.market.symbol, self.strategy.symbol
            )));
        }
        if self.fees.maker_fee_rate < Decimal::ZERO || self.fees.taker_fee_rate < Decimal::ZERO {
            return Err(AppError::Config("fee rates must not be negative".to_string()));
        }
        if self.paper.half_spread < Decimal::ZERO {
            return Err(AppError::Config("paper.half_spread must not be negative".to_string()));
        }
        self.strategy.solve_scale()?;
        Ok(())
    }

    /// Key of the persisted strategy state.
    pub fn instance_id(&self) -> String {
        format!("layered-liquidity:{}", self.strategy.symbol)
    }
}
