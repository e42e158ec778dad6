//! Position and profit bookkeeping.
//!
//! - `Position`: signed base quantity and average entry cost
//! - `ProfitStats`: accumulated realized profit, fees and volume
//! - `PositionTracker`: single owner of both, fed with trades between ticks

pub mod error;
pub mod position;
pub mod profit_stats;
pub mod tracker;

pub use error::{PositionError, PositionResult};
pub use position::{FeeRates, Position, TradeOutcome};
pub use profit_stats::ProfitStats;
pub use tracker::PositionTracker;
