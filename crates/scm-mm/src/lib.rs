//! Pricing and allocation core of the stablecoin market maker.
//!
//! # Architecture
//!
//! ```text
//! liquidity tick:
//!   Ticker + mid EMA + band width → PriceLadder (N+1 bids, N+1 asks)
//!   SolvedScale weights + balances + Position → LiquidityAllocator
//!        └─ QuotaLedger: first layers claim balance first
//!   → maker-only GTC intents per layer and side
//!
//! adjustment tick:
//!   Position + Ticker + fees → InventoryAdjuster → at most one intent
//! ```

pub mod adjuster;
pub mod allocator;
pub mod config;
pub mod error;
pub mod ladder;
pub mod quota;
pub mod scale;

pub use adjuster::{profit_protected_price, AdjustmentInput, InventoryAdjuster};
pub use allocator::{AllocationInput, AllocationPlan, LayerSkip, LiquidityAllocator, SkipReason};
pub use config::{BollingerConfig, IntervalWindow, StrategyConfig};
pub use error::{MmError, MmResult};
pub use ladder::{LadderParams, PriceLadder};
pub use quota::{Quota, QuotaLedger};
pub use scale::{ScaleBounds, ScaleConfig, SolvedScale};
