//! Strategy persistence.
//!
//! - `StateStore`: JSON snapshot of position and profit stats, one file per
//!   strategy instance, replaced atomically on every save.
//! - `TradeJournal`: append-only JSON Lines log of fills, rotated daily.

pub mod error;
pub mod journal;
pub mod state;

pub use error::{PersistenceError, PersistenceResult};
pub use journal::{TradeJournal, TradeRecord};
pub use state::{StateStore, StrategyState};
