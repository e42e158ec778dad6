//! Layered liquidity market maker for stablecoin pairs.
//!
//! Wires the pricing core to its collaborators:
//! - Closed candles drive the indicators and both tick schedules
//! - Fill events from the venue update the position between ticks
//! - Position and profit stats survive restarts through the state store

pub mod app;
pub mod config;
pub mod error;
pub mod feed;
pub mod strategy;

pub use app::Application;
pub use config::{AppConfig, PaperAccountConfig, PersistenceConfig};
pub use error::{AppError, AppResult};
pub use strategy::{Strategy, TickKind};
