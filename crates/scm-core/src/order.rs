//! Order-related types and identifiers.
//!
//! `SubmitOrder` is the order intent produced by the strategy; `CreatedOrder`
//! is what the venue acknowledged. Fills and status changes come back as
//! `Trade` and `OrderUpdate`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Price, Size};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for position calculations).
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Buy => Decimal::ONE,
            Self::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Plain limit order.
    Limit,
    /// Maker-only limit order: rejected by the venue if it would cross the book.
    LimitMaker,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "limit"),
            Self::LimitMaker => write!(f, "limit_maker"),
        }
    }
}

/// Time-in-force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled.
    #[default]
    #[serde(rename = "GTC")]
    GoodTilCancelled,
    /// Immediate-or-cancel.
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoodTilCancelled => write!(f, "GTC"),
            Self::ImmediateOrCancel => write!(f, "IOC"),
        }
    }
}

/// Order book partition an order belongs to.
///
/// Liquidity and adjustment orders are cancelled independently, so the two
/// tick kinds never touch each other's orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Liquidity,
    Adjustment,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Liquidity => "liquidity",
            Self::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client order ID for idempotency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `scm_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("scm_{ts}_{uuid_short}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order intent handed to the order lifecycle collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrder {
    pub client_order_id: ClientOrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub price: Price,
    pub quantity: Size,
    pub partition: Partition,
    /// Ladder layer index, `None` for adjustment orders.
    pub layer: Option<u32>,
}

impl SubmitOrder {
    /// Maker-only, good-till-cancel limit order.
    pub fn maker(
        symbol: &str,
        side: OrderSide,
        price: Price,
        quantity: Size,
        partition: Partition,
        layer: Option<u32>,
    ) -> Self {
        Self {
            client_order_id: ClientOrderId::new(),
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::LimitMaker,
            time_in_force: TimeInForce::GoodTilCancelled,
            price,
            quantity,
            partition,
            layer,
        }
    }

    /// Quote-currency value of the order.
    pub fn notional(&self) -> Decimal {
        self.quantity.notional(self.price)
    }
}

/// Order acknowledged by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: u64,
    pub client_order_id: ClientOrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Size,
    pub partition: Partition,
    pub created_at: DateTime<Utc>,
}

impl CreatedOrder {
    pub fn from_submit(order_id: u64, order: &SubmitOrder) -> Self {
        Self {
            order_id,
            client_order_id: order.client_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            partition: order.partition,
            created_at: Utc::now(),
        }
    }
}

/// Order status reported by the user data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrderStatus {
    /// Whether the order can no longer trade.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected)
    }
}

/// Order status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: u64,
    pub symbol: String,
    pub status: OrderStatus,
    pub executed_quantity: Size,
}

/// A fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: u64,
    pub order_id: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Price,
    pub quantity: Size,
    /// Fee amount, denominated in `fee_currency`.
    pub fee: Decimal,
    pub fee_currency: String,
    pub is_maker: bool,
    pub time: DateTime<Utc>,
}
