//! Order-related types and identifiers.
//!
//! `OrderSpec` is what we send; `Order` is what the exchange reports back,
//! either from submission or from a status query.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::market::{MarketId, PositionId};
use crate::{Price, Size};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
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
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Market order with a worst-acceptable limit price.
    Market,
    /// Stop-limit: rests until the trigger price is crossed against the position.
    Stop,
    /// Take-profit limit: rests until the trigger price is crossed in favour.
    TakeProfit,
}

impl OrderType {
    /// Whether this type rests untriggered and needs a trigger price.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::Stop | Self::TakeProfit)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Stop => write!(f, "STOP"),
            Self::TakeProfit => write!(f, "TAKE_PROFIT"),
        }
    }
}

/// Time-in-force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good until the order's expiry timestamp. Used for exit orders.
    #[default]
    #[serde(rename = "GTT")]
    GoodTilTime,
    /// Fill what is possible immediately, cancel the rest. Long entries.
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    /// Fill completely or not at all. Short entries.
    #[serde(rename = "FOK")]
    FillOrKill,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoodTilTime => write!(f, "GTT"),
            Self::ImmediateOrCancel => write!(f, "IOC"),
            Self::FillOrKill => write!(f, "FOK"),
        }
    }
}

/// Exchange-reported order status.
///
/// Statuses the bot does not reason about are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Open,
    Untriggered,
    Filled,
    Canceled,
    Other(String),
}

impl OrderStatus {
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Whether the order can still fill or be canceled.
    pub fn is_working(&self) -> bool {
        matches!(self, Self::Pending | Self::Open | Self::Untriggered)
    }

    /// Whether the order has reached a final state.
    pub fn is_terminal(&self) -> bool {
        !self.is_working()
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "OPEN" => Self::Open,
            "UNTRIGGERED" => Self::Untriggered,
            "FILLED" => Self::Filled,
            "CANCELED" | "CANCELLED" => Self::Canceled,
            _ => Self::Other(s),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Open => write!(f, "OPEN"),
            Self::Untriggered => write!(f, "UNTRIGGERED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Exchange-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Client order ID for idempotency.
///
/// Every submission carries a fresh cloid so a duplicate post can be
/// recognised by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `brk_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("brk_{ts}_{uuid_short}"))
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

/// Order to be submitted to the exchange.
///
/// Built once by the bracket builder and consumed by `submit_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub client_id: ClientOrderId,
    pub position_id: PositionId,
    pub market: MarketId,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub size: Size,
    /// Limit price (worst acceptable price for market orders).
    pub limit_price: Price,
    /// Trigger price, only for `Stop` and `TakeProfit`.
    pub trigger_price: Option<Price>,
    pub time_in_force: TimeInForce,
    pub post_only: bool,
    pub reduce_only: bool,
    pub expires_at: DateTime<Utc>,
    /// Maximum fee rate the order may pay.
    pub fee_rate: Decimal,
}

impl OrderSpec {
    /// Check internal consistency before the order leaves the process.
    pub fn validate(&self) -> Result<()> {
        if !self.size.is_positive() {
            return Err(CoreError::InvalidSize(format!(
                "order size must be positive, got {}",
                self.size
            )));
        }
        if !self.limit_price.is_positive() {
            return Err(CoreError::InvalidPrice(format!(
                "{} limit price must be positive, got {}",
                self.order_type, self.limit_price
            )));
        }
        match (self.order_type.is_conditional(), self.trigger_price) {
            (true, Some(trigger)) if trigger.is_positive() => Ok(()),
            (true, _) => Err(CoreError::InvalidPrice(format!(
                "{} order requires a positive trigger price",
                self.order_type
            ))),
            (false, Some(_)) => Err(CoreError::InvalidPrice(format!(
                "{} order must not carry a trigger price",
                self.order_type
            ))),
            (false, None) => Ok(()),
        }
    }
}

/// Exchange view of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_id: Option<ClientOrderId>,
    pub market: MarketId,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub size: Size,
    /// Price reported by the exchange. For a filled market order this is
    /// the realized fill price.
    pub price: Price,
    pub trigger_price: Option<Price>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build the exchange view of a freshly accepted spec.
    pub fn from_spec(id: OrderId, spec: &OrderSpec, status: OrderStatus) -> Self {
        Self {
            id,
            client_id: Some(spec.client_id.clone()),
            market: spec.market.clone(),
            side: spec.side,
            order_type: spec.order_type,
            size: spec.size,
            price: spec.limit_price,
            trigger_price: spec.trigger_price,
            status,
            created_at: Utc::now(),
        }
    }
}
