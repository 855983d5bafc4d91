//! Core domain types for the bracket order bot.
//!
//! This crate provides fundamental types used throughout the trading system:
//! - `Price`, `Size`: Precision-safe numeric types with tick rounding
//! - `MarketId`, `PositionId`, `OrderId`: Exchange identifiers
//! - `OrderSide`, `OrderType`, `TimeInForce`, `OrderStatus`: Trading enums
//! - `OrderSpec`, `Order`: Order submission and exchange view
//! - `Direction`, `BracketRequest`, `Bracket`: Bracket trade records

pub mod bracket;
pub mod decimal;
pub mod error;
pub mod market;
pub mod order;

pub use bracket::{Bracket, BracketRequest, Direction};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market::{MarketId, PositionId, ReferencePriceKind};
pub use order::{
    ClientOrderId, Order, OrderId, OrderSide, OrderSpec, OrderStatus, OrderType, TimeInForce,
};
