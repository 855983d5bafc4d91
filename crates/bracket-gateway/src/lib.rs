//! Exchange gateway for the bracket order bot.
//!
//! The bracket builder and monitor only talk to the exchange through the
//! [`ExchangeGateway`] trait. This crate provides:
//!
//! - [`ExchangeGateway`]: order placement, status and cancellation contract
//! - [`GatewayError`]: failures, including the idempotent "already closed" cancel
//! - [`MockGateway`]: scripted gateway that records every call (tests)
//! - [`PaperGateway`]: in-memory simulated exchange with trigger evaluation
//! - [`HttpPriceFeed`]: public oracle/index prices over REST

pub mod error;
pub mod gateway;
pub mod mock;
pub mod paper;
pub mod price_feed;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{BoxFuture, ExchangeGateway};
pub use mock::{GatewayCall, MockGateway};
pub use paper::PaperGateway;
pub use price_feed::{HttpPriceFeed, MarketPrices};
