//! Gateway error types.

use bracket_core::{OrderId, OrderStatus};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order {order_id} already closed ({status})")]
    OrderAlreadyClosed {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// A cancel hit an order that is already filled or canceled.
    ///
    /// Callers treat this as a successful cancel.
    #[must_use]
    pub fn is_already_closed(&self) -> bool {
        matches!(self, Self::OrderAlreadyClosed { .. })
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
