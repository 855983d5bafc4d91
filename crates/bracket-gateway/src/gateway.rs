//! Exchange gateway trait.
//!
//! Abstracts the authenticated exchange client so the bracket logic can be
//! driven by a real connector, the paper exchange, or a test double.

use std::pin::Pin;

use bracket_core::{MarketId, Order, OrderId, OrderSpec, PositionId, Price, ReferencePriceKind};

use crate::error::GatewayResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Order placement and query primitives required from an exchange.
///
/// Every call is a single request/response. Implementations do not retry;
/// a failed call surfaces as a `GatewayError` and the caller decides
/// whether to poll again later.
pub trait ExchangeGateway: Send + Sync {
    /// Position identifier orders are booked against.
    fn position_id(&self) -> BoxFuture<'_, GatewayResult<PositionId>>;

    /// Current oracle or index price for `market`.
    fn reference_price(
        &self,
        market: MarketId,
        kind: ReferencePriceKind,
    ) -> BoxFuture<'_, GatewayResult<Price>>;

    /// Submit an order. The returned `Order` carries the exchange id and,
    /// for immediately filled market orders, the realized price.
    fn submit_order(&self, spec: OrderSpec) -> BoxFuture<'_, GatewayResult<Order>>;

    /// Fetch the current state of an order.
    fn order_status(&self, order_id: OrderId) -> BoxFuture<'_, GatewayResult<Order>>;

    /// Cancel an order.
    ///
    /// Returns `GatewayError::OrderAlreadyClosed` when the order is already
    /// filled or canceled.
    fn cancel_order(&self, order_id: OrderId) -> BoxFuture<'_, GatewayResult<()>>;
}
