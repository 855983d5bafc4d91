//! Scripted gateway for tests.
//!
//! Holds orders in memory, lets tests set statuses and inject failures per
//! call, and records every call in order so tests can assert exactly which
//! requests the bracket logic issued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use bracket_core::{
    MarketId, Order, OrderId, OrderSpec, OrderStatus, PositionId, Price, ReferencePriceKind,
};
use parking_lot::Mutex;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{BoxFuture, ExchangeGateway};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    PositionId,
    ReferencePrice {
        market: MarketId,
        kind: ReferencePriceKind,
    },
    SubmitOrder(Box<OrderSpec>),
    OrderStatus(OrderId),
    CancelOrder(OrderId),
}

/// Mock gateway for testing.
#[derive(Debug)]
pub struct MockGateway {
    position_id: PositionId,
    prices: Mutex<HashMap<ReferencePriceKind, Price>>,
    orders: Mutex<HashMap<OrderId, Order>>,
    calls: Mutex<Vec<GatewayCall>>,
    next_id: AtomicU64,
    submissions: AtomicUsize,
    /// Price reported for market orders instead of their limit price.
    market_fill_price: Mutex<Option<Price>>,
    market_fill_status: Mutex<OrderStatus>,
    submit_failures: Mutex<HashMap<usize, GatewayError>>,
    status_failures: Mutex<HashMap<OrderId, GatewayError>>,
    cancel_failures: Mutex<HashMap<OrderId, GatewayError>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Create a mock with position id "1", no prices and no orders.
    pub fn new() -> Self {
        Self {
            position_id: PositionId::new("1"),
            prices: Mutex::new(HashMap::new()),
            orders: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            submissions: AtomicUsize::new(0),
            market_fill_price: Mutex::new(None),
            market_fill_status: Mutex::new(OrderStatus::Filled),
            submit_failures: Mutex::new(HashMap::new()),
            status_failures: Mutex::new(HashMap::new()),
            cancel_failures: Mutex::new(HashMap::new()),
        }
    }

    /// Set a reference price (builder style).
    pub fn with_price(self, kind: ReferencePriceKind, price: Price) -> Self {
        self.set_reference_price(kind, price);
        self
    }

    pub fn set_reference_price(&self, kind: ReferencePriceKind, price: Price) {
        self.prices.lock().insert(kind, price);
    }

    /// Report market orders as filled at `price` rather than their limit.
    pub fn set_market_fill_price(&self, price: Price) {
        *self.market_fill_price.lock() = Some(price);
    }

    /// Status assigned to market orders on submission. Default: Filled.
    pub fn set_market_fill_status(&self, status: OrderStatus) {
        *self.market_fill_status.lock() = status;
    }

    /// Fail the `index`-th submission (0-based) with `error`.
    pub fn fail_submission(&self, index: usize, error: GatewayError) {
        self.submit_failures.lock().insert(index, error);
    }

    /// Fail every status query for `order_id`.
    pub fn fail_status(&self, order_id: &OrderId, error: GatewayError) {
        self.status_failures.lock().insert(order_id.clone(), error);
    }

    /// Fail every cancel for `order_id`.
    pub fn fail_cancel(&self, order_id: &OrderId, error: GatewayError) {
        self.cancel_failures.lock().insert(order_id.clone(), error);
    }

    /// Register an order as if it had been submitted earlier.
    pub fn insert_order(&self, order: Order) {
        self.orders.lock().insert(order.id.clone(), order);
    }

    /// Change the status of a known order.
    pub fn set_status(&self, order_id: &OrderId, status: OrderStatus) {
        if let Some(order) = self.orders.lock().get_mut(order_id) {
            order.status = status;
        }
    }

    /// Current state of an order, without recording a call.
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.lock().get(order_id).cloned()
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    /// Specs passed to `submit_order`, including failed submissions.
    pub fn submitted_specs(&self) -> Vec<OrderSpec> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::SubmitOrder(spec) => Some(spec.as_ref().clone()),
                _ => None,
            })
            .collect()
    }

    /// Order ids passed to `order_status`.
    pub fn status_queries(&self) -> Vec<OrderId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::OrderStatus(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Order ids passed to `cancel_order`.
    pub fn cancel_requests(&self) -> Vec<OrderId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::CancelOrder(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }

    fn do_submit(&self, spec: OrderSpec) -> GatewayResult<Order> {
        let index = self.submissions.fetch_add(1, Ordering::SeqCst);
        self.record(GatewayCall::SubmitOrder(Box::new(spec.clone())));

        if let Some(err) = self.submit_failures.lock().remove(&index) {
            return Err(err);
        }

        let id = OrderId::new(format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        let order = if spec.order_type.is_conditional() {
            Order::from_spec(id, &spec, OrderStatus::Untriggered)
        } else {
            let mut order = Order::from_spec(id, &spec, self.market_fill_status.lock().clone());
            if let Some(fill) = *self.market_fill_price.lock() {
                order.price = fill;
            }
            order
        };

        self.orders.lock().insert(order.id.clone(), order.clone());
        Ok(order)
    }

    fn do_cancel(&self, order_id: OrderId) -> GatewayResult<()> {
        self.record(GatewayCall::CancelOrder(order_id.clone()));

        if let Some(err) = self.cancel_failures.lock().get(&order_id) {
            return Err(err.clone());
        }

        let mut orders = self.orders.lock();
        let order = orders
            .get_mut(&order_id)
            .ok_or_else(|| GatewayError::OrderNotFound(order_id.clone()))?;
        if order.status.is_terminal() {
            return Err(GatewayError::OrderAlreadyClosed {
                order_id,
                status: order.status.clone(),
            });
        }
        order.status = OrderStatus::Canceled;
        Ok(())
    }
}

impl ExchangeGateway for MockGateway {
    fn position_id(&self) -> BoxFuture<'_, GatewayResult<PositionId>> {
        Box::pin(async move {
            self.record(GatewayCall::PositionId);
            Ok(self.position_id.clone())
        })
    }

    fn reference_price(
        &self,
        market: MarketId,
        kind: ReferencePriceKind,
    ) -> BoxFuture<'_, GatewayResult<Price>> {
        Box::pin(async move {
            self.record(GatewayCall::ReferencePrice {
                market: market.clone(),
                kind,
            });
            self.prices
                .lock()
                .get(&kind)
                .copied()
                .ok_or_else(|| GatewayError::PriceUnavailable(format!("{kind} price for {market}")))
        })
    }

    fn submit_order(&self, spec: OrderSpec) -> BoxFuture<'_, GatewayResult<Order>> {
        Box::pin(async move { self.do_submit(spec) })
    }

    fn order_status(&self, order_id: OrderId) -> BoxFuture<'_, GatewayResult<Order>> {
        Box::pin(async move {
            self.record(GatewayCall::OrderStatus(order_id.clone()));
            if let Some(err) = self.status_failures.lock().get(&order_id) {
                return Err(err.clone());
            }
            self.orders
                .lock()
                .get(&order_id)
                .cloned()
                .ok_or(GatewayError::OrderNotFound(order_id))
        })
    }

    fn cancel_order(&self, order_id: OrderId) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move { self.do_cancel(order_id) })
    }
}
