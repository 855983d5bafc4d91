//! Paper exchange.
//!
//! In-memory simulated exchange used for dry runs. Market orders fill
//! immediately at their limit price; stop and take-profit orders rest
//! untriggered until `update_prices` moves the mark across their trigger.
//! The oracle price doubles as the mark.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bracket_core::{
    MarketId, Order, OrderId, OrderSide, OrderSpec, OrderStatus, OrderType, PositionId, Price,
    ReferencePriceKind,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{BoxFuture, ExchangeGateway};
use crate::price_feed::MarketPrices;

#[derive(Debug, Clone)]
struct PaperOrder {
    order: Order,
    expires_at: DateTime<Utc>,
}

/// Simulated exchange for a single account.
#[derive(Debug)]
pub struct PaperGateway {
    position_id: PositionId,
    prices: Mutex<HashMap<MarketId, MarketPrices>>,
    orders: Mutex<HashMap<OrderId, PaperOrder>>,
    next_id: AtomicU64,
}

impl PaperGateway {
    pub fn new(position_id: PositionId) -> Self {
        Self {
            position_id,
            prices: Mutex::new(HashMap::new()),
            orders: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Publish new reference prices for `market` and settle resting orders.
    ///
    /// Returns the ids of orders that triggered and filled on this update.
    pub fn update_prices(&self, market: &MarketId, prices: MarketPrices) -> Vec<OrderId> {
        self.prices.lock().insert(market.clone(), prices);
        self.expire_orders(Utc::now());

        let mark = prices.oracle;
        let mut filled = Vec::new();
        let mut orders = self.orders.lock();

        for paper in orders.values_mut() {
            let order = &mut paper.order;
            if &order.market != market || order.status != OrderStatus::Untriggered {
                continue;
            }
            let Some(trigger) = order.trigger_price else {
                continue;
            };
            if is_triggered(order.order_type, order.side, trigger, mark) {
                order.status = OrderStatus::Filled;
                info!(
                    order_id = %order.id,
                    order_type = %order.order_type,
                    side = %order.side,
                    %trigger,
                    %mark,
                    fill_price = %order.price,
                    "Paper order triggered and filled"
                );
                filled.push(order.id.clone());
            }
        }

        filled
    }

    /// Cancel working orders whose expiry is at or before `now`.
    pub fn expire_orders(&self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for paper in self.orders.lock().values_mut() {
            if paper.order.status.is_working() && paper.expires_at <= now {
                paper.order.status = OrderStatus::Canceled;
                debug!(order_id = %paper.order.id, "Paper order expired");
                expired += 1;
            }
        }
        expired
    }

    /// Current state of an order.
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.lock().get(order_id).map(|p| p.order.clone())
    }

    /// Number of orders that can still fill.
    pub fn working_orders(&self) -> usize {
        self.orders
            .lock()
            .values()
            .filter(|p| p.order.status.is_working())
            .count()
    }

    fn accept(&self, spec: OrderSpec) -> GatewayResult<Order> {
        spec.validate()
            .map_err(|e| GatewayError::Rejected(e.to_string()))?;
        if spec.expires_at <= Utc::now() {
            return Err(GatewayError::Rejected(format!(
                "order expiry {} is in the past",
                spec.expires_at
            )));
        }

        let id = OrderId::new(format!("paper-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        let status = if spec.order_type.is_conditional() {
            OrderStatus::Untriggered
        } else {
            OrderStatus::Filled
        };
        let order = Order::from_spec(id, &spec, status);

        debug!(
            order_id = %order.id,
            order_type = %order.order_type,
            side = %order.side,
            price = %order.price,
            status = %order.status,
            "Paper order accepted"
        );

        self.orders.lock().insert(
            order.id.clone(),
            PaperOrder {
                order: order.clone(),
                expires_at: spec.expires_at,
            },
        );
        Ok(order)
    }

    fn cancel(&self, order_id: OrderId) -> GatewayResult<()> {
        let mut orders = self.orders.lock();
        let paper = orders
            .get_mut(&order_id)
            .ok_or_else(|| GatewayError::OrderNotFound(order_id.clone()))?;

        if paper.order.status.is_terminal() {
            return Err(GatewayError::OrderAlreadyClosed {
                order_id,
                status: paper.order.status.clone(),
            });
        }
        paper.order.status = OrderStatus::Canceled;
        debug!(order_id = %order_id, "Paper order canceled");
        Ok(())
    }
}

/// Whether a resting conditional order fires at `mark`.
fn is_triggered(order_type: OrderType, side: OrderSide, trigger: Price, mark: Price) -> bool {
    match (order_type, side) {
        // Stops fire when price moves against the position being closed.
        (OrderType::Stop, OrderSide::Sell) => mark <= trigger,
        (OrderType::Stop, OrderSide::Buy) => mark >= trigger,
        // Take-profits fire when price moves in its favour.
        (OrderType::TakeProfit, OrderSide::Sell) => mark >= trigger,
        (OrderType::TakeProfit, OrderSide::Buy) => mark <= trigger,
        (OrderType::Market, _) => false,
    }
}

impl ExchangeGateway for PaperGateway {
    fn position_id(&self) -> BoxFuture<'_, GatewayResult<PositionId>> {
        Box::pin(async move { Ok(self.position_id.clone()) })
    }

    fn reference_price(
        &self,
        market: MarketId,
        kind: ReferencePriceKind,
    ) -> BoxFuture<'_, GatewayResult<Price>> {
        Box::pin(async move {
            let prices = self
                .prices
                .lock()
                .get(&market)
                .copied()
                .ok_or_else(|| GatewayError::PriceUnavailable(format!("no prices for {market}")))?;
            Ok(prices.get(kind))
        })
    }

    fn submit_order(&self, spec: OrderSpec) -> BoxFuture<'_, GatewayResult<Order>> {
        Box::pin(async move { self.accept(spec) })
    }

    fn order_status(&self, order_id: OrderId) -> BoxFuture<'_, GatewayResult<Order>> {
        Box::pin(async move {
            self.order(&order_id)
                .ok_or(GatewayError::OrderNotFound(order_id))
        })
    }

    fn cancel_order(&self, order_id: OrderId) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move { self.cancel(order_id) })
    }
}
