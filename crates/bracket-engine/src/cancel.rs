//! Cancellation helpers.
//!
//! An exchange reports a cancel on an already filled or canceled order as an
//! error. For the bracket logic that is the desired end state, so it is
//! folded into `CancelOutcome::AlreadyClosed` and kept apart from genuine
//! failures.

use std::fmt;

use bracket_core::{OrderId, OrderStatus};
use bracket_gateway::{ExchangeGateway, GatewayError, GatewayResult};
use bracket_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Which order of a bracket an action refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketLeg {
    Entry,
    StopLoss,
    TakeProfit,
}

impl fmt::Display for BracketLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::StopLoss => write!(f, "stop_loss"),
            Self::TakeProfit => write!(f, "take_profit"),
        }
    }
}

/// Result of a single cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The exchange accepted the cancel.
    Canceled,
    /// The order was already terminal.
    AlreadyClosed(OrderStatus),
    /// The cancel failed; the order may still be live.
    Failed(String),
}

impl CancelOutcome {
    /// The order is known not to be working any more.
    pub fn is_closed(&self) -> bool {
        !self.is_failed()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    fn metric_label(&self) -> &'static str {
        match self {
            Self::Canceled => "canceled",
            Self::AlreadyClosed(_) => "already_closed",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for CancelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => write!(f, "canceled"),
            Self::AlreadyClosed(status) => write!(f, "already closed ({status})"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Cancel an order, treating "already closed" as success.
///
/// Any other gateway error is returned so the caller can retry on the next
/// poll.
pub async fn cancel_tolerant<G>(
    gateway: &G,
    order_id: &OrderId,
    leg: BracketLeg,
) -> GatewayResult<CancelOutcome>
where
    G: ExchangeGateway + ?Sized,
{
    let outcome = match gateway.cancel_order(order_id.clone()).await {
        Ok(()) => CancelOutcome::Canceled,
        Err(GatewayError::OrderAlreadyClosed { status, .. }) => CancelOutcome::AlreadyClosed(status),
        Err(err) => {
            Metrics::cancel_attempt("failed");
            warn!(%order_id, %leg, error = %err, "Cancel failed");
            return Err(err);
        }
    };

    Metrics::cancel_attempt(outcome.metric_label());
    info!(%order_id, %leg, outcome = %outcome, "Cancel issued");
    Ok(outcome)
}

/// Cancel an order without ever failing.
///
/// Used for cleanup sequences where every order must get its cancel
/// attempt regardless of what happened to the previous one.
pub async fn cancel_best_effort<G>(gateway: &G, order_id: &OrderId, leg: BracketLeg) -> CancelOutcome
where
    G: ExchangeGateway + ?Sized,
{
    match cancel_tolerant(gateway, order_id, leg).await {
        Ok(outcome) => outcome,
        Err(err) => {
            debug!(%order_id, %leg, "Continuing cleanup after failed cancel");
            CancelOutcome::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bracket_core::{ClientOrderId, MarketId, Order, OrderSide, OrderType, Price, Size};
    use bracket_gateway::MockGateway;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(id),
            client_id: Some(ClientOrderId::new()),
            market: MarketId::new("ETH-USD"),
            side: OrderSide::Sell,
            order_type: OrderType::Stop,
            size: Size::new(dec!(0.01)),
            price: Price::new(dec!(1980.0)),
            trigger_price: Some(Price::new(dec!(1980.0))),
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_tolerant_cancel_live_order() {
        let mock = MockGateway::new();
        mock.insert_order(order("sl", OrderStatus::Untriggered));

        let outcome = cancel_tolerant(&mock, &OrderId::new("sl"), BracketLeg::StopLoss)
            .await
            .unwrap();
        assert_eq!(outcome, CancelOutcome::Canceled);
        assert_eq!(mock.order(&OrderId::new("sl")).unwrap().status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn test_tolerant_cancel_already_closed() {
        let mock = MockGateway::new();
        mock.insert_order(order("tp", OrderStatus::Filled));

        let outcome = cancel_tolerant(&mock, &OrderId::new("tp"), BracketLeg::TakeProfit)
            .await
            .unwrap();
        assert_eq!(outcome, CancelOutcome::AlreadyClosed(OrderStatus::Filled));
        assert!(outcome.is_closed());
    }

    #[tokio::test]
    async fn test_tolerant_cancel_propagates_transport_error() {
        let mock = MockGateway::new();
        mock.insert_order(order("sl", OrderStatus::Untriggered));
        mock.fail_cancel(&OrderId::new("sl"), GatewayError::Transport("reset".into()));

        let result = cancel_tolerant(&mock, &OrderId::new("sl"), BracketLeg::StopLoss).await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    #[tokio::test]
    async fn test_best_effort_reports_failure() {
        let mock = MockGateway::new();
        mock.insert_order(order("sl", OrderStatus::Untriggered));
        mock.fail_cancel(&OrderId::new("sl"), GatewayError::Transport("reset".into()));

        let outcome = cancel_best_effort(&mock, &OrderId::new("sl"), BracketLeg::StopLoss).await;
        assert!(outcome.is_failed());
        assert!(!outcome.is_closed());
    }
}
