//! Bracket lifecycle monitor.
//!
//! Each poll reads the entry status, then the exits, and decides which phase
//! the bracket is in. Terminal phases cancel whatever order is now orphaned.
//!
//! ```text
//! entry Pending ──▶ EntryPending (keep polling)
//! entry Filled ──┬─ stop-loss Filled ──▶ cancel take-profit ──▶ StopLossHit
//!                ├─ take-profit Filled ──▶ cancel stop-loss ──▶ TakeProfitHit
//!                ├─ an exit Canceled ──▶ cleanup all ──▶ ExitCanceled
//!                └─ otherwise ──▶ AwaitingTargets (keep polling)
//! entry other ──▶ cancel stop-loss, take-profit ──▶ EntryNotFilled
//! ```
//!
//! The stop-loss is always read before the take-profit. Exit statuses the
//! bot does not recognise are treated as still working.

use std::fmt;

use bracket_core::{Bracket, OrderStatus};
use bracket_gateway::ExchangeGateway;
use bracket_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::cancel::{cancel_best_effort, cancel_tolerant, BracketLeg, CancelOutcome};
use crate::error::EngineResult;

/// Per-order results of the cleanup sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub stop_loss: CancelOutcome,
    pub take_profit: CancelOutcome,
    pub entry: CancelOutcome,
}

impl CleanupReport {
    /// Whether any cancel failed, leaving an order possibly live.
    pub fn has_failures(&self) -> bool {
        self.stop_loss.is_failed() || self.take_profit.is_failed() || self.entry.is_failed()
    }
}

/// Phase reported by a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BracketPhase {
    /// No bracket to follow.
    NoOrders,
    /// Entry still pending on the exchange.
    EntryPending,
    /// Entry filled, both exits working.
    AwaitingTargets,
    /// Stop-loss filled; take-profit canceled.
    StopLossHit,
    /// Take-profit filled; stop-loss canceled.
    TakeProfitHit,
    /// An exit was canceled; every order was sent a cancel.
    ExitCanceled { cleanup: CleanupReport },
    /// Entry ended without a fill; both exits canceled.
    EntryNotFilled { entry_status: OrderStatus },
}

impl BracketPhase {
    /// Whether the bracket should be polled again.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::EntryPending | Self::AwaitingTargets)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoOrders => "no_orders",
            Self::EntryPending => "entry_pending",
            Self::AwaitingTargets => "awaiting_targets",
            Self::StopLossHit => "stop_loss",
            Self::TakeProfitHit => "take_profit",
            Self::ExitCanceled { .. } => "exit_canceled",
            Self::EntryNotFilled { .. } => "entry_not_filled",
        }
    }
}

impl fmt::Display for BracketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stateful poller for one bracket at a time.
///
/// Keeps the last phase so transitions are logged once rather than on
/// every poll.
#[derive(Debug, Default)]
pub struct BracketMonitor {
    polls: u64,
    last_phase: Option<BracketPhase>,
}

impl BracketMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of polls since creation or the last `reset`.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn last_phase(&self) -> Option<&BracketPhase> {
        self.last_phase.as_ref()
    }

    /// Forget the previous bracket before following a new one.
    pub fn reset(&mut self) {
        self.polls = 0;
        self.last_phase = None;
    }

    /// Poll the bracket once.
    ///
    /// # Errors
    /// Status query failures, and cancel failures other than "already
    /// closed" outside the cleanup sequence. The bracket is unchanged on
    /// error, so polling again retries.
    pub async fn poll<G>(
        &mut self,
        gateway: &G,
        bracket: Option<&Bracket>,
    ) -> EngineResult<BracketPhase>
    where
        G: ExchangeGateway + ?Sized,
    {
        let phase = match bracket {
            Some(bracket) => evaluate(gateway, bracket).await?,
            None => BracketPhase::NoOrders,
        };

        self.polls += 1;
        Metrics::bracket_polled(phase.label());

        if self.last_phase.as_ref() != Some(&phase) {
            info!(
                phase = %phase,
                previous = ?self.last_phase.as_ref().map(BracketPhase::label),
                polls = self.polls,
                "Bracket phase changed"
            );
            if !phase.is_live() && phase != BracketPhase::NoOrders {
                Metrics::bracket_resolved(phase.label());
            }
        } else {
            debug!(phase = %phase, polls = self.polls, "Bracket unchanged");
        }

        self.last_phase = Some(phase.clone());
        Ok(phase)
    }
}

/// Poll once with a throwaway monitor. Returns true while the bracket is live.
pub async fn poll_bracket<G>(gateway: &G, bracket: Option<&Bracket>) -> EngineResult<bool>
where
    G: ExchangeGateway + ?Sized,
{
    let phase = BracketMonitor::new().poll(gateway, bracket).await?;
    Ok(phase.is_live())
}

async fn evaluate<G>(gateway: &G, bracket: &Bracket) -> EngineResult<BracketPhase>
where
    G: ExchangeGateway + ?Sized,
{
    let entry = gateway.order_status(bracket.entry.id.clone()).await?;

    match entry.status {
        OrderStatus::Pending => Ok(BracketPhase::EntryPending),
        OrderStatus::Filled => evaluate_exits(gateway, bracket).await,
        entry_status => {
            info!(
                entry_id = %entry.id,
                status = %entry_status,
                "Entry ended unfilled, canceling exits"
            );
            cancel_tolerant(gateway, &bracket.stop_loss.id, BracketLeg::StopLoss).await?;
            cancel_tolerant(gateway, &bracket.take_profit.id, BracketLeg::TakeProfit).await?;
            Ok(BracketPhase::EntryNotFilled { entry_status })
        }
    }
}

async fn evaluate_exits<G>(gateway: &G, bracket: &Bracket) -> EngineResult<BracketPhase>
where
    G: ExchangeGateway + ?Sized,
{
    let stop_loss = gateway.order_status(bracket.stop_loss.id.clone()).await?;
    if stop_loss.status.is_filled() {
        info!(order_id = %stop_loss.id, price = %stop_loss.price, "Stop-loss filled");
        cancel_tolerant(gateway, &bracket.take_profit.id, BracketLeg::TakeProfit).await?;
        return Ok(BracketPhase::StopLossHit);
    }

    let take_profit = gateway.order_status(bracket.take_profit.id.clone()).await?;
    if take_profit.status.is_filled() {
        info!(order_id = %take_profit.id, price = %take_profit.price, "Take-profit filled");
        cancel_tolerant(gateway, &bracket.stop_loss.id, BracketLeg::StopLoss).await?;
        return Ok(BracketPhase::TakeProfitHit);
    }

    if stop_loss.status.is_canceled() || take_profit.status.is_canceled() {
        warn!(
            stop_loss_status = %stop_loss.status,
            take_profit_status = %take_profit.status,
            "Exit canceled without a fill, cleaning up bracket"
        );
        let cleanup = cleanup(gateway, bracket).await;
        if cleanup.has_failures() {
            warn!(?cleanup, "Cleanup left orders that may still be live");
        }
        return Ok(BracketPhase::ExitCanceled { cleanup });
    }

    Ok(BracketPhase::AwaitingTargets)
}

async fn cleanup<G>(gateway: &G, bracket: &Bracket) -> CleanupReport
where
    G: ExchangeGateway + ?Sized,
{
    let stop_loss = cancel_best_effort(gateway, &bracket.stop_loss.id, BracketLeg::StopLoss).await;
    let take_profit =
        cancel_best_effort(gateway, &bracket.take_profit.id, BracketLeg::TakeProfit).await;
    let entry = cancel_best_effort(gateway, &bracket.entry.id, BracketLeg::Entry).await;
    CleanupReport {
        stop_loss,
        take_profit,
        entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bracket_core::{
        ClientOrderId, Direction, MarketId, Order, OrderId, OrderSide, OrderType, Price, Size,
    };
    use bracket_gateway::{GatewayCall, GatewayError, MockGateway};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(id: &str, order_type: OrderType, side: OrderSide, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(id),
            client_id: Some(ClientOrderId::new()),
            market: MarketId::new("ETH-USD"),
            side,
            order_type,
            size: Size::new(dec!(0.01)),
            price: Price::new(dec!(1998.0)),
            trigger_price: None,
            status,
            created_at: Utc::now(),
        }
    }

    /// Short bracket registered in the mock with the given statuses.
    fn setup(entry: OrderStatus, stop_loss: OrderStatus, take_profit: OrderStatus) -> (MockGateway, Bracket) {
        let mock = MockGateway::new();
        let bracket = Bracket {
            direction: Direction::Short,
            market: MarketId::new("ETH-USD"),
            entry: order("entry", OrderType::Market, OrderSide::Sell, entry),
            stop_loss: order("sl", OrderType::Stop, OrderSide::Buy, stop_loss),
            take_profit: order("tp", OrderType::TakeProfit, OrderSide::Buy, take_profit),
            opened_at: Utc::now(),
        };
        mock.insert_order(bracket.entry.clone());
        mock.insert_order(bracket.stop_loss.clone());
        mock.insert_order(bracket.take_profit.clone());
        (mock, bracket)
    }

    fn id(s: &str) -> OrderId {
        OrderId::new(s)
    }

    #[tokio::test]
    async fn test_no_bracket_makes_no_calls() {
        let mock = MockGateway::new();
        assert!(!poll_bracket(&mock, None).await.unwrap());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_entry_pending_skips_exit_queries() {
        let (mock, bracket) =
            setup(OrderStatus::Pending, OrderStatus::Untriggered, OrderStatus::Untriggered);

        assert!(poll_bracket(&mock, Some(&bracket)).await.unwrap());
        assert_eq!(mock.calls(), vec![GatewayCall::OrderStatus(id("entry"))]);
    }

    #[tokio::test]
    async fn test_stop_loss_filled_cancels_take_profit_only() {
        let (mock, bracket) =
            setup(OrderStatus::Filled, OrderStatus::Filled, OrderStatus::Untriggered);

        assert!(!poll_bracket(&mock, Some(&bracket)).await.unwrap());
        assert_eq!(
            mock.calls(),
            vec![
                GatewayCall::OrderStatus(id("entry")),
                GatewayCall::OrderStatus(id("sl")),
                GatewayCall::CancelOrder(id("tp")),
            ]
        );
        assert_eq!(mock.order(&id("tp")).unwrap().status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn test_take_profit_filled_cancels_stop_loss_only() {
        let (mock, bracket) =
            setup(OrderStatus::Filled, OrderStatus::Untriggered, OrderStatus::Filled);

        assert!(!poll_bracket(&mock, Some(&bracket)).await.unwrap());
        assert_eq!(mock.cancel_requests(), vec![id("sl")]);
        assert_eq!(mock.status_queries(), vec![id("entry"), id("sl"), id("tp")]);
    }

    #[tokio::test]
    async fn test_entry_canceled_cancels_both_exits() {
        let (mock, bracket) =
            setup(OrderStatus::Canceled, OrderStatus::Untriggered, OrderStatus::Untriggered);

        let phase = BracketMonitor::new().poll(&mock, Some(&bracket)).await.unwrap();
        assert_eq!(
            phase,
            BracketPhase::EntryNotFilled {
                entry_status: OrderStatus::Canceled
            }
        );
        assert_eq!(mock.cancel_requests(), vec![id("sl"), id("tp")]);
        assert_eq!(mock.status_queries(), vec![id("entry")]);
    }

    #[tokio::test]
    async fn test_entry_unknown_terminal_status_is_not_filled() {
        let (mock, bracket) = setup(
            OrderStatus::Other("EXPIRED".into()),
            OrderStatus::Untriggered,
            OrderStatus::Untriggered,
        );

        assert!(!poll_bracket(&mock, Some(&bracket)).await.unwrap());
        assert_eq!(mock.cancel_requests(), vec![id("sl"), id("tp")]);
    }

    #[tokio::test]
    async fn test_open_entry_is_not_filled() {
        let (mock, bracket) =
            setup(OrderStatus::Open, OrderStatus::Untriggered, OrderStatus::Untriggered);

        let phase = BracketMonitor::new().poll(&mock, Some(&bracket)).await.unwrap();
        assert_eq!(
            phase,
            BracketPhase::EntryNotFilled {
                entry_status: OrderStatus::Open
            }
        );
        assert!(!phase.is_live());
        assert_eq!(mock.cancel_requests(), vec![id("sl"), id("tp")]);
    }

    #[tokio::test]
    async fn test_unknown_exit_status_keeps_protection() {
        let (mock, bracket) = setup(
            OrderStatus::Filled,
            OrderStatus::Untriggered,
            OrderStatus::Other("BEST_EFFORT_OPENED".into()),
        );

        assert!(poll_bracket(&mock, Some(&bracket)).await.unwrap());
        assert!(mock.cancel_requests().is_empty());
        assert_eq!(mock.order(&id("sl")).unwrap().status, OrderStatus::Untriggered);

        let phase = BracketMonitor::new().poll(&mock, Some(&bracket)).await.unwrap();
        assert_eq!(phase, BracketPhase::AwaitingTargets);
    }

    #[tokio::test]
    async fn test_both_exits_working_keeps_polling() {
        let (mock, bracket) =
            setup(OrderStatus::Filled, OrderStatus::Untriggered, OrderStatus::Untriggered);

        let phase = BracketMonitor::new().poll(&mock, Some(&bracket)).await.unwrap();
        assert_eq!(phase, BracketPhase::AwaitingTargets);
        assert!(mock.cancel_requests().is_empty());
    }

    #[tokio::test]
    async fn test_canceled_exit_cleans_up_everything() {
        let (mock, bracket) =
            setup(OrderStatus::Filled, OrderStatus::Canceled, OrderStatus::Untriggered);

        let phase = BracketMonitor::new().poll(&mock, Some(&bracket)).await.unwrap();
        let BracketPhase::ExitCanceled { cleanup } = phase else {
            panic!("expected ExitCanceled, got {phase:?}");
        };

        assert_eq!(mock.cancel_requests(), vec![id("sl"), id("tp"), id("entry")]);
        assert_eq!(cleanup.stop_loss, CancelOutcome::AlreadyClosed(OrderStatus::Canceled));
        assert_eq!(cleanup.take_profit, CancelOutcome::Canceled);
        assert_eq!(cleanup.entry, CancelOutcome::AlreadyClosed(OrderStatus::Filled));
        assert!(!cleanup.has_failures());
    }

    #[tokio::test]
    async fn test_cleanup_continues_after_failed_cancel() {
        let (mock, bracket) =
            setup(OrderStatus::Filled, OrderStatus::Untriggered, OrderStatus::Canceled);
        mock.fail_cancel(&id("sl"), GatewayError::Transport("reset".into()));

        let phase = BracketMonitor::new().poll(&mock, Some(&bracket)).await.unwrap();
        let BracketPhase::ExitCanceled { cleanup } = phase else {
            panic!("expected ExitCanceled, got {phase:?}");
        };

        assert_eq!(mock.cancel_requests(), vec![id("sl"), id("tp"), id("entry")]);
        assert!(cleanup.stop_loss.is_failed());
        assert!(cleanup.has_failures());
    }

    #[tokio::test]
    async fn test_status_failure_propagates() {
        let (mock, bracket) =
            setup(OrderStatus::Filled, OrderStatus::Untriggered, OrderStatus::Untriggered);
        mock.fail_status(&id("sl"), GatewayError::Api {
            status: 503,
            message: "unavailable".into(),
        });

        let result = poll_bracket(&mock, Some(&bracket)).await;
        assert!(result.is_err());
        assert!(mock.cancel_requests().is_empty());
    }

    #[tokio::test]
    async fn test_sibling_cancel_tolerates_already_closed() {
        let (mock, bracket) =
            setup(OrderStatus::Filled, OrderStatus::Filled, OrderStatus::Canceled);

        let phase = BracketMonitor::new().poll(&mock, Some(&bracket)).await.unwrap();
        assert_eq!(phase, BracketPhase::StopLossHit);
    }

    #[tokio::test]
    async fn test_sibling_cancel_failure_propagates_and_retries() {
        let (mock, bracket) =
            setup(OrderStatus::Filled, OrderStatus::Filled, OrderStatus::Untriggered);
        mock.fail_cancel(&id("tp"), GatewayError::Transport("reset".into()));

        let mut monitor = BracketMonitor::new();
        assert!(monitor.poll(&mock, Some(&bracket)).await.is_err());
        assert_eq!(monitor.polls(), 0);
        assert_eq!(mock.order(&id("tp")).unwrap().status, OrderStatus::Untriggered);
    }

    #[tokio::test]
    async fn test_monitor_tracks_phase_transitions() {
        let (mock, bracket) =
            setup(OrderStatus::Pending, OrderStatus::Untriggered, OrderStatus::Untriggered);
        let mut monitor = BracketMonitor::new();

        assert_eq!(
            monitor.poll(&mock, Some(&bracket)).await.unwrap(),
            BracketPhase::EntryPending
        );

        mock.set_status(&id("entry"), OrderStatus::Filled);
        assert_eq!(
            monitor.poll(&mock, Some(&bracket)).await.unwrap(),
            BracketPhase::AwaitingTargets
        );

        mock.set_status(&id("tp"), OrderStatus::Filled);
        assert_eq!(
            monitor.poll(&mock, Some(&bracket)).await.unwrap(),
            BracketPhase::TakeProfitHit
        );
        assert_eq!(monitor.polls(), 3);
        assert_eq!(monitor.last_phase(), Some(&BracketPhase::TakeProfitHit));

        monitor.reset();
        assert_eq!(monitor.polls(), 0);
        assert!(monitor.last_phase().is_none());
    }

    #[test]
    fn test_phase_liveness() {
        assert!(BracketPhase::EntryPending.is_live());
        assert!(BracketPhase::AwaitingTargets.is_live());
        assert!(!BracketPhase::NoOrders.is_live());
        assert!(!BracketPhase::StopLossHit.is_live());
        assert!(!BracketPhase::TakeProfitHit.is_live());
        assert_eq!(BracketPhase::StopLossHit.to_string(), "stop_loss");
    }
}
