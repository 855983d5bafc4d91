//! Bracket lifecycle integration tests.
//!
//! Runs complete open → poll → resolve cycles against the paper exchange:
//! - Stop-loss path
//! - Take-profit path
//! - Manually canceled exit
//! - Repeated cycles on one gateway

use bracket_core::{BracketRequest, Direction, MarketId, OrderStatus, PositionId, Price, Size};
use bracket_engine::{BracketBuilder, BracketConfig, BracketMonitor, BracketPhase};
use bracket_gateway::{ExchangeGateway, MarketPrices, PaperGateway};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn market() -> MarketId {
    MarketId::new("ETH-USD")
}

fn prices(oracle: Decimal, index: Decimal) -> MarketPrices {
    MarketPrices {
        oracle: Price::new(oracle),
        index: Price::new(index),
    }
}

fn paper() -> PaperGateway {
    let gateway = PaperGateway::new(PositionId::new("1"));
    gateway.update_prices(&market(), prices(dec!(2000.0), dec!(2000.0)));
    gateway
}

fn short_request() -> BracketRequest {
    BracketRequest::new(Direction::Short, Size::new(dec!(0.01)), dec!(1), dec!(1))
}

fn long_request() -> BracketRequest {
    BracketRequest::new(Direction::Long, Size::new(dec!(0.01)), dec!(1), dec!(2))
}

/// Short bracket stopped out when the mark rallies through 2018.
#[tokio::test]
async fn test_short_bracket_stop_loss_cycle() {
    let gateway = paper();
    let bracket = BracketBuilder::new(BracketConfig::default())
        .open(&gateway, &short_request())
        .await
        .unwrap();

    assert_eq!(bracket.entry.status, OrderStatus::Filled);
    assert_eq!(bracket.entry_price(), Price::new(dec!(1998.0)));
    assert_eq!(gateway.working_orders(), 2);

    let mut monitor = BracketMonitor::new();
    let phase = monitor.poll(&gateway, Some(&bracket)).await.unwrap();
    assert_eq!(phase, BracketPhase::AwaitingTargets);

    let filled = gateway.update_prices(&market(), prices(dec!(2018.5), dec!(2018.0)));
    assert_eq!(filled, vec![bracket.stop_loss.id.clone()]);

    let phase = monitor.poll(&gateway, Some(&bracket)).await.unwrap();
    assert_eq!(phase, BracketPhase::StopLossHit);
    assert_eq!(
        gateway.order(&bracket.take_profit.id).unwrap().status,
        OrderStatus::Canceled
    );
    assert_eq!(gateway.working_orders(), 0);
}

/// Short bracket takes profit once the mark drops through the 1988 trigger.
#[tokio::test]
async fn test_short_bracket_take_profit_cycle() {
    let gateway = paper();
    let bracket = BracketBuilder::new(BracketConfig::default())
        .open(&gateway, &short_request())
        .await
        .unwrap();

    let mut monitor = BracketMonitor::new();
    gateway.update_prices(&market(), prices(dec!(1995.0), dec!(1995.0)));
    assert!(monitor.poll(&gateway, Some(&bracket)).await.unwrap().is_live());

    gateway.update_prices(&market(), prices(dec!(1987.9), dec!(1988.0)));
    let phase = monitor.poll(&gateway, Some(&bracket)).await.unwrap();
    assert_eq!(phase, BracketPhase::TakeProfitHit);
    assert_eq!(
        gateway.order(&bracket.stop_loss.id).unwrap().status,
        OrderStatus::Canceled
    );
    assert_eq!(monitor.polls(), 2);
}

/// An operator cancels the stop-loss by hand; the monitor cleans up.
#[tokio::test]
async fn test_manually_canceled_exit_triggers_cleanup() {
    let gateway = paper();
    let bracket = BracketBuilder::new(BracketConfig::default())
        .open(&gateway, &long_request())
        .await
        .unwrap();

    gateway
        .cancel_order(bracket.stop_loss.id.clone())
        .await
        .unwrap();

    let phase = BracketMonitor::new()
        .poll(&gateway, Some(&bracket))
        .await
        .unwrap();

    let BracketPhase::ExitCanceled { cleanup } = phase else {
        panic!("expected ExitCanceled, got {phase:?}");
    };
    assert!(!cleanup.has_failures());
    assert_eq!(gateway.working_orders(), 0);
}

/// Several consecutive cycles on one gateway, alternating outcomes.
#[tokio::test]
async fn test_repeated_cycles() {
    let gateway = paper();
    let builder = BracketBuilder::new(BracketConfig::default());
    let mut monitor = BracketMonitor::new();

    for cycle in 0..3 {
        gateway.update_prices(&market(), prices(dec!(2000.0), dec!(2000.0)));
        let bracket = builder.open(&gateway, &long_request()).await.unwrap();
        monitor.reset();

        // Long entry 2000.0: stop 1980.0, take-profit trigger 2020.0.
        let mark = if cycle % 2 == 0 { dec!(1979.0) } else { dec!(2021.0) };
        gateway.update_prices(&market(), prices(mark, mark));

        let phase = monitor.poll(&gateway, Some(&bracket)).await.unwrap();
        let expected = if cycle % 2 == 0 {
            BracketPhase::StopLossHit
        } else {
            BracketPhase::TakeProfitHit
        };
        assert_eq!(phase, expected, "cycle {cycle}");
        assert_eq!(gateway.working_orders(), 0, "cycle {cycle}");
    }
}

/// Polling with no bracket is a no-op.
#[tokio::test]
async fn test_poll_without_bracket() {
    let gateway = paper();
    let live = bracket_engine::poll_bracket(&gateway, None).await.unwrap();
    assert!(!live);
}
