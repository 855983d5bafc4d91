//! Checks the shipped configuration file against the application.

use bracket_bot::config::PriceFeedConfig;
use bracket_bot::{AppConfig, Application};
use bracket_core::Direction;
use rust_decimal_macros::dec;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");

#[test]
fn test_shipped_config_parses_and_validates() {
    let config = AppConfig::from_file(DEFAULT_CONFIG).unwrap();

    assert_eq!(config.trade.direction, Direction::Short);
    assert_eq!(config.bracket.tick_size, dec!(0.1));
    assert_eq!(config.bracket.order_ttl_secs, 15_000);
    assert!(matches!(config.price_feed, PriceFeedConfig::Fixed { .. }));
    assert!(config.validate().is_ok());
}

/// The shipped paper setup resolves a bracket on its own.
#[tokio::test]
async fn test_shipped_config_completes_a_cycle() {
    let mut config = AppConfig::from_file(DEFAULT_CONFIG).unwrap();
    config.poll.interval_ms = 1;

    let mut app = Application::new(config).unwrap();
    app.run().await.unwrap();

    assert_eq!(app.completed_cycles(), 1);
    assert_eq!(app.gateway().working_orders(), 0);
}
