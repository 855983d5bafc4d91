//! Application configuration.

use crate::error::{AppError, AppResult};
use bracket_core::{BracketRequest, Direction, PositionId, Size};
use bracket_engine::BracketConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Path used when neither `--config` nor `BRACKET_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Orders go to the in-process paper exchange.
    #[default]
    Paper,
}

/// Trade opened on every cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConfig {
    /// Default: short.
    #[serde(default = "default_direction")]
    pub direction: Direction,
    /// Position size in base units. Default: 0.01.
    #[serde(default = "default_size")]
    pub size: Decimal,
    /// Stop-loss distance from the entry (percent). Default: 1.
    #[serde(default = "default_pct")]
    pub stop_loss_pct: Decimal,
    /// Take-profit distance from the entry (percent). Default: 1.
    #[serde(default = "default_pct")]
    pub roi_pct: Decimal,
}

fn default_direction() -> Direction {
    Direction::Short
}

fn default_size() -> Decimal {
    Decimal::new(1, 2)
}

fn default_pct() -> Decimal {
    Decimal::ONE
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            direction: default_direction(),
            size: default_size(),
            stop_loss_pct: default_pct(),
            roi_pct: default_pct(),
        }
    }
}

impl TradeConfig {
    pub fn request(&self) -> BracketRequest {
        BracketRequest::new(
            self.direction,
            Size::new(self.size),
            self.stop_loss_pct,
            self.roi_pct,
        )
    }
}

/// Monitor cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between polls (ms). Default: 1,000.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Brackets to complete before exiting. 0 runs until ctrl-c. Default: 1.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,
}

fn default_interval_ms() -> u64 {
    1_000
}

fn default_max_cycles() -> u32 {
    1
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_cycles: default_max_cycles(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Source of the reference prices fed to the paper exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PriceFeedConfig {
    /// Static prices, moved by `step` after every refresh.
    Fixed {
        oracle: Decimal,
        index: Decimal,
        #[serde(default)]
        step: Decimal,
    },
    /// Public markets endpoint.
    Http {
        base_url: String,
        #[serde(default = "default_feed_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_feed_timeout_ms() -> u64 {
    10_000
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self::Fixed {
            oracle: Decimal::new(2000, 0),
            index: Decimal::new(2000, 0),
            step: Decimal::ZERO,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mode: OperatingMode,
    /// Account position all orders are booked against. Default: "1".
    #[serde(default = "default_position_id")]
    pub position_id: PositionId,
    #[serde(default)]
    pub bracket: BracketConfig,
    #[serde(default)]
    pub trade: TradeConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub price_feed: PriceFeedConfig,
}

fn default_position_id() -> PositionId {
    PositionId::new("1")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            position_id: default_position_id(),
            bracket: BracketConfig::default(),
            trade: TradeConfig::default(),
            poll: PollConfig::default(),
            price_feed: PriceFeedConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Reject values the engine or the trade loop cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        self.bracket.validate()?;
        self.trade.request().validate()?;

        if self.poll.interval_ms == 0 {
            return Err(AppError::Config("poll.interval_ms must be positive".to_string()));
        }

        match &self.price_feed {
            PriceFeedConfig::Fixed { oracle, index, .. } => {
                if *oracle <= Decimal::ZERO || *index <= Decimal::ZERO {
                    return Err(AppError::Config(format!(
                        "fixed prices must be positive, got oracle={oracle} index={index}"
                    )));
                }
            }
            PriceFeedConfig::Http {
                base_url,
                timeout_ms,
            } => {
                if base_url.is_empty() {
                    return Err(AppError::Config("price_feed.base_url is empty".to_string()));
                }
                if *timeout_ms == 0 {
                    return Err(AppError::Config(
                        "price_feed.timeout_ms must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bracket_core::MarketId;
    use bracket_engine::PartialBracketPolicy;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.mode, OperatingMode::Paper);
        assert_eq!(config.trade.direction, Direction::Short);
        assert_eq!(config.trade.size, dec!(0.01));
        assert_eq!(config.poll.max_cycles, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
mode = "paper"
position_id = "7"

[bracket]
market = "BTC-USD"
tick_size = "1"
partial_policy = "flatten"

[trade]
direction = "long"
size = "0.5"
stop_loss_pct = "2"
roi_pct = "3"

[poll]
interval_ms = 250
max_cycles = 0

[price_feed]
kind = "http"
base_url = "https://indexer.example.com"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.position_id, PositionId::new("7"));
        assert_eq!(config.bracket.market, MarketId::new("BTC-USD"));
        assert_eq!(config.bracket.partial_policy, PartialBracketPolicy::Flatten);
        assert_eq!(config.trade.direction, Direction::Long);
        assert_eq!(config.trade.roi_pct, dec!(3));
        assert_eq!(config.poll.interval(), Duration::from_millis(250));
        assert_eq!(
            config.price_feed,
            PriceFeedConfig::Http {
                base_url: "https://indexer.example.com".to_string(),
                timeout_ms: 10_000,
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = NamedTempFile::new().unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bracket, BracketConfig::default());
        assert_eq!(config.price_feed, PriceFeedConfig::default());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = AppConfig::from_file("/nonexistent/bracket.toml").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.poll.interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.trade.size = Decimal::ZERO;
        assert!(matches!(config.validate(), Err(AppError::Core(_))));

        let mut config = AppConfig::default();
        config.price_feed = PriceFeedConfig::Fixed {
            oracle: dec!(0),
            index: dec!(2000),
            step: Decimal::ZERO,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("mode"));
        assert!(toml_str.contains("[price_feed]"));
    }
}
