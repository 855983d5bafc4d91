//! Bracket construction parameters.

use bracket_core::{CoreError, MarketId, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handling of a bracket whose entry went live but whose exits did not.
///
/// Neither choice is safe in every market, so the default hands the
/// position to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialBracketPolicy {
    /// Return `PartialBracket` immediately and leave the orders alone.
    #[default]
    Surface,
    /// Cancel any exit that went live, close the entry with a reduce-only
    /// market order, then return `PartialBracket`.
    Flatten,
}

impl fmt::Display for PartialBracketPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface => write!(f, "surface"),
            Self::Flatten => write!(f, "flatten"),
        }
    }
}

/// Bracket builder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketConfig {
    /// Market the bracket trades. Default: ETH-USD.
    #[serde(default = "default_market")]
    pub market: MarketId,
    /// Instrument tick size; every price is rounded to it. Default: 0.1.
    #[serde(default = "default_tick_size")]
    pub tick_size: Decimal,
    /// Price tolerance below the index for short entries. Default: 2.0.
    #[serde(default = "default_slippage_allowance")]
    pub slippage_allowance: Decimal,
    /// Lifetime of every order in the bracket (seconds). Default: 15,000.
    #[serde(default = "default_order_ttl_secs")]
    pub order_ttl_secs: u64,
    /// Maximum fee rate attached to each order. Default: 0.015.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Partial bracket handling. Default: surface.
    #[serde(default)]
    pub partial_policy: PartialBracketPolicy,
}

fn default_market() -> MarketId {
    MarketId::new("ETH-USD")
}

fn default_tick_size() -> Decimal {
    Decimal::new(1, 1)
}

fn default_slippage_allowance() -> Decimal {
    Decimal::new(20, 1)
}

fn default_order_ttl_secs() -> u64 {
    15_000
}

fn default_fee_rate() -> Decimal {
    Decimal::new(15, 3)
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            market: default_market(),
            tick_size: default_tick_size(),
            slippage_allowance: default_slippage_allowance(),
            order_ttl_secs: default_order_ttl_secs(),
            fee_rate: default_fee_rate(),
            partial_policy: PartialBracketPolicy::default(),
        }
    }
}

impl BracketConfig {
    pub fn tick(&self) -> Price {
        Price::new(self.tick_size)
    }

    pub fn slippage(&self) -> Price {
        Price::new(self.slippage_allowance)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.tick_size <= Decimal::ZERO {
            return Err(CoreError::InvalidPrice(format!(
                "tick_size must be positive, got {}",
                self.tick_size
            )));
        }
        if self.slippage_allowance < Decimal::ZERO {
            return Err(CoreError::InvalidPrice(format!(
                "slippage_allowance must not be negative, got {}",
                self.slippage_allowance
            )));
        }
        if self.order_ttl_secs == 0 {
            return Err(CoreError::InvalidRequest(
                "order_ttl_secs must be positive".to_string(),
            ));
        }
        if self.fee_rate < Decimal::ZERO {
            return Err(CoreError::InvalidRequest(format!(
                "fee_rate must not be negative, got {}",
                self.fee_rate
            )));
        }
        Ok(())
    }
}
