//! Bracket trade records.
//!
//! A bracket is an entry order paired with a stop-loss and a take-profit
//! exit, all derived from a single entry fill.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::market::{MarketId, ReferencePriceKind};
use crate::order::{Order, OrderSide};
use crate::Size;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Side of the opening order.
    pub fn entry_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    /// Side of both exit orders.
    pub fn exit_side(&self) -> OrderSide {
        self.entry_side().opposite()
    }

    /// Reference price the entry is anchored to.
    ///
    /// Longs use the oracle to avoid paying through the book; shorts use
    /// the index as the base for their slippage allowance.
    pub fn reference_kind(&self) -> ReferencePriceKind {
        match self {
            Self::Long => ReferencePriceKind::Oracle,
            Self::Short => ReferencePriceKind::Index,
        }
    }

    /// +1 for long, -1 for short. Multiplies percentage offsets so that a
    /// positive offset always moves in the position's favour.
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "long" | "buy" => Ok(Self::Long),
            "short" | "sell" => Ok(Self::Short),
            other => Err(CoreError::InvalidRequest(format!(
                "unknown direction '{other}', expected long or short"
            ))),
        }
    }
}

/// Parameters for opening one bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketRequest {
    pub direction: Direction,
    /// Position quantity.
    pub size: Size,
    /// Stop-loss distance from the realized entry price, in percent.
    pub stop_loss_pct: Decimal,
    /// Target return, in percent of the realized entry price.
    pub roi_pct: Decimal,
}

impl BracketRequest {
    pub fn new(direction: Direction, size: Size, stop_loss_pct: Decimal, roi_pct: Decimal) -> Self {
        Self {
            direction,
            size,
            stop_loss_pct,
            roi_pct,
        }
    }

    /// Reject requests that would produce non-positive exit prices.
    pub fn validate(&self) -> Result<()> {
        if !self.size.is_positive() {
            return Err(CoreError::InvalidSize(format!(
                "bracket size must be positive, got {}",
                self.size
            )));
        }
        if self.stop_loss_pct <= Decimal::ZERO {
            return Err(CoreError::InvalidRequest(format!(
                "stop_loss_pct must be positive, got {}",
                self.stop_loss_pct
            )));
        }
        if self.roi_pct <= Decimal::ZERO {
            return Err(CoreError::InvalidRequest(format!(
                "roi_pct must be positive, got {}",
                self.roi_pct
            )));
        }
        // The "below entry" leg of each direction hits zero at 100%.
        match self.direction {
            Direction::Long if self.stop_loss_pct >= Decimal::ONE_HUNDRED => {
                Err(CoreError::InvalidRequest(format!(
                    "long stop_loss_pct must be below 100, got {}",
                    self.stop_loss_pct
                )))
            }
            Direction::Short if self.roi_pct >= Decimal::ONE_HUNDRED => {
                Err(CoreError::InvalidRequest(format!(
                    "short roi_pct must be below 100, got {}",
                    self.roi_pct
                )))
            }
            _ => Ok(()),
        }
    }
}

/// One open trade: entry plus its two contingent exits.
///
/// Created once by the builder and only read afterwards; the monitor acts
/// on the exchange through the ids it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub direction: Direction,
    pub market: MarketId,
    pub entry: Order,
    pub stop_loss: Order,
    pub take_profit: Order,
    pub opened_at: DateTime<Utc>,
}

impl Bracket {
    /// Realized entry price the exits were derived from.
    pub fn entry_price(&self) -> crate::Price {
        self.entry.price
    }
}
