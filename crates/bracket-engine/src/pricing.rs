//! Bracket price computation.
//!
//! Exits are offsets from the realized entry price. The stop-loss sits
//! against the position, the take-profit with it. The take-profit trigger
//! uses half the ROI so the order is armed before price reaches the limit.

use bracket_core::{Direction, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Limit price for the entry order.
///
/// Longs pay the reference price. Shorts accept down to
/// `reference - slippage` so the fill-or-kill order executes.
pub fn entry_limit_price(
    direction: Direction,
    reference: Price,
    slippage: Price,
    tick: Price,
) -> Price {
    match direction {
        Direction::Long => reference.round_to_tick(tick),
        Direction::Short => (reference - slippage).round_to_tick(tick),
    }
}

/// Tick-rounded exit prices for one bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPrices {
    /// Realized entry price the exits derive from.
    pub entry: Price,
    /// Stop trigger and limit (identical).
    pub stop_loss: Price,
    pub take_profit_limit: Price,
    pub take_profit_trigger: Price,
}

impl BracketPrices {
    pub fn compute(
        direction: Direction,
        entry: Price,
        stop_loss_pct: Decimal,
        roi_pct: Decimal,
        tick: Price,
    ) -> Self {
        let sign = direction.sign();
        Self {
            entry,
            stop_loss: entry.offset_pct(-sign * stop_loss_pct).round_to_tick(tick),
            take_profit_limit: entry.offset_pct(sign * roi_pct).round_to_tick(tick),
            take_profit_trigger: entry
                .offset_pct(sign * roi_pct / Decimal::TWO)
                .round_to_tick(tick),
        }
    }

    /// All exit prices are strictly positive.
    pub fn is_valid(&self) -> bool {
        self.stop_loss.is_positive()
            && self.take_profit_limit.is_positive()
            && self.take_profit_trigger.is_positive()
    }
}
