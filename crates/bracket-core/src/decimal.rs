//! Precision-safe decimal types for order pricing.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Prices sent to the
//! exchange must land on the instrument's tick grid, so rounding is done
//! against an explicit tick size rather than a fixed number of decimals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` so prices and sizes cannot be mixed up in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Round to the nearest multiple of `tick_size`.
    ///
    /// Midpoints round to the even tick. The result carries the tick's
    /// scale, so a 0.1 tick always renders with one decimal place.
    #[inline]
    pub fn round_to_tick(&self, tick_size: Price) -> Self {
        if tick_size.is_zero() {
            return *self;
        }
        Self((self.0 / tick_size.0).round() * tick_size.0)
    }

    /// Move this price by `pct` percent: `self × (1 + pct/100)`.
    ///
    /// Negative `pct` moves the price down.
    #[inline]
    pub fn offset_pct(&self, pct: Decimal) -> Self {
        Self(self.0 * (Decimal::ONE + pct / HUNDRED))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Position quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_to_tick_nearest() {
        let tick = Price::new(dec!(0.1));

        assert_eq!(Price::new(dec!(2017.98)).round_to_tick(tick).0, dec!(2018.0));
        assert_eq!(Price::new(dec!(1978.02)).round_to_tick(tick).0, dec!(1978.0));
        assert_eq!(Price::new(dec!(1988.01)).round_to_tick(tick).0, dec!(1988.0));
    }

    #[test]
    fn test_round_to_tick_renders_tick_scale() {
        let tick = Price::new(dec!(0.1));
        let rounded = Price::new(dec!(2017.98)).round_to_tick(tick);
        assert_eq!(rounded.to_string(), "2018.0");

        let whole = Price::new(dec!(1998)).round_to_tick(tick);
        assert_eq!(whole.to_string(), "1998.0");
    }

    #[test]
    fn test_round_to_coarse_tick() {
        let tick = Price::new(dec!(0.5));
        assert_eq!(Price::new(dec!(2017.8)).round_to_tick(tick).0, dec!(2018.0));
        assert_eq!(Price::new(dec!(2017.7)).round_to_tick(tick).0, dec!(2017.5));
    }

    #[test]
    fn test_zero_tick_is_identity() {
        let price = Price::new(dec!(1.23456));
        assert_eq!(price.round_to_tick(Price::ZERO), price);
    }

    #[test]
    fn test_offset_pct() {
        let entry = Price::new(dec!(1998.0));
        assert_eq!(entry.offset_pct(dec!(1)).0, dec!(2017.98));
        assert_eq!(entry.offset_pct(dec!(-1)).0, dec!(1978.02));
        assert_eq!(entry.offset_pct(dec!(-0.5)).0, dec!(1988.01));
    }
}
