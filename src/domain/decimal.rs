//! Fixed-precision decimal used for every price, share, cost and PnL value.
//!
//! Accumulation happens on `rust_decimal` values; `f64` only shows up when a
//! value leaves the crate (JSON numbers, display).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scale of the micro-unit integer encoding used by the exchange API (USDC has 6 decimals).
pub const MICRO_UNITS_PER_UNIT: i64 = 1_000_000;

/// Lossless decimal numeric type for ledger arithmetic.
///
/// Serializes to a JSON number (not a string).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a decimal string, accepting scientific notation as a fallback.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        let s = s.trim();
        RustDecimal::from_str(s)
            .or_else(|_| RustDecimal::from_scientific(s))
            .map(Decimal)
    }

    /// Convert a JSON number without going through binary floating point.
    ///
    /// `serde_json` prints floats with the shortest round-trip representation,
    /// so `0.4` becomes exactly `0.4` here.
    pub fn from_json_number(n: &serde_json::Number) -> Result<Self, rust_decimal::Error> {
        if let Some(i) = n.as_i64() {
            return Ok(Decimal(RustDecimal::from(i)));
        }
        if let Some(u) = n.as_u64() {
            return Ok(Decimal(RustDecimal::from(u)));
        }
        Self::from_str_canonical(&n.to_string())
    }

    /// Convert a value in 1e6-scaled micro-units to canonical units.
    pub fn from_micro_units(micro: Decimal) -> Self {
        Decimal(micro.0 / RustDecimal::from(MICRO_UNITS_PER_UNIT))
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// Lossy conversion for display and charting boundaries.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Round half away from zero to `dp` decimal places (cents = 2).
    pub fn round_dp(&self, dp: u32) -> Self {
        Decimal(self.0.round_dp_with_strategy(
            dp,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        ))
    }

    /// Division that reports a zero divisor instead of panicking.
    pub fn checked_div(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    /// Multiplication that reports overflow instead of panicking.
    pub fn checked_mul(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}
