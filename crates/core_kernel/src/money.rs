//! Money type with precise decimal arithmetic
//!
//! The ledger keeps a single accounting currency, so `Money` is a thin
//! wrapper around `rust_decimal::Decimal`. Intermediate results keep their
//! full precision; rounding to minor units is always an explicit call.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use thiserror::Error;

/// Decimal places of stored monetary amounts (kopecks, cents)
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// A monetary amount in the ledger currency
///
/// Arithmetic never rounds implicitly. Amounts written to the ledger are
/// rounded with [`Money::round_half_up`] to [`MONEY_DECIMAL_PLACES`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a new Money value, keeping the given precision
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Creates Money from an integer amount in minor units (e.g., kopecks)
    pub fn from_minor(minor_units: i64) -> Self {
        Self(Decimal::new(minor_units, MONEY_DECIMAL_PLACES))
    }

    /// Creates a zero amount
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if the amount is strictly negative
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Rounds to minor units, midpoints away from zero (commercial rounding)
    pub fn round_half_up(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Rounds to minor units using banker's rounding (round half to even)
    pub fn round_bankers(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven),
        )
    }

    /// Multiplies by a scalar (e.g., a quantity or a rate)
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self(self.0 * factor)
    }

    /// Divides by a scalar
    pub fn divide(&self, divisor: Decimal) -> Result<Self, MoneyError> {
        if divisor.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        self.0
            .checked_div(divisor)
            .map(Self)
            .ok_or_else(|| MoneyError::InvalidAmount(format!("{} / {} overflows", self.0, divisor)))
    }

    /// Price of one unit when this amount buys `quantity` units
    ///
    /// A zero quantity yields a zero unit price instead of an error; an
    /// overflowing quotient is reported.
    pub fn per_unit(&self, quantity: Decimal) -> Result<Self, MoneyError> {
        if quantity.is_zero() {
            return Ok(Self::zero());
        }
        self.divide(quantity)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, factor: Decimal) -> Self {
        self.multiply(factor)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Represents a percentage rate (e.g., a VAT rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate {
    /// The rate as a decimal (e.g., 0.20 for 20%)
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a decimal value (e.g., 0.20 for 20%)
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Creates a rate from a percentage (e.g., 20 for 20%)
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self {
            value: percentage / dec!(100),
        }
    }

    /// Returns the rate as a decimal
    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    /// Returns the rate as a percentage
    pub fn as_percentage(&self) -> Decimal {
        self.value * dec!(100)
    }

    /// Returns `1 + rate`, the factor that turns a net price into a gross one
    pub fn multiplier(&self) -> Decimal {
        Decimal::ONE + self.value
    }

    /// Applies this rate to a money amount
    pub fn apply(&self, money: &Money) -> Money {
        money.multiply(self.value)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().round_dp(4))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn money_arithmetic_is_associative(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64,
            c in -1_000_000i64..1_000_000i64
        ) {
            let ma = Money::from_minor(a);
            let mb = Money::from_minor(b);
            let mc = Money::from_minor(c);

            prop_assert_eq!((ma + mb) + mc, ma + (mb + mc));
        }

        #[test]
        fn rounding_is_idempotent(minor in -1_000_000_000i64..1_000_000_000i64, extra in 0u32..1000u32) {
            let m = Money::from_minor(minor) + Money::new(Decimal::new(extra as i64, 5));
            let once = m.round_half_up();
            prop_assert_eq!(once, once.round_half_up());
        }
    }
}
