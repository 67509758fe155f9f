//! Amount - Non-negative decimal wrapper for balances and prices
//!
//! All stored balances and node prices in Taskbot MUST be non-negative.
//! This is enforced at the type level. Signed balance deltas use plain
//! `Decimal` at the ledger boundary and are validated there.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when working with amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Rate must be between 0 and 1: {0}")]
    InvalidRate(Decimal),
}

/// A non-negative decimal amount.
///
/// # Invariant
/// The inner value is always >= 0. This is enforced by the constructor.
///
/// # Example
/// ```
/// use taskbot_core::Amount;
/// use rust_decimal::Decimal;
///
/// let price = Amount::new(Decimal::new(500, 2)).unwrap(); // 5.00
/// assert_eq!(price.value(), Decimal::new(500, 2));
///
/// // Negative amounts are rejected
/// assert!(Amount::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Amount from a Decimal.
    ///
    /// Returns an error if the value is negative.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            Err(AmountError::NegativeAmount(value))
        } else {
            Ok(Self(value))
        }
    }

    /// Create an Amount without validation.
    ///
    /// # Safety
    /// The caller MUST ensure the value is non-negative.
    /// Use only for trusted sources (e.g., rows read from validated storage).
    #[inline]
    pub const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the inner Decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition - returns None on overflow
    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction - returns None if the result would be negative
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        let result = self.0.checked_sub(other.0)?;
        if result < Decimal::ZERO {
            None
        } else {
            Some(Amount(result))
        }
    }

    /// Apply a commission rate in [0, 1] to this amount.
    ///
    /// Used for referral commissions: `price.apply_rate(dec!(0.10))`.
    pub fn apply_rate(&self, rate: Decimal) -> Result<Amount, AmountError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(AmountError::InvalidRate(rate));
        }
        Ok(Amount(self.0 * rate))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(dec!(100)).unwrap();
        assert_eq!(amount.value(), dec!(100));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let result = Amount::new(dec!(-100));
        assert!(matches!(result, Err(AmountError::NegativeAmount(_))));
    }

    #[test]
    fn test_checked_sub_prevents_negative() {
        let a = Amount::new(dec!(50)).unwrap();
        let b = Amount::new(dec!(100)).unwrap();
        assert!(a.checked_sub(&b).is_none());
    }

    #[test]
    fn test_apply_rate_commission() {
        let price = Amount::new(dec!(5.00)).unwrap();
        let commission = price.apply_rate(dec!(0.10)).unwrap();
        assert_eq!(commission.value(), dec!(0.500));
    }

    #[test]
    fn test_apply_rate_out_of_range() {
        let price = Amount::new(dec!(5.00)).unwrap();
        assert!(matches!(
            price.apply_rate(dec!(1.5)),
            Err(AmountError::InvalidRate(_))
        ));
        assert!(matches!(
            price.apply_rate(dec!(-0.1)),
            Err(AmountError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        let amount = Amount::new(dec!(123.45)).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        let parsed: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(amount, parsed);
    }
}
