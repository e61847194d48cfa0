//! Fixed precision decimal arithmetic
//! Values carry DECIMAL_PLACES fractional digits and every operation truncates toward zero,
//! the same convention as the ledger's native decimal type. Share and token conservation
//! depends on this truncation direction being identical everywhere.

use crate::types::Amount;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{
    fmt,
    ops::{Add, Sub},
    str::FromStr,
};

/// Number of fractional digits kept by every decimal
pub const DECIMAL_PLACES: i64 = 18;

fn precision() -> BigInt {
    BigInt::from(10u8).pow(DECIMAL_PLACES as u32)
}

/// Decimal parse failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal '{0}'")]
pub struct DecimalParseError(String);

/// Non-integral quantity - shares, rates, reward ratios
/// Serialised as a decimal string with all 18 places, e.g. "0.100000000000000000"
#[derive(
    Debug,
    Default,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub struct Decimal(BigDecimal);

impl Decimal {
    pub fn zero() -> Self {
        Self(BigDecimal::zero())
    }

    pub fn one() -> Self {
        Self::from_atomics(precision())
    }

    /// Whole percentage, e.g. `percent(10)` == 0.1
    pub fn percent(percent: u64) -> Self {
        Self::from_atomics(BigInt::from(percent) * precision() / BigInt::from(100u8))
    }

    pub fn from_amount(amount: Amount) -> Self {
        Self::from_atomics(BigInt::from(amount) * precision())
    }

    /// numerator / denominator, None when the denominator is zero
    pub fn from_ratio(numerator: Amount, denominator: Amount) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        Some(Self::from_atomics(
            BigInt::from(numerator) * precision() / BigInt::from(denominator),
        ))
    }

    fn from_atomics(atomics: BigInt) -> Self {
        Self(BigDecimal::new(atomics, DECIMAL_PLACES))
    }

    /// Value scaled by 10^18, truncated
    fn atomics(&self) -> BigInt {
        let (atomics, _) = self.0.with_scale(DECIMAL_PLACES).into_bigint_and_exponent();
        atomics
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// self * other, truncated
    pub fn mul_truncate(&self, other: &Decimal) -> Decimal {
        Self::from_atomics(self.atomics() * other.atomics() / precision())
    }

    /// self * amount (exact at this precision)
    pub fn mul_amount(&self, amount: Amount) -> Decimal {
        Self::from_atomics(self.atomics() * BigInt::from(amount))
    }

    /// self / other, truncated; None on division by zero
    pub fn checked_quo(&self, other: &Decimal) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        Some(Self::from_atomics(self.atomics() * precision() / other.atomics()))
    }

    /// self / amount, truncated; None on division by zero
    pub fn quo_amount(&self, amount: Amount) -> Option<Decimal> {
        if amount == 0 {
            return None;
        }
        Some(Self::from_atomics(self.atomics() / BigInt::from(amount)))
    }

    /// self - other, None if the result would be negative
    pub fn checked_sub(&self, other: &Decimal) -> Option<Decimal> {
        if other > self {
            None
        } else {
            Some(self - other)
        }
    }

    /// Integral part, truncated toward zero. None if negative or too large
    pub fn to_amount(&self) -> Option<Amount> {
        if self.is_negative() {
            return None;
        }
        (self.atomics() / precision()).to_u128()
    }

    /// Integral part plus the truncated remainder
    pub fn split_amount(&self) -> Option<(Amount, Decimal)> {
        let whole = self.to_amount()?;
        Some((whole, self - &Decimal::from_amount(whole)))
    }
}

impl Add for &Decimal {
    type Output = Decimal;

    fn add(self, rhs: &Decimal) -> Decimal {
        Decimal(&self.0 + &rhs.0)
    }
}

impl Sub for &Decimal {
    type Output = Decimal;

    fn sub(self, rhs: &Decimal) -> Decimal {
        Decimal(&self.0 - &rhs.0)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let atomics = self.atomics();
        let sign = if atomics.is_negative() { "-" } else { "" };
        let places = DECIMAL_PLACES as usize;
        let digits = format!("{:0>width$}", atomics.abs().to_string(), width = places + 1);
        let (whole, fraction) = digits.split_at(digits.len() - places);
        write!(f, "{sign}{whole}.{fraction}")
    }
}

impl FromStr for Decimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = BigDecimal::from_str(s.trim()).map_err(|_| DecimalParseError(s.to_string()))?;
        Ok(Self(value.with_scale(DECIMAL_PLACES)))
    }
}

/// floor(amount * numerator / denominator) without intermediate overflow
/// None on a zero denominator or if the result does not fit
pub fn multiply_ratio(amount: Amount, numerator: Amount, denominator: Amount) -> Option<Amount> {
    if denominator == 0 {
        return None;
    }
    (BigInt::from(amount) * BigInt::from(numerator) / BigInt::from(denominator)).to_u128()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn displays_all_places() {
        assert_eq!(Decimal::percent(10).to_string(), "0.100000000000000000");
        assert_eq!(Decimal::from_amount(53000).to_string(), "53000.000000000000000000");
        assert_eq!(Decimal::zero().to_string(), "0.000000000000000000");
        assert_eq!((&Decimal::zero() - &Decimal::one()).to_string(), "-1.000000000000000000");
    }

    #[test]
    fn parse_truncates_beyond_precision() {
        assert_eq!(dec("0.10"), Decimal::percent(10));
        assert_eq!(
            dec("0.1234567890123456789999").to_string(),
            "0.123456789012345678"
        );
        assert!(Decimal::from_str("ten percent").is_err());
    }

    #[test]
    fn ratios_truncate_toward_zero() {
        assert_eq!(
            Decimal::from_ratio(1, 3).unwrap().to_string(),
            "0.333333333333333333"
        );
        assert_eq!(
            Decimal::from_ratio(2, 3).unwrap().to_string(),
            "0.666666666666666666"
        );
        assert!(Decimal::from_ratio(1, 0).is_none());
    }

    #[test]
    fn multiplication_truncates() {
        let third = Decimal::from_ratio(1, 3).unwrap();
        assert_eq!(third.mul_truncate(&third).to_string(), "0.111111111111111110");
        assert_eq!(Decimal::percent(10).mul_amount(30000), Decimal::from_amount(3000));
    }

    #[test]
    fn quotient_and_integral_part() {
        let ratio = Decimal::from_amount(216000).quo_amount(1_200_000).unwrap();
        assert_eq!(ratio, dec("0.18"));
        assert_eq!(ratio.mul_amount(200000).to_amount(), Some(36000));

        let q = Decimal::from_amount(10).checked_quo(&Decimal::from_amount(4)).unwrap();
        assert_eq!(q.split_amount(), Some((2, dec("0.5"))));
        assert!(Decimal::one().checked_quo(&Decimal::zero()).is_none());
    }

    #[test]
    fn checked_sub_refuses_negative_results() {
        assert_eq!(dec("0.5").checked_sub(&dec("0.2")), Some(dec("0.3")));
        assert_eq!(dec("0.2").checked_sub(&dec("0.5")), None);
        assert_eq!((&dec("0.2") - &dec("0.5")).to_amount(), None);
    }

    #[test]
    fn multiply_ratio_floors() {
        assert_eq!(multiply_ratio(30000, 53000, 80000), Some(19875));
        assert_eq!(multiply_ratio(10, 1, 3), Some(3));
        assert_eq!(multiply_ratio(u128::MAX, 2, 2), Some(u128::MAX));
        assert_eq!(multiply_ratio(1, 1, 0), None);
    }

    #[test]
    fn serialises_as_string() {
        let json = serde_json::to_string(&Decimal::percent(10)).unwrap();
        assert_eq!(json, r#""0.100000000000000000""#);
        let back: Decimal = serde_json::from_str(r#""0.10""#).unwrap();
        assert_eq!(back, Decimal::percent(10));
    }
}
